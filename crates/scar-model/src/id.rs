//! The `Id` record: common header plus a typed payload.

use bitflags::bitflags;

use crate::ids::{IdCode, IdHandle};
use crate::window::WindowManager;
use crate::workspace::{Screen, WorkSpace};

bitflags! {
    /// Status tags carried by every id record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct IdTags: u32 {
        /// Record comes from another archive (library link).
        const LINKED = 1 << 0;
        /// Directly linked from this file.
        const EXTERN = 1 << 1;
        /// Linked through another linked record.
        const INDIRECT = 1 << 2;
        /// Linked record whose source could not be found.
        const MISSING = 1 << 3;
        /// Not owned by any document; must not be freed through document
        /// teardown.
        const NO_MAIN = 1 << 4;
        /// Use-counts of referenced records are not maintained for this id.
        const NO_USER_REFCOUNT = 1 << 5;
        /// Freshly created by a duplication pass.
        const NEW = 1 << 6;
    }
}

bitflags! {
    /// Behavior flags for [`crate::Document::copy_id`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CopyFlags: u32 {
        /// The copy is detached: not listed by the owning document.
        const NO_MAIN = 1 << 0;
        /// Do not bump use-counts of records the copy references.
        const NO_USER_REFCOUNT = 1 << 1;
        /// Record the copy on the source's `forward` pointer for a
        /// subsequent remap pass.
        const SET_FORWARD = 1 << 2;
    }
}

/// Typed payload of an id record.
#[derive(Debug, Clone)]
pub enum IdPayload {
    Screen(Screen),
    WorkSpace(WorkSpace),
    WindowManager(WindowManager),
}

impl IdPayload {
    pub fn code(&self) -> IdCode {
        match self {
            Self::Screen(_) => IdCode::SCREEN,
            Self::WorkSpace(_) => IdCode::WORKSPACE,
            Self::WindowManager(_) => IdCode::WINDOW_MANAGER,
        }
    }

    /// Visit every outgoing reference-typed field exactly once.
    ///
    /// This walk must be total: a reference field missed here breaks the
    /// use-count bookkeeping in `copy_id`/`free_id` and causes premature
    /// frees. New reference fields must be added to this match.
    pub fn for_each_ref(&mut self, mut f: impl FnMut(&mut IdHandle)) {
        match self {
            Self::Screen(_) => {}
            Self::WorkSpace(workspace) => {
                for layout in &mut workspace.layouts {
                    f(&mut layout.screen);
                }
            }
            Self::WindowManager(wm) => {
                for win in &mut wm.windows {
                    if let Some(workspace) = win.hook.workspace.as_mut() {
                        f(workspace);
                    }
                }
            }
        }
    }
}

/// A typed, reference-counted record inside a [`crate::Document`].
#[derive(Debug, Clone)]
pub struct Id {
    /// Full name; the first two bytes are the type code.
    pub(crate) name: String,
    /// Owning use-count. Weak references (`forward`, `library`) never
    /// contribute to it.
    pub users: u32,
    pub tags: IdTags,
    /// Owning library record, if this id was linked from one (weak).
    pub library: Option<IdHandle>,
    /// Forwarding pointer set during duplication/remap passes, cleared
    /// afterwards (weak).
    pub forward: Option<IdHandle>,
    pub payload: IdPayload,
}

impl Id {
    pub fn new(name: impl Into<String>, payload: IdPayload) -> Self {
        let code = payload.code().as_bytes();
        let mut full = String::with_capacity(2);
        full.push(code[0] as char);
        full.push(code[1] as char);
        full.push_str(&name.into());
        Self {
            name: full,
            users: 0,
            tags: IdTags::empty(),
            library: None,
            forward: None,
            payload,
        }
    }

    pub fn code(&self) -> IdCode {
        self.payload.code()
    }

    /// Full name, including the two-byte type code prefix.
    pub fn full_name(&self) -> &str {
        &self.name
    }

    /// Name without the type code prefix.
    pub fn display_name(&self) -> &str {
        &self.name[2..]
    }

    pub fn screen(&self) -> Option<&Screen> {
        match &self.payload {
            IdPayload::Screen(screen) => Some(screen),
            _ => None,
        }
    }

    pub fn screen_mut(&mut self) -> Option<&mut Screen> {
        match &mut self.payload {
            IdPayload::Screen(screen) => Some(screen),
            _ => None,
        }
    }

    pub fn workspace(&self) -> Option<&WorkSpace> {
        match &self.payload {
            IdPayload::WorkSpace(workspace) => Some(workspace),
            _ => None,
        }
    }

    pub fn workspace_mut(&mut self) -> Option<&mut WorkSpace> {
        match &mut self.payload {
            IdPayload::WorkSpace(workspace) => Some(workspace),
            _ => None,
        }
    }

    pub fn window_manager(&self) -> Option<&WindowManager> {
        match &self.payload {
            IdPayload::WindowManager(wm) => Some(wm),
            _ => None,
        }
    }

    pub fn window_manager_mut(&mut self) -> Option<&mut WindowManager> {
        match &mut self.payload {
            IdPayload::WindowManager(wm) => Some(wm),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_embeds_type_code() {
        let id = Id::new("Layout", IdPayload::Screen(Screen::new(1)));
        assert_eq!(id.full_name(), "SRLayout");
        assert_eq!(id.display_name(), "Layout");
        assert_eq!(id.code(), IdCode::SCREEN);
    }

    #[test]
    fn test_for_each_ref_visits_workspace_screens() {
        let mut workspace = WorkSpace::new();
        workspace.add_layout("A", IdHandle(4));
        workspace.add_layout("B", IdHandle(9));
        let mut payload = IdPayload::WorkSpace(workspace);

        let mut seen = Vec::new();
        payload.for_each_ref(|handle| seen.push(*handle));
        assert_eq!(seen, vec![IdHandle(4), IdHandle(9)]);
    }

    #[test]
    fn test_for_each_ref_screen_is_leaf() {
        let mut payload = IdPayload::Screen(Screen::new(2));
        let mut count = 0;
        payload.for_each_ref(|_| count += 1);
        assert_eq!(count, 0);
    }
}
