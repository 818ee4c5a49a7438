//! The `Document` container: an arena of id records for one file scope.

use std::path::PathBuf;

use crate::error::ModelError;
use crate::id::{CopyFlags, Id, IdPayload, IdTags};
use crate::ids::{IdCode, IdHandle};

/// The in-memory container owning all [`Id`] records loaded from one archive.
///
/// Records live in an arena and are addressed by [`IdHandle`]; handles are
/// never reused within one load, so a freed slot stays empty. The document is
/// deliberately not `Clone`: there is exactly one owner of every record.
#[derive(Debug, Default)]
pub struct Document {
    pub filepath: PathBuf,
    pub version: u32,
    pub subversion: u32,
    slots: Vec<Option<Id>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record and return its handle.
    pub fn add(&mut self, id: Id) -> IdHandle {
        let handle = IdHandle(self.slots.len() as u32);
        self.slots.push(Some(id));
        handle
    }

    pub fn get(&self, handle: IdHandle) -> Result<&Id, ModelError> {
        self.slots
            .get(handle.index())
            .and_then(Option::as_ref)
            .ok_or(ModelError::DanglingHandle(handle))
    }

    pub fn get_mut(&mut self, handle: IdHandle) -> Result<&mut Id, ModelError> {
        self.slots
            .get_mut(handle.index())
            .and_then(Option::as_mut)
            .ok_or(ModelError::DanglingHandle(handle))
    }

    /// Handles of all live records with the given type code, in insertion
    /// order. Detached (`NO_MAIN`) records are not listed: they are not owned
    /// by the document.
    pub fn handles_of(&self, code: IdCode) -> impl Iterator<Item = IdHandle> + '_ {
        self.slots.iter().enumerate().filter_map(move |(index, slot)| {
            let id = slot.as_ref()?;
            (id.code() == code && !id.tags.contains(IdTags::NO_MAIN))
                .then_some(IdHandle(index as u32))
        })
    }

    pub fn count_of(&self, code: IdCode) -> usize {
        self.handles_of(code).count()
    }

    /// Handle of the document's window manager record, if it has one.
    /// Archives written before workspaces existed have none.
    pub fn window_manager_handle(&self) -> Option<IdHandle> {
        self.handles_of(IdCode::WINDOW_MANAGER).next()
    }

    /// Duplicate a record, fixing up self-references and use-counts.
    ///
    /// The new record starts with `users == 0`. Every outgoing reference of
    /// the copied payload is visited exactly once: references back to
    /// `source` are redirected to the copy, and the use-count of every other
    /// referenced record is incremented — unless the copy is detached
    /// (`NO_MAIN`) or explicitly skips refcounting (`NO_USER_REFCOUNT`).
    pub fn copy_id(
        &mut self,
        source: IdHandle,
        flags: CopyFlags,
    ) -> Result<IdHandle, ModelError> {
        let src = self.get(source)?;

        let mut tags = src.tags;
        tags.remove(IdTags::NO_MAIN | IdTags::NO_USER_REFCOUNT | IdTags::NEW);
        if flags.contains(CopyFlags::NO_MAIN) {
            tags.insert(IdTags::NO_MAIN);
        }
        if flags.contains(CopyFlags::NO_USER_REFCOUNT) {
            tags.insert(IdTags::NO_USER_REFCOUNT);
        }

        let mut new_id = Id {
            users: 0,
            tags,
            forward: None,
            ..src.clone()
        };

        let new_handle = IdHandle(self.slots.len() as u32);
        let skip_refcount =
            flags.intersects(CopyFlags::NO_MAIN | CopyFlags::NO_USER_REFCOUNT);

        let mut referenced = Vec::new();
        new_id.payload.for_each_ref(|handle| {
            if *handle == source {
                // Self-reference: point into the copy, no count change.
                *handle = new_handle;
            } else {
                referenced.push(*handle);
            }
        });

        // Validate every reference before mutating any count, so a dangling
        // reference cannot leave the graph half-updated.
        for &handle in &referenced {
            self.get(handle)?;
        }
        if !skip_refcount {
            for handle in referenced {
                self.get_mut(handle)?.users += 1;
            }
        }

        self.slots.push(Some(new_id));

        if flags.contains(CopyFlags::SET_FORWARD) {
            let src = self.get_mut(source)?;
            src.forward = Some(new_handle);
            self.get_mut(new_handle)?.tags.insert(IdTags::NEW);
        }

        Ok(new_handle)
    }

    /// Free a record and decrement the use-counts of everything it
    /// referenced.
    ///
    /// A record with owning users is refused; weak references (`forward`,
    /// `library`) never keep a record alive.
    pub fn free_id(&mut self, handle: IdHandle) -> Result<(), ModelError> {
        let id = self.get(handle)?;
        if id.users > 0 && !id.tags.contains(IdTags::NO_USER_REFCOUNT) {
            return Err(ModelError::StillInUse {
                name: id.full_name().to_string(),
                users: id.users,
            });
        }

        let mut id = self.take_id(handle)?;

        // A detached or refcount-exempt record never contributed to the
        // counts of its referees, so there is nothing to give back.
        if !id
            .tags
            .intersects(IdTags::NO_MAIN | IdTags::NO_USER_REFCOUNT)
        {
            let mut referenced = Vec::new();
            id.payload.for_each_ref(|r| referenced.push(*r));
            for referee in referenced {
                if let Some(Some(id)) = self.slots.get_mut(referee.index()) {
                    id.users = id.users.saturating_sub(1);
                }
            }
        }
        Ok(())
    }

    /// Remove a record from the arena and hand it to the caller.
    ///
    /// Use-counts are left untouched: this is for moving a record between
    /// documents (reconciliation), not for freeing it.
    pub fn take_id(&mut self, handle: IdHandle) -> Result<Id, ModelError> {
        self.slots
            .get_mut(handle.index())
            .and_then(Option::take)
            .ok_or(ModelError::DanglingHandle(handle))
    }

    /// Clear all `forward` pointers after a remap pass.
    pub fn clear_forwards(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            slot.forward = None;
            slot.tags.remove(IdTags::NEW);
        }
    }

    /// Total number of live records, detached ones included.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::IdPayload;
    use crate::window::{Window, WindowManager};
    use crate::workspace::{Screen, WorkSpace};
    use crate::ids::WindowId;

    fn doc_with_workspace() -> (Document, IdHandle, IdHandle, IdHandle) {
        let mut doc = Document::new();
        let s1 = doc.add(Id::new("Default", IdPayload::Screen(Screen::new(1))));
        let s2 = doc.add(Id::new("Shading", IdPayload::Screen(Screen::new(3))));
        let mut workspace = WorkSpace::new();
        workspace.add_layout("Default", s1);
        workspace.add_layout("Shading", s2);
        let ws = doc.add(Id::new("General", IdPayload::WorkSpace(workspace)));
        doc.get_mut(s1).unwrap().users = 1;
        doc.get_mut(s2).unwrap().users = 1;
        (doc, s1, s2, ws)
    }

    #[test]
    fn test_copy_id_bumps_each_reference_once() {
        let (mut doc, s1, s2, ws) = doc_with_workspace();

        let copy = doc.copy_id(ws, CopyFlags::empty()).unwrap();

        assert_eq!(doc.get(copy).unwrap().users, 0);
        assert_eq!(doc.get(s1).unwrap().users, 2);
        assert_eq!(doc.get(s2).unwrap().users, 2);
    }

    #[test]
    fn test_copy_id_no_refcount_leaves_counts() {
        let (mut doc, s1, s2, ws) = doc_with_workspace();

        doc.copy_id(ws, CopyFlags::NO_USER_REFCOUNT).unwrap();
        assert_eq!(doc.get(s1).unwrap().users, 1);
        assert_eq!(doc.get(s2).unwrap().users, 1);
    }

    #[test]
    fn test_copy_id_detached_not_listed() {
        let (mut doc, _, _, ws) = doc_with_workspace();

        let before = doc.count_of(IdCode::WORKSPACE);
        doc.copy_id(ws, CopyFlags::NO_MAIN).unwrap();
        assert_eq!(doc.count_of(IdCode::WORKSPACE), before);
    }

    #[test]
    fn test_copy_id_fixes_self_reference() {
        // A window manager whose window hooks point at a workspace; copying
        // the workspace must not touch the manager, but copying a record
        // that references itself must redirect into the copy.
        let mut doc = Document::new();
        let screen = doc.add(Id::new("S", IdPayload::Screen(Screen::new(1))));
        let mut wm = WindowManager::new();
        let mut win = Window::new(WindowId(1));
        // Hook deliberately left pointing at the manager's own handle below.
        win.hook.workspace = Some(IdHandle(1));
        wm.windows.push(win);
        let wm_handle = doc.add(Id::new("Manager", IdPayload::WindowManager(wm)));
        assert_eq!(wm_handle, IdHandle(1));

        let copy = doc.copy_id(wm_handle, CopyFlags::empty()).unwrap();
        let copied = doc.get(copy).unwrap().window_manager().unwrap();
        assert_eq!(copied.windows[0].hook.workspace, Some(copy));
        // The self-reference contributed no count change anywhere.
        assert_eq!(doc.get(screen).unwrap().users, 0);
    }

    #[test]
    fn test_set_forward_and_clear() {
        let (mut doc, _, _, ws) = doc_with_workspace();

        let copy = doc.copy_id(ws, CopyFlags::SET_FORWARD).unwrap();
        assert_eq!(doc.get(ws).unwrap().forward, Some(copy));
        assert!(doc.get(copy).unwrap().tags.contains(IdTags::NEW));

        doc.clear_forwards();
        assert_eq!(doc.get(ws).unwrap().forward, None);
        assert!(!doc.get(copy).unwrap().tags.contains(IdTags::NEW));
    }

    #[test]
    fn test_free_id_refuses_used_record() {
        let (mut doc, s1, _, _) = doc_with_workspace();

        let err = doc.free_id(s1).unwrap_err();
        assert!(matches!(err, ModelError::StillInUse { users: 1, .. }));
    }

    #[test]
    fn test_free_id_releases_references() {
        let (mut doc, s1, s2, ws) = doc_with_workspace();

        doc.free_id(ws).unwrap();
        assert_eq!(doc.get(s1).unwrap().users, 0);
        assert_eq!(doc.get(s2).unwrap().users, 0);
        assert!(doc.get(ws).is_err());
    }

    #[test]
    fn test_window_manager_handle() {
        let mut doc = Document::new();
        assert!(doc.window_manager_handle().is_none());
        let wm = doc.add(Id::new(
            "Manager",
            IdPayload::WindowManager(WindowManager::new()),
        ));
        assert_eq!(doc.window_manager_handle(), Some(wm));
    }
}
