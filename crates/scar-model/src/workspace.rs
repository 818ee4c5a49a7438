//! Workspace, layout and screen entities.
//!
//! A [`WorkSpace`] owns a list of [`WorkSpaceLayout`]s, each wrapping exactly
//! one [`Screen`] record. Which layout a given OS window last used is kept in
//! a relation list on the workspace, keyed by the window's stable
//! [`WindowId`] so relations survive records being reallocated across a
//! reload.

use crate::ids::{IdHandle, WindowId};

/// UI layout geometry for one screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    /// The window currently showing this screen, if any. A screen claimed by
    /// a window must not be shared with a second one.
    pub winid: Option<WindowId>,
    /// Number of editor areas in this screen's subdivision.
    pub areas: u32,
}

impl Screen {
    pub fn new(areas: u32) -> Self {
        Self { winid: None, areas }
    }

    /// True when no window has claimed this screen yet.
    pub fn is_unclaimed(&self) -> bool {
        self.winid.is_none()
    }
}

/// One named layout inside a workspace, wrapping a single screen record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkSpaceLayout {
    pub name: String,
    pub screen: IdHandle,
}

/// Relation entry remembering the last active layout per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutRelation {
    pub window: WindowId,
    pub layout: usize,
}

/// A named arrangement of layouts the user can switch between.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkSpace {
    pub layouts: Vec<WorkSpaceLayout>,
    /// Last-active-layout relations, most recently used first.
    relations: Vec<LayoutRelation>,
}

impl WorkSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_layout(&mut self, name: impl Into<String>, screen: IdHandle) -> usize {
        self.layouts.push(WorkSpaceLayout {
            name: name.into(),
            screen,
        });
        self.layouts.len() - 1
    }

    /// Index of the layout wrapping `screen`, if this workspace has one.
    pub fn layout_for_screen(&self, screen: IdHandle) -> Option<usize> {
        self.layouts.iter().position(|layout| layout.screen == screen)
    }

    /// Layout last active for `window`, if a relation was recorded.
    pub fn active_layout_for(&self, window: WindowId) -> Option<usize> {
        self.relations
            .iter()
            .find(|relation| relation.window == window)
            .map(|relation| relation.layout)
    }

    /// Record `layout` as the active layout for `window`.
    ///
    /// An existing relation for the window is updated and moved to the front
    /// of the list, so frequently used relations are found first.
    pub fn set_active_layout(&mut self, window: WindowId, layout: usize) {
        if let Some(pos) = self
            .relations
            .iter()
            .position(|relation| relation.window == window)
        {
            self.relations.remove(pos);
        }
        self.relations.insert(0, LayoutRelation { window, layout });
    }

    pub fn relations(&self) -> &[LayoutRelation] {
        &self.relations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(n: u32) -> IdHandle {
        IdHandle(n)
    }

    #[test]
    fn test_layout_for_screen() {
        let mut ws = WorkSpace::new();
        ws.add_layout("Modeling", handle(3));
        ws.add_layout("Shading", handle(7));

        assert_eq!(ws.layout_for_screen(handle(7)), Some(1));
        assert_eq!(ws.layout_for_screen(handle(9)), None);
    }

    #[test]
    fn test_relation_update_moves_to_front() {
        let mut ws = WorkSpace::new();
        ws.add_layout("A", handle(1));
        ws.add_layout("B", handle(2));

        ws.set_active_layout(WindowId(10), 0);
        ws.set_active_layout(WindowId(20), 1);
        assert_eq!(ws.relations()[0].window, WindowId(20));

        // Updating an existing relation reinserts it at the head.
        ws.set_active_layout(WindowId(10), 1);
        assert_eq!(ws.relations()[0].window, WindowId(10));
        assert_eq!(ws.relations().len(), 2);
        assert_eq!(ws.active_layout_for(WindowId(10)), Some(1));
    }
}
