//! The live application session.

use scar_archive::UserPrefs;
use scar_model::{Document, Id, IdHandle, ModelError, WindowManager};

/// Process-wide live state: the current document and its window manager.
///
/// There is no global; callers own a `Session` and pass it by reference into
/// the load pipeline. The live document changes only through
/// [`Session::install`], which the pipeline calls once reconciliation has
/// fully completed.
#[derive(Debug, Default)]
pub struct Session {
    document: Document,
    user_prefs: Option<UserPrefs>,
}

impl Session {
    /// An empty session: no document content, no windows.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn user_prefs(&self) -> Option<&UserPrefs> {
        self.user_prefs.as_ref()
    }

    pub fn set_user_prefs(&mut self, prefs: UserPrefs) {
        self.user_prefs = Some(prefs);
    }

    /// Handle of the live window manager, if the session has one.
    pub fn window_manager_handle(&self) -> Option<IdHandle> {
        self.document.window_manager_handle()
    }

    pub fn window_manager(&self) -> Option<&WindowManager> {
        let handle = self.window_manager_handle()?;
        self.document.get(handle).ok()?.window_manager()
    }

    /// Pull the live window manager record out of the current document for
    /// reconciliation against a newly loaded one.
    pub fn take_window_manager(&mut self) -> Result<Option<Id>, ModelError> {
        match self.document.window_manager_handle() {
            Some(handle) => Ok(Some(self.document.take_id(handle)?)),
            None => Ok(None),
        }
    }

    /// The live-document swap. The previous document (and everything still
    /// reachable from it) is dropped here, after reconciliation has moved
    /// every surviving resource into `document`.
    pub fn install(&mut self, document: Document) {
        self.document = document;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scar_model::{IdPayload, WindowManager};

    #[test]
    fn test_empty_session_has_no_window_manager() {
        let session = Session::new();
        assert!(session.window_manager().is_none());
    }

    #[test]
    fn test_install_swaps_document() {
        let mut session = Session::new();
        let mut document = Document::new();
        document.add(Id::new(
            "Main",
            IdPayload::WindowManager(WindowManager::new()),
        ));
        session.install(document);
        assert!(session.window_manager().is_some());
    }
}
