use std::fmt;

/// Two-byte type code identifying the kind of an [`crate::Id`] record.
///
/// The code is embedded as the first two bytes of the record's full name,
/// so a name is always self-describing (`"SRLayout.001"` is a screen).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdCode([u8; 2]);

impl IdCode {
    /// Screen (UI layout geometry).
    pub const SCREEN: Self = Self(*b"SR");
    /// Workspace (a named set of layouts).
    pub const WORKSPACE: Self = Self(*b"WS");
    /// Window manager (the set of OS windows).
    pub const WINDOW_MANAGER: Self = Self(*b"WM");

    pub const fn as_bytes(self) -> [u8; 2] {
        self.0
    }

    pub fn from_bytes(bytes: [u8; 2]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for IdCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Handle of an [`crate::Id`] record inside one [`crate::Document`] arena.
///
/// Handles are plain indices and are only meaningful against the document
/// that produced them; they are never reused within one load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdHandle(pub(crate) u32);

impl IdHandle {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Stable identifier of an OS-level window.
///
/// Unlike handles and pointers, a window id survives a reload: it is stored
/// in the archive and is the only key used to match windows and layout
/// relations across document generations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct WindowId(pub u32);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
