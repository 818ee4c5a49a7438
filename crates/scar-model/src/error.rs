//! Error types for document/model operations.

use thiserror::Error;

use crate::ids::{IdCode, IdHandle};

/// Errors that can occur when manipulating a document's object graph.
#[derive(Debug, Error)]
pub enum ModelError {
    /// An id name was empty after stripping its type code.
    #[error("id name must not be empty")]
    InvalidIdName,

    /// A handle does not refer to a live record.
    #[error("dangling id handle {0:?}")]
    DanglingHandle(IdHandle),

    /// A record had a different type code than the operation expected.
    #[error("wrong id type: expected {expected}, got {actual}")]
    WrongIdType { expected: IdCode, actual: IdCode },

    /// An id was asked to be freed while owning references still exist.
    #[error("cannot free '{name}': still has {users} user(s)")]
    StillInUse { name: String, users: u32 },

    /// A layout index was out of range for its workspace.
    #[error("layout index {index} out of range for workspace '{workspace}'")]
    LayoutOutOfRange { workspace: String, index: usize },
}
