//! Core data model for scene archives.
//!
//! This crate defines the in-memory object graph a loaded archive produces:
//! the [`Document`] container that exclusively owns all [`Id`] records for one
//! file scope, the window/workspace entities the reconciler operates on, and
//! the severity-tagged [`ReportList`] all load failures are surfaced through.

mod document;
mod error;
mod id;
mod ids;
mod params;
mod report;
mod window;
mod workspace;

pub use document::Document;
pub use error::ModelError;
pub use id::{CopyFlags, Id, IdPayload, IdTags};
pub use ids::{IdCode, IdHandle, WindowId};
pub use params::{LoadParams, SkipFlags};
pub use report::{Report, ReportList, ReportSeverity};
pub use window::{
    GpuContext, NativeHandle, TimerHandle, Window, WindowEvent, WindowManager,
    WorkSpaceInstanceHook,
};
pub use workspace::{LayoutRelation, Screen, WorkSpace, WorkSpaceLayout};
