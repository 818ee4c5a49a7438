//! Scene archive container format reader.
//!
//! This crate turns a persisted scene archive — a path or an in-memory byte
//! range — into a populated [`scar_model::Document`]:
//!
//! 1. A [`StreamReader`] chain is built over the most efficient raw source
//!    (memory map, buffered file, caller memory), with a gzip/zstd decorator
//!    added when the stream sniffs as compressed.
//! 2. The fixed preamble is decoded by [`header`]: two historical layouts,
//!    classified as invalid / unknown-future / decoded.
//! 3. [`FileData::decode_and_validate`] checks portability (endianness,
//!    pointer width) and resolves the embedded type-layout table.
//! 4. The block loop in [`blocks`] populates the document.
//!
//! Failures never panic across the API: they are recorded on the caller's
//! [`scar_model::ReportList`] and returned as [`ArchiveError`] values.

mod blocks;
mod decoder;
mod encode;
mod error;
mod filedata;
pub mod header;
mod layout_table;
mod stream;

pub use blocks::{LoadedArchive, UserPrefs};
pub use decoder::{probe_header, read_archive, read_archive_from_memory};
pub use encode::{ArchiveBuilder, WindowSpec};
pub use error::{ArchiveError, Result};
pub use filedata::{FileData, LoadFlags};
pub use header::{Endianness, FormatHeader, HeaderVariant, PointerSize};
pub use layout_table::{LayoutTableError, TypeLayout, TypeRegistry};
pub use stream::{GZIP_MAGIC, StreamReader, ZSTD_MAGIC};
