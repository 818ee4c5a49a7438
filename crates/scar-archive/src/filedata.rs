//! Per-load decode context and the decode/validation state machine.

use bitflags::bitflags;
use tracing::debug;

use scar_model::{ReportList, SkipFlags};

use crate::error::{ArchiveError, Result};
use crate::header::{Endianness, FormatHeader, HeaderVariant, PointerSize, decode_header};
use crate::layout_table::{TypeRegistry, read_type_registry};
use crate::stream::StreamReader;

bitflags! {
    /// Facts established about the archive while decoding its preamble.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LoadFlags: u32 {
        /// The header decoded successfully.
        const HEADER_OK = 1 << 0;
        /// The archive was written by a 32-bit build.
        const POINTER_SIZE_4 = 1 << 1;
        /// The writing build's pointer width differs from ours.
        const POINTER_SIZE_DIFFERS = 1 << 2;
        /// The archive's byte order differs from ours.
        const ENDIAN_SWAP = 1 << 3;
        /// Recognized tag, undecodable remainder: probably a newer format.
        const FILE_FUTURE = 1 << 4;
    }
}

/// Transient context for one load attempt.
///
/// Owns the stream for the duration of the decode; dropping the context on
/// any failure path releases the reader chain exactly once.
#[derive(Debug)]
pub struct FileData {
    stream: StreamReader,
    pub flags: LoadFlags,
    pub header: Option<FormatHeader>,
    pub file_version: u32,
    pub skip: SkipFlags,
    pub registry: Option<TypeRegistry>,
    /// Path or "<memory>", for report messages.
    source: String,
}

impl FileData {
    pub fn new(stream: StreamReader, source: impl Into<String>, skip: SkipFlags) -> Self {
        Self {
            stream,
            flags: LoadFlags::empty(),
            header: None,
            file_version: 0,
            skip,
            registry: None,
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn stream_mut(&mut self) -> &mut StreamReader {
        &mut self.stream
    }

    fn read_header(&mut self) {
        match decode_header(&mut self.stream) {
            HeaderVariant::Invalid => {}
            HeaderVariant::Unknown => {
                self.flags |= LoadFlags::FILE_FUTURE;
            }
            HeaderVariant::Header(header) => {
                self.flags |= LoadFlags::HEADER_OK;
                if header.pointer_size == PointerSize::Four {
                    self.flags |= LoadFlags::POINTER_SIZE_4;
                }
                if header.pointer_size != PointerSize::native() {
                    self.flags |= LoadFlags::POINTER_SIZE_DIFFERS;
                }
                if header.endianness != Endianness::native() {
                    self.flags |= LoadFlags::ENDIAN_SWAP;
                }
                self.file_version = header.file_version;
                self.header = Some(header);
            }
        }
        debug!(flags = ?self.flags, version = self.file_version, "decoded archive header");
    }

    /// Decode the header, check portability, resolve the type layouts.
    ///
    /// Every failure is recorded on `reports` as an error and returned as a
    /// tagged failure; the context (and with it the reader chain) is
    /// released before returning. On success the validated context is handed
    /// back for document population.
    pub fn decode_and_validate(mut self, reports: &mut ReportList) -> Result<Self> {
        self.read_header();

        if self.flags.contains(LoadFlags::ENDIAN_SWAP) {
            reports.error(format!(
                "Archive '{}' was written by a build with different byte order; \
                 support for these files has been removed, use an older build to convert it",
                self.source
            ));
            return Err(ArchiveError::EndianUnsupported);
        }

        if self.flags.contains(LoadFlags::HEADER_OK) {
            return match read_type_registry(&mut self.stream) {
                Ok(registry) => {
                    self.registry = Some(registry);
                    Ok(self)
                }
                Err(reason) => {
                    reports.error(format!(
                        "Failed to read archive '{}': {reason}",
                        self.source
                    ));
                    Err(ArchiveError::StructLayoutFailure {
                        reason: reason.to_string(),
                    })
                }
            };
        }

        if self.flags.contains(LoadFlags::FILE_FUTURE) {
            reports.error(format!(
                "Cannot read archive '{}': incomplete header, may be from a newer version",
                self.source
            ));
            return Err(ArchiveError::FutureVersion);
        }

        reports.error(format!(
            "Failed to read '{}': not a scene archive",
            self.source
        ));
        Err(ArchiveError::format_failure("not a scene archive"))
    }
}
