//! Top-level archive reading: open, sniff, validate, populate.

use std::path::Path;

use tracing::info;

use scar_model::{LoadParams, ReportList};

use crate::blocks::{LoadedArchive, read_document};
use crate::error::{ArchiveError, Result};
use crate::filedata::FileData;
use crate::header::{HeaderVariant, LEGACY_HEADER_LEN, decode_header};
use crate::stream::StreamReader;

/// Read a scene archive from `path`.
///
/// Builds the reader chain (raw source, then a decompressing decorator when
/// the stream is compressed), validates the preamble and populates a fresh
/// document. All failures are recorded on `reports` and returned as a tagged
/// error; nothing is retried.
pub fn read_archive(
    path: &Path,
    params: &LoadParams,
    reports: &mut ReportList,
) -> Result<LoadedArchive> {
    if !params.is_startup {
        info!(path = %path.display(), "reading scene archive");
    }

    let raw = match StreamReader::open_path(path) {
        Ok(raw) => raw,
        Err(err) => {
            reports.error(format!("Cannot read file '{}': {err}", path.display()));
            return Err(err);
        }
    };
    let stream = sniff(raw, &path.display().to_string(), reports)?;

    let fd = FileData::new(stream, path.display().to_string(), params.skip);
    let mut fd = fd.decode_and_validate(reports)?;

    let mut loaded = populate(&mut fd, reports)?;
    loaded.document.filepath = path.to_path_buf();
    Ok(loaded)
}

/// Read a scene archive from an in-memory byte range (built-in startup
/// content). Shares the validation path of [`read_archive`] verbatim.
pub fn read_archive_from_memory(
    bytes: &[u8],
    params: &LoadParams,
    reports: &mut ReportList,
) -> Result<LoadedArchive> {
    if bytes.len() < LEGACY_HEADER_LEN {
        reports.error("Unable to read archive from memory: too short");
        return Err(ArchiveError::TooShort);
    }

    let raw = StreamReader::from_memory(bytes);
    let stream = sniff(raw, "<memory>", reports)?;

    let fd = FileData::new(stream, "<memory>", params.skip);
    let mut fd = fd.decode_and_validate(reports)?;
    populate(&mut fd, reports)
}

/// Classify the header of the archive at `path` without loading anything.
pub fn probe_header(path: &Path) -> Result<HeaderVariant> {
    let raw = StreamReader::open_path(path)?;
    let mut stream = StreamReader::wrap_uncompressed(raw)?;
    Ok(decode_header(&mut stream))
}

fn sniff(raw: StreamReader, source: &str, reports: &mut ReportList) -> Result<StreamReader> {
    StreamReader::wrap_uncompressed(raw).map_err(|err| {
        reports.error(format!("Failed to read '{source}': {err}"));
        err
    })
}

fn populate(fd: &mut FileData, reports: &mut ReportList) -> Result<LoadedArchive> {
    match read_document(fd, reports) {
        Ok(loaded) => Ok(loaded),
        Err(err) => {
            reports.error(format!(
                "Failed to read archive '{}': {err}",
                fd.source()
            ));
            Err(err)
        }
    }
}
