//! End-to-end load pipeline: decode, reconcile, install.

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use scar_archive::{ArchiveError, LoadedArchive, read_archive, read_archive_from_memory};
use scar_model::{LoadParams, ModelError, ReportList, SkipFlags};

use crate::reconcile::{ReconcileOutcome, reconcile_window_manager};
use crate::session::Session;
use crate::startup::startup_archive;

/// Errors surfacing from a whole load attempt.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// The object graph was left inconsistent; indicates a bug rather than
    /// a bad file.
    #[error("document graph error: {0}")]
    Model(#[from] ModelError),
}

/// Load the archive at `path` into `session`.
///
/// The session is untouched until decode and reconciliation have fully
/// completed; a failure leaves the previous document and windows live.
/// Failures are recorded on `reports` and returned; nothing is retried.
pub fn load_from_path(
    session: &mut Session,
    path: &Path,
    params: &LoadParams,
    reports: &mut ReportList,
) -> Result<ReconcileOutcome, SessionError> {
    let loaded = read_archive(path, params, reports)?;
    let outcome = install(session, loaded, params, reports)?;
    info!(path = %path.display(), "scene archive loaded");
    Ok(outcome)
}

/// Load the built-in startup content into `session`.
///
/// Shares the file pipeline verbatim, reading from the embedded byte range
/// instead of opening a path.
pub fn load_startup(
    session: &mut Session,
    params: &LoadParams,
    reports: &mut ReportList,
) -> Result<ReconcileOutcome, SessionError> {
    let params = LoadParams {
        is_startup: true,
        ..*params
    };
    let bytes = startup_archive();
    let loaded = read_archive_from_memory(&bytes, &params, reports)?;
    install(session, loaded, &params, reports)
}

fn install(
    session: &mut Session,
    loaded: LoadedArchive,
    params: &LoadParams,
    reports: &mut ReportList,
) -> Result<ReconcileOutcome, SessionError> {
    let LoadedArchive {
        mut document,
        user_prefs,
    } = loaded;

    if let Some(prefs) = user_prefs {
        session.set_user_prefs(prefs);
    }

    if params.skip.contains(SkipFlags::DATA) {
        // Preferences-only load: the live document and windows stay as they
        // are.
        debug!("data skipped, leaving live document untouched");
        return Ok(ReconcileOutcome {
            state: crate::reconcile::WmSetupState::Finalized,
            synthesized_default: false,
            transplanted: 0,
            fallback_substitution: false,
        });
    }

    let old_wm = session.take_window_manager()?;
    let outcome = reconcile_window_manager(&mut document, old_wm, params.keep_ui, reports)?;

    // The swap: single explicit assignment, after reconciliation completed.
    session.install(document);
    Ok(outcome)
}
