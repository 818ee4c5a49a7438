//! Session state and post-load reconciliation.
//!
//! A [`Session`] owns the live document and window set for one running
//! application instance. Loading an archive never mutates the session until
//! the very end: the archive is decoded into a fresh document, the window
//! reconciler merges the previous window manager into it (preserving native
//! window handles), and only then is the live document swapped in a single
//! explicit [`Session::install`] step.

mod load;
mod reconcile;
mod session;
mod startup;

pub use load::{SessionError, load_from_path, load_startup};
pub use reconcile::{ReconcileOutcome, WmSetupState, reconcile_window_manager};
pub use session::Session;
pub use startup::startup_archive;
