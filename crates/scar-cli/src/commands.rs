//! Command implementations.

use anyhow::Context;

use scar_archive::{HeaderVariant, probe_header};
use scar_model::{IdCode, LoadParams, ReportList, SkipFlags};
use scar_session::{ReconcileOutcome, Session, load_from_path};

use crate::cli::{InfoArgs, LoadArgs};

/// What `scar load` reports back for the summary printer.
pub struct LoadResult {
    pub reports: ReportList,
    pub outcome: Option<ReconcileOutcome>,
    pub screens: usize,
    pub workspaces: usize,
    pub windows: usize,
    pub version: u32,
    pub json: bool,
}

impl LoadResult {
    pub fn has_errors(&self) -> bool {
        self.reports.has_errors()
    }
}

pub fn run_load(args: &LoadArgs) -> anyhow::Result<LoadResult> {
    let mut skip = SkipFlags::empty();
    if args.skip_prefs {
        skip |= SkipFlags::USERDEF;
    }
    if args.prefs_only {
        skip |= SkipFlags::DATA;
    }
    let params = LoadParams::new().with_skip(skip).keep_ui(args.keep_ui);

    let mut session = Session::new();
    let mut reports = ReportList::new();
    let outcome = match load_from_path(&mut session, &args.archive, &params, &mut reports) {
        Ok(outcome) => Some(outcome),
        // The report list already carries the failure; the summary prints it.
        Err(_) => None,
    };

    let document = session.document();
    Ok(LoadResult {
        reports,
        outcome,
        screens: document.count_of(IdCode::SCREEN),
        workspaces: document.count_of(IdCode::WORKSPACE),
        windows: session
            .window_manager()
            .map_or(0, |wm| wm.windows.len()),
        version: document.version,
        json: args.json,
    })
}

pub fn run_info(args: &InfoArgs) -> anyhow::Result<()> {
    let variant = probe_header(&args.archive)
        .with_context(|| format!("probing '{}'", args.archive.display()))?;

    match variant {
        HeaderVariant::Invalid => {
            println!("{}: not a scene archive", args.archive.display());
        }
        HeaderVariant::Unknown => {
            println!(
                "{}: scene archive with an unrecognized header (newer version?)",
                args.archive.display()
            );
        }
        HeaderVariant::Header(header) => {
            println!("{}: scene archive", args.archive.display());
            println!("  file version:   {}", header.file_version);
            println!("  format version: {}", header.file_format_version);
            println!("  pointer size:   {}", header.pointer_size.in_bytes());
            println!(
                "  endianness:     {}",
                match header.endianness {
                    scar_archive::Endianness::Little => "little",
                    scar_archive::Endianness::Big => "big",
                }
            );
        }
    }
    Ok(())
}
