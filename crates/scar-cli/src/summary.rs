//! Human- and machine-readable load summaries.

use scar_model::ReportSeverity;

use crate::commands::LoadResult;

pub fn print_summary(result: &LoadResult) {
    if result.json {
        match serde_json::to_string_pretty(&result.reports) {
            Ok(json) => println!("{json}"),
            Err(error) => eprintln!("error: cannot serialize reports: {error}"),
        }
        return;
    }

    for report in result.reports.iter() {
        let tag = match report.severity {
            ReportSeverity::Info => "info",
            ReportSeverity::Warning => "warning",
            ReportSeverity::Error => "error",
        };
        println!("{tag}: {}", report.message);
    }

    match &result.outcome {
        Some(outcome) => {
            println!(
                "loaded v{}: {} screen(s), {} workspace(s), {} window(s)",
                result.version, result.screens, result.workspaces, result.windows
            );
            if outcome.fallback_substitution {
                println!("note: window identities did not line up; first window was reused");
            }
        }
        None => {
            println!(
                "load failed ({} error(s), {} warning(s))",
                result.reports.error_count(),
                result.reports.warning_count()
            );
        }
    }
}
