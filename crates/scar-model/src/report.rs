use serde::{Deserialize, Serialize};

/// Severity of a load report entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportSeverity {
    Info,
    Warning,
    Error,
}

/// One message produced while loading an archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub severity: ReportSeverity,
    pub message: String,
}

/// Collected reports for one load attempt.
///
/// Failures become entries here rather than aborts; the caller decides how
/// to surface them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportList {
    pub reports: Vec<Report>,
}

impl ReportList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, severity: ReportSeverity, message: impl Into<String>) {
        self.reports.push(Report {
            severity,
            message: message.into(),
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.add(ReportSeverity::Info, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.add(ReportSeverity::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.add(ReportSeverity::Error, message);
    }

    pub fn error_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|report| report.severity == ReportSeverity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|report| report.severity == ReportSeverity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Report> {
        self.reports.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut reports = ReportList::new();
        reports.info("opened");
        reports.warning("odd but recoverable");
        reports.error("fatal");

        assert_eq!(reports.warning_count(), 1);
        assert_eq!(reports.error_count(), 1);
        assert!(reports.has_errors());
    }

    #[test]
    fn test_serializes_lowercase_severity() {
        let mut reports = ReportList::new();
        reports.error("bad header");
        let json = serde_json::to_string(&reports).unwrap();
        assert!(json.contains("\"severity\":\"error\""));
    }
}
