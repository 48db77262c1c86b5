use serde::Serialize;

use crate::error::{FatalKind, UpasError};
use crate::models::FieldError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    DryRun,
    Commit,
}

/// Terminal state of an import. A dry run always ends `Aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Committed,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowErrors {
    pub row_number: usize,
    pub messages: Vec<FieldError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowWarning {
    pub row_number: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FatalError {
    pub kind: FatalKind,
    pub message: String,
}

impl From<&UpasError> for FatalError {
    fn from(err: &UpasError) -> Self {
        Self {
            kind: err.fatal_kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultReport {
    pub mode: ImportMode,
    pub status: ImportStatus,
    pub file_name: String,
    pub total_rows: usize,
    /// Rows that passed validation and duplicate checks.
    pub accepted_count: usize,
    pub imported_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub errors: Vec<RowErrors>,
    pub warnings: Vec<RowWarning>,
    pub imported_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal: Option<FatalError>,
}

impl ResultReport {
    /// Degraded report for an import that stopped before reading rows.
    pub fn fatal(mode: ImportMode, file_name: &str, err: &UpasError) -> Self {
        ReportBuilder::new(mode, file_name).finish(ImportStatus::Aborted, Vec::new(), Some(err.into()))
    }

    pub fn is_committed(&self) -> bool {
        self.status == ImportStatus::Committed
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Accumulates row outcomes by value; each step returns the next builder.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    mode: ImportMode,
    file_name: String,
    total_rows: usize,
    accepted_count: usize,
    errors: Vec<RowErrors>,
    warnings: Vec<RowWarning>,
}

impl ReportBuilder {
    pub fn new(mode: ImportMode, file_name: &str) -> Self {
        Self {
            mode,
            file_name: file_name.to_string(),
            total_rows: 0,
            accepted_count: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn row_seen(mut self) -> Self {
        self.total_rows += 1;
        self
    }

    pub fn accepted(mut self) -> Self {
        self.accepted_count += 1;
        self
    }

    pub fn rejected(mut self, row_number: usize, messages: Vec<FieldError>) -> Self {
        self.errors.push(RowErrors {
            row_number,
            messages,
        });
        self
    }

    pub fn warned(mut self, row_number: usize, message: impl Into<String>) -> Self {
        self.warnings.push(RowWarning {
            row_number,
            message: message.into(),
        });
        self
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn finish(
        self,
        status: ImportStatus,
        imported_ids: Vec<i64>,
        fatal: Option<FatalError>,
    ) -> ResultReport {
        ResultReport {
            mode: self.mode,
            status,
            file_name: self.file_name,
            total_rows: self.total_rows,
            accepted_count: self.accepted_count,
            imported_count: imported_ids.len(),
            error_count: self.errors.len(),
            warning_count: self.warnings.len(),
            errors: self.errors,
            warnings: self.warnings,
            imported_ids,
            fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_counts() {
        let report = ReportBuilder::new(ImportMode::Commit, "list.csv")
            .row_seen()
            .accepted()
            .row_seen()
            .rejected(3, vec![FieldError::new("sexe", "must be M or F")])
            .row_seen()
            .warned(4, "duplicate")
            .finish(ImportStatus::Aborted, Vec::new(), None);
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.accepted_count, 1);
        assert_eq!(report.error_count, 1);
        assert_eq!(report.warning_count, 1);
        assert_eq!(report.imported_count, 0);
        assert_eq!(report.errors[0].row_number, 3);
    }

    #[test]
    fn test_fatal_report_has_no_row_detail() {
        let err = UpasError::MissingColumns(vec!["sexe".into()]);
        let report = ResultReport::fatal(ImportMode::Commit, "list.csv", &err);
        assert_eq!(report.status, ImportStatus::Aborted);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
        assert_eq!(report.total_rows, 0);
        let fatal = report.fatal.unwrap();
        assert_eq!(fatal.kind, FatalKind::Header);
        assert!(fatal.message.contains("sexe"));
    }

    #[test]
    fn test_json_shape() {
        let report = ReportBuilder::new(ImportMode::DryRun, "list.csv")
            .row_seen()
            .rejected(2, vec![FieldError::new("telephone", "is required")])
            .finish(ImportStatus::Aborted, Vec::new(), None);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mode"], "dry_run");
        assert_eq!(json["status"], "aborted");
        assert_eq!(json["errors"][0]["row_number"], 2);
        assert_eq!(json["errors"][0]["messages"][0]["field"], "telephone");
        assert!(json.get("fatal").is_none());
    }
}
