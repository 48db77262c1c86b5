use std::path::Path;

use chrono::NaiveDate;

use crate::db::{BeneficiaryStore, ImportBatch};
use crate::duplicates::{self, DuplicateVerdict, SeenInBatch};
use crate::error::Result;
use crate::headers::{check_headers, HeaderMap};
use crate::models::{BeneficiaryDraft, Campaign};
use crate::normalizer::normalize_row;
use crate::reader::{is_blank, read_sheet, RawRow, ReadLimits, Sheet};
use crate::report::{FatalError, ImportMode, ImportStatus, ReportBuilder, ResultReport};
use crate::validator::{validate, ValidationOutcome};

#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    pub mode: ImportMode,
    /// Reference day for birth-date and age rules.
    pub today: NaiveDate,
    pub limits: ReadLimits,
}

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

/// Spreadsheet loaded and its header line accepted.
pub struct HeaderChecked {
    sheet: Sheet,
    headers: HeaderMap,
}

/// Running fold state while rows are processed.
#[derive(Debug, Clone)]
pub struct RowsState {
    pub report: ReportBuilder,
    pub accepted: Vec<BeneficiaryDraft>,
    pub seen: SeenInBatch,
}

impl RowsState {
    pub fn new(mode: ImportMode, file_name: &str) -> Self {
        Self {
            report: ReportBuilder::new(mode, file_name),
            accepted: Vec::new(),
            seen: SeenInBatch::default(),
        }
    }
}

/// Every data row has an outcome; nothing is persisted yet.
pub struct RowsProcessed {
    file_name: String,
    checksum: String,
    state: RowsState,
}

// ---------------------------------------------------------------------------
// Idle -> HeaderChecked
// ---------------------------------------------------------------------------

pub fn load_and_check(path: &Path, campaign: &Campaign, limits: &ReadLimits) -> Result<HeaderChecked> {
    let sheet = read_sheet(path, limits)?;
    let headers = check_headers(&sheet.header, &campaign.assistance)?;
    tracing::info!(
        file = %sheet.file_name,
        data_rows = sheet.rows.len(),
        "header accepted"
    );
    Ok(HeaderChecked { sheet, headers })
}

// ---------------------------------------------------------------------------
// HeaderChecked -> RowsProcessed
// ---------------------------------------------------------------------------

/// Fold one raw row into the running state.
pub fn fold_row<S: BeneficiaryStore + ?Sized>(
    store: &S,
    state: RowsState,
    raw: &RawRow,
    campaign: &Campaign,
    today: NaiveDate,
) -> Result<RowsState> {
    let RowsState {
        report,
        mut accepted,
        mut seen,
    } = state;
    let report = report.row_seen();
    let normalized = normalize_row(raw);

    let report = match validate(&normalized, campaign, today) {
        ValidationOutcome::Rejected(errors) => {
            tracing::debug!(row = raw.row_number, errors = errors.len(), "row rejected");
            report.rejected(raw.row_number, errors)
        }
        ValidationOutcome::Accepted(draft) => match duplicates::check(&draft, store, &seen)? {
            DuplicateVerdict::Unique => {
                seen.insert(&draft);
                accepted.push(draft);
                report.accepted()
            }
            verdict => {
                tracing::debug!(row = raw.row_number, "duplicate row skipped");
                let message = verdict.describe().unwrap_or_default();
                report.warned(raw.row_number, message)
            }
        },
    };

    Ok(RowsState {
        report,
        accepted,
        seen,
    })
}

pub fn process_rows<S: BeneficiaryStore + ?Sized>(
    store: &S,
    checked: HeaderChecked,
    campaign: &Campaign,
    options: &ImportOptions,
) -> Result<RowsProcessed> {
    let HeaderChecked { sheet, headers } = checked;
    let initial = RowsState::new(options.mode, &sheet.file_name);

    // Data row i sits on spreadsheet row i + 2.
    let state = sheet
        .rows
        .iter()
        .enumerate()
        .filter(|(_, cells)| !is_blank(cells))
        .map(|(idx, cells)| RawRow::from_cells(idx + 2, cells, &headers))
        .try_fold(initial, |state, raw| {
            fold_row(store, state, &raw, campaign, options.today)
        })?;

    tracing::info!(
        rows = state.report.total_rows(),
        accepted = state.accepted.len(),
        errors = state.report.error_count(),
        warnings = state.report.warning_count(),
        "rows processed"
    );
    Ok(RowsProcessed {
        file_name: sheet.file_name,
        checksum: sheet.checksum,
        state,
    })
}

// ---------------------------------------------------------------------------
// RowsProcessed -> Committed | Aborted
// ---------------------------------------------------------------------------

pub fn commit_or_abort<S: BeneficiaryStore + ?Sized>(
    store: &mut S,
    processed: RowsProcessed,
    campaign: &Campaign,
    mode: ImportMode,
) -> ResultReport {
    let RowsProcessed {
        file_name,
        checksum,
        state,
    } = processed;
    let RowsState {
        report, accepted, ..
    } = state;

    if mode == ImportMode::DryRun {
        tracing::info!("dry run, nothing persisted");
        return report.finish(ImportStatus::Aborted, Vec::new(), None);
    }
    if report.error_count() > 0 {
        tracing::warn!(errors = report.error_count(), "batch rejected, nothing persisted");
        return report.finish(ImportStatus::Aborted, Vec::new(), None);
    }
    if accepted.is_empty() {
        return report.finish(ImportStatus::Committed, Vec::new(), None);
    }

    let batch = ImportBatch {
        campaign_id: campaign.id,
        file_name,
        checksum,
        total_rows: report.total_rows(),
        warning_count: report.warning_count(),
        rows: accepted,
    };
    match store.insert_batch(&batch) {
        Ok(ids) => {
            tracing::info!(imported = ids.len(), "batch committed");
            report.finish(ImportStatus::Committed, ids, None)
        }
        Err(e) => {
            tracing::error!(error = %e, "commit failed, transaction rolled back");
            let fatal = FatalError::from(&e);
            report.finish(ImportStatus::Aborted, Vec::new(), Some(fatal))
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Run the whole pipeline. Always returns a report; batch-level failures
/// come back as a report carrying a single fatal error.
pub fn import_file<S: BeneficiaryStore + ?Sized>(
    store: &mut S,
    path: &Path,
    campaign: &Campaign,
    options: &ImportOptions,
) -> ResultReport {
    let span = tracing::info_span!("import", campaign = campaign.id, mode = ?options.mode);
    let _enter = span.enter();

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if !campaign.is_active_on(options.today) {
        tracing::warn!(campaign = %campaign.name, "campaign is outside its active date range");
    }

    let checked = match load_and_check(path, campaign, &options.limits) {
        Ok(checked) => checked,
        Err(e) => {
            tracing::warn!(error = %e, "import aborted before row processing");
            return ResultReport::fatal(options.mode, &file_name, &e);
        }
    };
    let processed = match process_rows(&*store, checked, campaign, options) {
        Ok(processed) => processed,
        Err(e) => {
            tracing::error!(error = %e, "import aborted during row processing");
            return ResultReport::fatal(options.mode, &file_name, &e);
        }
    };
    commit_or_abort(store, processed, campaign, options.mode)
}
