use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::db::{find_campaign, refresh_participant_count};
use crate::error::{Result, UpasError};
use crate::importer::{import_file, ImportOptions};
use crate::report::{ImportMode, ImportStatus, ResultReport};
use crate::settings::load_settings;

pub fn run(file: &str, campaign: &str, dry_run: bool, json: bool) -> Result<()> {
    let settings = load_settings();
    let mut conn = open_db()?;
    let campaign = find_campaign(&conn, campaign)?;

    let options = ImportOptions {
        mode: if dry_run {
            ImportMode::DryRun
        } else {
            ImportMode::Commit
        },
        today: chrono::Local::now().date_naive(),
        limits: settings.limits(),
    };
    let report = import_file(&mut conn, &PathBuf::from(file), &campaign, &options);

    if report.imported_count > 0 {
        let participants = refresh_participant_count(&conn, campaign.id)?;
        tracing::info!(campaign = campaign.id, participants, "participant count refreshed");
    }

    if json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| UpasError::Other(e.to_string()))?;
        println!("{out}");
    } else {
        print_report(&report);
    }

    match (report.mode, report.status) {
        (ImportMode::Commit, ImportStatus::Aborted) => Err(UpasError::Other("import aborted, nothing was saved".into())),
        (ImportMode::DryRun, _) if report.fatal.is_some() || report.error_count > 0 => {
            Err(UpasError::Other("file has errors".into()))
        }
        _ => Ok(()),
    }
}

fn print_report(report: &ResultReport) {
    if let Some(fatal) = &report.fatal {
        println!("{} {}", "FAILED".red().bold(), fatal.message);
        return;
    }

    if !report.errors.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Row", "Field", "Error"]);
        for row in &report.errors {
            for err in &row.messages {
                table.add_row(vec![
                    Cell::new(row.row_number),
                    Cell::new(&err.field),
                    Cell::new(&err.message),
                ]);
            }
        }
        println!("{}\n{table}", "Errors".red().bold());
    }

    if !report.warnings.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Row", "Warning"]);
        for w in &report.warnings {
            table.add_row(vec![Cell::new(w.row_number), Cell::new(&w.message)]);
        }
        println!("{}\n{table}", "Warnings".yellow().bold());
    }

    println!(
        "{}: {} rows, {} accepted, {} errors, {} warnings",
        report.file_name, report.total_rows, report.accepted_count, report.error_count, report.warning_count
    );
    match (report.mode, report.status) {
        (ImportMode::DryRun, _) if report.error_count == 0 => println!(
            "{} {} rows would be imported",
            "DRY RUN".cyan().bold(),
            report.accepted_count
        ),
        (ImportMode::DryRun, _) => println!(
            "{} fix the errors above before importing",
            "DRY RUN".cyan().bold()
        ),
        (ImportMode::Commit, ImportStatus::Committed) => println!(
            "{} {} beneficiaries imported",
            "OK".green().bold(),
            report.imported_count
        ),
        (ImportMode::Commit, ImportStatus::Aborted) => println!(
            "{} nothing was imported",
            "REJECTED".red().bold()
        ),
    }
}
