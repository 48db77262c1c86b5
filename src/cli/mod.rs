pub mod assistance_types;
pub mod beneficiaries;
pub mod campaigns;
pub mod import;
pub mod init;
pub mod status;
pub mod template;

use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use rusqlite::Connection;

use crate::db::get_connection;
use crate::error::{Result, UpasError};
use crate::logging::LogFormat;
use crate::settings::load_settings;

/// Open the configured database, refusing to create one implicitly.
pub(crate) fn open_db() -> Result<Connection> {
    let path = load_settings().db_path();
    if !path.exists() {
        return Err(UpasError::Other(format!(
            "database not found at {}. Run `upas init` first.",
            path.display()
        )));
    }
    get_connection(&path)
}

pub(crate) fn parse_day(raw: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| format!("expected YYYY-MM-DD, got '{raw}'"))
}

#[derive(Parser)]
#[command(
    name = "upas",
    version,
    about = "Bulk beneficiary import for UPAS medical campaigns."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for UPAS data (default: ~/Documents/upas)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage assistance types.
    AssistanceTypes {
        #[command(subcommand)]
        command: AssistanceTypesCommands,
    },
    /// Manage campaigns.
    Campaigns {
        #[command(subcommand)]
        command: CampaignsCommands,
    },
    /// Validate a beneficiary spreadsheet and import it into a campaign.
    Import {
        /// Path to an .xlsx, .xls or .csv file
        file: String,
        /// Campaign name or id
        #[arg(long)]
        campaign: String,
        /// Validate only, persist nothing
        #[arg(long = "dry-run")]
        dry_run: bool,
        /// Print the result report as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Write a CSV template with the columns a campaign expects.
    Template {
        /// Campaign name or id
        #[arg(long)]
        campaign: String,
        /// Output path (default: template-<campaign id>.csv)
        #[arg(long)]
        output: Option<String>,
    },
    /// List beneficiaries registered on a campaign.
    Beneficiaries {
        /// Campaign name or id
        #[arg(long)]
        campaign: String,
    },
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum AssistanceTypesCommands {
    /// Add an assistance type.
    Add {
        /// Name, e.g. 'Lunettes'
        name: String,
        /// Rows must state Unilatérale or Bilatérale
        #[arg(long = "laterality-required")]
        laterality_required: bool,
        /// Minors must state whether children are in school
        #[arg(long = "schooling-required")]
        schooling_required: bool,
    },
    /// List assistance types.
    List,
}

#[derive(Subcommand)]
pub enum CampaignsCommands {
    /// Add a campaign.
    Add {
        /// Campaign name
        name: String,
        /// Assistance type name
        #[arg(long = "assistance-type")]
        assistance_type: String,
        /// First day, YYYY-MM-DD
        #[arg(long, value_parser = parse_day)]
        start: Option<NaiveDate>,
        /// Last day, YYYY-MM-DD
        #[arg(long, value_parser = parse_day)]
        end: Option<NaiveDate>,
    },
    /// List campaigns.
    List,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_import_flags() {
        let cli = Cli::parse_from([
            "upas", "-vv", "import", "list.xlsx", "--campaign", "Lunettes 2025", "--dry-run", "--json",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Import {
                file,
                campaign,
                dry_run,
                json,
            } => {
                assert_eq!(file, "list.xlsx");
                assert_eq!(campaign, "Lunettes 2025");
                assert!(dry_run);
                assert!(json);
            }
            _ => panic!("expected import"),
        }
    }

    #[test]
    fn test_parse_day() {
        assert_eq!(parse_day("2025-01-31").unwrap(), NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert!(parse_day("31/01/2025").is_err());
    }
}
