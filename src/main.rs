mod cli;
mod db;
mod duplicates;
mod error;
mod headers;
mod importer;
mod logging;
mod models;
mod normalizer;
mod reader;
mod report;
mod settings;
mod validator;

use clap::Parser;

use cli::{AssistanceTypesCommands, CampaignsCommands, Cli, Commands};
use logging::{init_logging, LogConfig};

fn main() {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_verbosity(cli.verbose).with_format(cli.log_format.into()));

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::AssistanceTypes { command } => match command {
            AssistanceTypesCommands::Add {
                name,
                laterality_required,
                schooling_required,
            } => cli::assistance_types::add(&name, laterality_required, schooling_required),
            AssistanceTypesCommands::List => cli::assistance_types::list(),
        },
        Commands::Campaigns { command } => match command {
            CampaignsCommands::Add {
                name,
                assistance_type,
                start,
                end,
            } => cli::campaigns::add(&name, &assistance_type, start, end),
            CampaignsCommands::List => cli::campaigns::list(),
        },
        Commands::Import {
            file,
            campaign,
            dry_run,
            json,
        } => cli::import::run(&file, &campaign, dry_run, json),
        Commands::Template { campaign, output } => cli::template::run(&campaign, output),
        Commands::Beneficiaries { campaign } => cli::beneficiaries::list(&campaign),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
