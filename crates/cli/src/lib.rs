pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use intake_core::config::LoadOptions;

use crate::commands::status::StatusArgs;

#[derive(Debug, Parser)]
#[command(
    name = "intake",
    about = "Intake operator CLI",
    long_about = "Inspect configuration, validate form definitions, and replay tracker turns offline.",
    after_help = "Examples:\n  intake config\n  intake form --path forms/admissions.toml\n  intake status --record record.json --extracted turn.json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Config file to load instead of intake.toml")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate a form definition and print its fields in asking order")]
    Form {
        #[arg(long, help = "Form TOML file (defaults to form.path, then the built-in preset)")]
        path: Option<PathBuf>,
    },
    #[command(about = "Merge a record with an extraction and report what is still missing")]
    Status {
        #[arg(long, help = "JSON object holding the current record")]
        record: PathBuf,
        #[arg(long, help = "JSON object holding newly extracted values")]
        extracted: Option<PathBuf>,
        #[arg(long, help = "Form TOML file (defaults to form.path, then the built-in preset)")]
        path: Option<PathBuf>,
    },
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            ..LoadOptions::default()
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    let result = match cli.command {
        Command::Config => commands::config::run(options),
        Command::Form { path } => commands::form::run(options, path),
        Command::Status { record, extracted, path } => commands::status::run(
            options,
            StatusArgs { record, extracted, form_path: path },
        ),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
