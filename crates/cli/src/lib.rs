pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tutorkit_core::{LoadOptions, PipelineConfig};

#[derive(Debug, Parser)]
#[command(
    name = "tutorkit",
    about = "Tutorkit answer pipeline CLI",
    long_about = "Query the learning endpoint through the answer pipeline: \
                  parse, filter, score, cache.",
    after_help = "Examples:\n  tutorkit ask \"What is BATNA?\"\n  tutorkit warm\n  tutorkit stats"
)]
pub struct Cli {
    /// Path to a tutorkit.toml config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run a query through the pipeline and print the processed answer")]
    Ask {
        query: String,
        #[arg(long, default_value = "decision", help = "Course identifier for the exchange")]
        course: String,
        #[arg(long, help = "Emit the full processed entry as JSON")]
        json: bool,
    },
    #[command(about = "Prime the endpoint with the canonical warm-up query")]
    Warm,
    #[command(about = "Warm the endpoint, then print cache and health counters")]
    Stats,
    #[command(about = "Inspect effective configuration values")]
    Config,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_target(false).with_env_filter(filter).init();
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let config = match PipelineConfig::load(LoadOptions {
        config_path: cli.config.clone(),
        require_file: cli.config.is_some(),
    }) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("config error: {error}");
            return ExitCode::from(2);
        }
    };

    let result = match cli.command {
        Command::Ask { query, course, json } => commands::ask::run(config, &query, &course, json).await,
        Command::Warm => commands::warm::run(config).await,
        Command::Stats => commands::stats::run(config).await,
        Command::Config => commands::config::run(&config),
    };

    match result {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("{error:#}");
            ExitCode::FAILURE
        }
    }
}
