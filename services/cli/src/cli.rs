use crate::commands::{self, CleanupArgs, ElementArgs, ScoresArgs};
use adler_scoring::config::AppConfig;
use adler_scoring::error::AppError;
use adler_scoring::telemetry;
use clap::{Parser, Subcommand};
use std::io;

#[derive(Parser, Debug)]
#[command(
    name = "adler-scoring",
    about = "Score learning elements and clean up score records from a platform snapshot",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a batch of elements for one user
    Scores(ScoresArgs),
    /// Score a single element, failing on any error
    Element(ElementArgs),
    /// Remove score records left behind by deleted courses or modules
    Cleanup(CleanupArgs),
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let stdout = io::stdout();
    let out = stdout.lock();
    match cli.command {
        Command::Scores(args) => commands::run_scores(args, &config, out).await,
        Command::Element(args) => commands::run_element(args, &config, out),
        Command::Cleanup(args) => commands::run_cleanup(args, out),
    }
}
