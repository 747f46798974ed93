mod cli;
mod commands;
mod infra;
mod report;

use adler_scoring::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
