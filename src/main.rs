// src/main.rs
use anyhow::Result;
use clap::Parser;
use influra::cli::{handle_command, Cli};
use influra::logging::init_logging;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let log_file = std::env::var("LOG_FILE").ok().map(PathBuf::from);
    init_logging(log_file.as_deref())?;

    handle_command(Cli::parse()).await
}
