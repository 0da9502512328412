// src/cli.rs
use crate::core::{ConfigManager, DraftStore};
use crate::export::ExportFormat;
use crate::web::start_web_server;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "influra")]
#[command(about = "Draft LinkedIn posts from a profile, trends and images")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Database file or sqlite: URL, overriding DATABASE_URL
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the web server (default)
    Serve,
    /// Create the database schema and exit
    InitDb,
    /// Export saved posts
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Md)]
        format: ExportFormat,
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List saved posts
    Posts,
}

async fn open_store(database: Option<PathBuf>) -> Result<DraftStore> {
    let path = match database {
        Some(path) => path,
        None => ConfigManager::load_database_path()?,
    };
    let store = DraftStore::new(&path)?;
    store.init().await?;
    Ok(store)
}

async fn write_export(store: &DraftStore, format: ExportFormat, output: Option<&Path>) -> Result<()> {
    let posts = store.list_posts().await?;
    let body = format.render(&posts)?;

    match output {
        Some(path) => {
            tokio::fs::write(path, body)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Exported {} post(s) to {}", posts.len(), path.display());
        }
        None => print!("{}", body),
    }
    Ok(())
}

pub async fn handle_command(cli: Cli) -> Result<()> {
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let mut config = ConfigManager::load()?;
            if let Some(path) = cli.database {
                config = config.with_database_path(path);
            }
            start_web_server(config).await
        }
        Command::InitDb => {
            let store = open_store(cli.database).await?;
            store.health_check().await?;
            info!("Database ready at {}", store.location());
            Ok(())
        }
        Command::Export { format, output } => {
            let store = open_store(cli.database).await?;
            write_export(&store, format, output.as_deref()).await
        }
        Command::Posts => {
            let store = open_store(cli.database).await?;
            let posts = store.list_posts().await?;
            if posts.is_empty() {
                println!("No saved posts.");
            }
            for post in posts {
                let preview: String = post.content.chars().take(60).collect();
                println!(
                    "{:>4}  {:<6}  {}  {}",
                    post.id,
                    post.status,
                    post.created_at.format("%Y-%m-%d %H:%M"),
                    preview.replace('\n', " ")
                );
            }
            Ok(())
        }
    }
}
