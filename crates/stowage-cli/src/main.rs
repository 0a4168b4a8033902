//! Command line access to the configured object store.
//!
//! Configure with OBJECT_STORAGE_TYPE, OBJECT_STORAGE_PATH and, for s3-like
//! storage, OBJECT_STORAGE_ENDPOINT / _ACCESS_KEY / _SECRET_KEY / _SECURE /
//! _CDN_ENDPOINT / _CDN_SECURE (a `.env` file is read if present).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use stowage_cli::{init_tracing, request_context};
use stowage_core::StorageConfig;
use stowage_storage::{ObjectStorage, Storage};

#[derive(Parser)]
#[command(name = "stowage", about = "Object storage CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local file
    Save {
        /// Destination directory (may contain `/`)
        directory: String,
        /// Destination file name
        filename: String,
        /// Path of the file to upload
        source: PathBuf,
        /// Object expiration in seconds (s3-like only, 0 = none)
        #[arg(long, default_value = "0")]
        expiry_secs: u64,
        /// Give up after this many seconds (0 = wait indefinitely)
        #[arg(long, default_value = "0")]
        timeout_secs: u64,
    },
    /// Print the URL of an object, or of a directory when no file name is given
    Url {
        directory: String,
        filename: Option<String>,
        /// Presigned URL lifetime in seconds (s3-like only)
        #[arg(long, default_value = "3600")]
        expiry_secs: u64,
    },
    /// Delete an object
    Delete {
        directory: String,
        filename: String,
        /// Give up after this many seconds (0 = wait indefinitely)
        #[arg(long, default_value = "0")]
        timeout_secs: u64,
    },
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let config = StorageConfig::from_env().context("Failed to load object storage configuration")?;
    config.validate()?;
    let storage = ObjectStorage::new(config)
        .await
        .context("Failed to initialize object storage")?;

    match cli.command {
        Commands::Save {
            directory,
            filename,
            source,
            expiry_secs,
            timeout_secs,
        } => {
            let content = tokio::fs::read(&source)
                .await
                .with_context(|| format!("Failed to read {}", source.display()))?;
            let size = content.len();
            storage
                .save(
                    &request_context(timeout_secs),
                    &directory,
                    &filename,
                    bytes::Bytes::from(content),
                    Duration::from_secs(expiry_secs),
                )
                .await?;
            print_json(&serde_json::json!({
                "success": true,
                "directory": directory,
                "filename": filename,
                "size_bytes": size,
            }))?;
        }
        Commands::Url {
            directory,
            filename,
            expiry_secs,
        } => {
            let url = storage.get_url(
                &directory,
                filename.as_deref().unwrap_or(""),
                Duration::from_secs(expiry_secs),
            )?;
            print_json(&serde_json::json!({ "url": url.as_str() }))?;
        }
        Commands::Delete {
            directory,
            filename,
            timeout_secs,
        } => {
            storage
                .delete(&request_context(timeout_secs), &directory, &filename)
                .await?;
            print_json(&serde_json::json!({
                "success": true,
                "message": format!("{}/{} deleted", directory, filename),
            }))?;
        }
    }

    Ok(())
}
