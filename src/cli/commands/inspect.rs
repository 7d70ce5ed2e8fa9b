//! Inspect command - summarize an index directory

use crate::cli::output::{colors, format_bytes, format_relative_time};
use crate::cli::OutputFormat;
use crate::core::config::Config;
use crate::core::engine::shard::Shard;
use crate::core::error::LexportError;
use clap::Args;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// Arguments for the inspect-db command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Index directory; relative paths resolve against the data directory
    pub path: PathBuf,
}

/// Index summary response
#[derive(Debug, Serialize)]
pub struct InspectResponse {
    pub path: String,
    pub uuid: String,
    pub created_at: String,
    pub documents: usize,
    pub last_docid: u32,
    pub metadata_keys: usize,
    pub snapshot_bytes: u64,
}

/// Execute the inspect-db command
pub fn execute(
    args: InspectArgs,
    config: &Config,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = if args.path.is_absolute() {
        args.path
    } else {
        config.engine.data_dir.join(&args.path)
    };

    if !Shard::exists(&dir) {
        return Err(LexportError::IndexNotFound(format!(
            "No index at '{}'",
            dir.display()
        ))
        .into());
    }

    let summary = Shard::summarize(&dir).map_err(LexportError::from)?;
    let snapshot_bytes = fs::metadata(Shard::snapshot_path(&dir))?.len();

    let response = InspectResponse {
        path: summary.path.to_string_lossy().into_owned(),
        uuid: summary.uuid,
        created_at: summary.created_at.to_rfc3339(),
        documents: summary.doccount,
        last_docid: summary.last_docid,
        metadata_keys: summary.metadata_keys,
        snapshot_bytes,
    };

    match format {
        OutputFormat::Human => {
            println!(
                "{}: {}",
                colors::label("Index"),
                colors::file_path(&response.path)
            );
            println!("  {}: {}", colors::label("UUID"), colors::id(&response.uuid));
            println!(
                "  {}: {} {}",
                colors::label("Created"),
                response.created_at,
                colors::dim(&format!("({})", format_relative_time(&summary.created_at)))
            );
            println!(
                "  {}: {}",
                colors::label("Documents"),
                colors::number(&response.documents.to_string())
            );
            println!(
                "  {}: {}",
                colors::label("Last docid"),
                colors::number(&response.last_docid.to_string())
            );
            println!(
                "  {}: {}",
                colors::label("Metadata keys"),
                colors::number(&response.metadata_keys.to_string())
            );
            println!(
                "  {}: {}",
                colors::label("Snapshot"),
                colors::number(&format_bytes(response.snapshot_bytes))
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
