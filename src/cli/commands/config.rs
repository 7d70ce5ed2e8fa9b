//! Config command - show current configuration

use crate::cli::OutputFormat;
use crate::core::config::Config;
use crate::core::xdg::XdgDirs;
use clap::Args;
use serde::Serialize;

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Also show where configuration is looked up
    #[arg(long, short = 'a')]
    pub all: bool,
}

/// Configuration response
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    #[serde(flatten)]
    pub config: Config,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<String>,
}

/// Execute the config command
pub fn execute(
    args: ConfigArgs,
    config: &Config,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let config_file = args
        .all
        .then(|| XdgDirs::new().config_file().to_string_lossy().into_owned());

    let response = ConfigResponse {
        config: config.clone(),
        config_file,
    };

    match format {
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  server:");
            println!("    max_frame_bytes: {}", config.server.max_frame_bytes);
            println!("    listen: {}", config.server.listen);
            println!("  engine:");
            println!("    data_dir: {}", config.engine.data_dir.display());
            println!("    default_stemmer: {}", config.engine.default_stemmer);
            println!("    flush_on_commit: {}", config.engine.flush_on_commit);
            println!("  limits:");
            println!("    max_page_size: {}", config.limits.max_page_size);
            println!("    max_query_depth: {}", config.limits.max_query_depth);
            if let Some(path) = &response.config_file {
                println!("  config_file: {path}");
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
