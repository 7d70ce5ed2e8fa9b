//! Info command - show version and server information

use crate::cli::OutputFormat;
use crate::core::config::Config;
use crate::driver::resources::CONSTRUCTORS;
use clap::Args;
use serde::Serialize;

/// Wire protocol revision
pub const PROTOCOL_VERSION: u32 = 1;

/// Number of opcodes the session understands
const OPCODE_COUNT: u32 = 30;

/// Arguments for the info command
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Show detailed information
    #[arg(long, short = 'd')]
    pub detailed: bool,
}

/// Server information response
#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub name: String,
    pub version: String,
    pub protocol: u32,
    pub opcodes: u32,
    pub data_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constructors: Option<Vec<String>>,
}

/// Execute the info command
pub fn execute(
    args: InfoArgs,
    config: &Config,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let info = InfoResponse {
        name: "lexport".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        protocol: PROTOCOL_VERSION,
        opcodes: OPCODE_COUNT,
        data_dir: config.engine.data_dir.to_string_lossy().into_owned(),
        constructors: args
            .detailed
            .then(|| CONSTRUCTORS.iter().map(|c| c.to_string()).collect()),
    };

    match format {
        OutputFormat::Human => {
            println!("lexport {}", info.version);
            println!("Protocol: {}", info.protocol);
            println!("Opcodes: {}", info.opcodes);
            println!("Data: {}", info.data_dir);
            if let Some(constructors) = &info.constructors {
                println!("Resources: {}", constructors.join(", "));
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    Ok(())
}
