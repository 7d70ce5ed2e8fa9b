//! Configuration management for lexport.
//!
//! Loaded from TOML files and environment variables, with defaults for
//! every setting.

use crate::core::error::{LexportError, Result};
use crate::core::xdg::XdgDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Transport configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Largest accepted request frame in bytes
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    /// TCP listen address, used by `serve --tcp`
    #[serde(default = "default_listen")]
    pub listen: String,
}

/// Index engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Base directory for relative index paths
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Stemmer language for new sessions ("none" disables stemming)
    #[serde(default = "default_stemmer")]
    pub default_stemmer: String,

    /// Write the snapshot when a transaction commits
    #[serde(default = "default_flush_on_commit")]
    pub flush_on_commit: bool,
}

/// Request limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// Cap on QUERY_PAGE page sizes and cursor page counts
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// Deepest accepted query tree
    #[serde(default = "default_max_query_depth")]
    pub max_query_depth: usize,
}

// Default value functions
fn default_max_frame_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_listen() -> String {
    "127.0.0.1:6431".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_stemmer() -> String {
    "none".to_string()
}

fn default_flush_on_commit() -> bool {
    true
}

fn default_max_page_size() -> u32 {
    10_000
}

fn default_max_query_depth() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: default_max_frame_bytes(),
            listen: default_listen(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            default_stemmer: default_stemmer(),
            flush_on_commit: default_flush_on_commit(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_page_size: default_max_page_size(),
            max_query_depth: default_max_query_depth(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| LexportError::ConfigError(format!("Failed to read config file: {e}")))?;

        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load config with priority: env vars > TOML > defaults
    pub fn load() -> Result<Self> {
        let xdg = XdgDirs::new();
        Self::load_with_xdg(&xdg)
    }

    /// Load config with explicit XDG directories
    ///
    /// File priority:
    /// 1. LEXPORT_CONFIG env var
    /// 2. XDG config file (~/.config/lexport/config.toml)
    /// 3. ./lexport.toml
    /// 4. Defaults
    pub fn load_with_xdg(xdg: &XdgDirs) -> Result<Self> {
        let mut config = if let Ok(config_path) = env::var("LEXPORT_CONFIG") {
            Self::from_file(config_path)?
        } else {
            let xdg_config = xdg.config_file();
            if xdg_config.exists() {
                Self::from_file(xdg_config)?
            } else if Path::new("lexport.toml").exists() {
                Self::from_file("lexport.toml")?
            } else {
                Self::default()
            }
        };

        // Relative index paths land in the XDG data directory unless set;
        // LEXPORT_DATA_DIR replaces either, as given
        if config.engine.data_dir == default_data_dir() {
            config.engine.data_dir = xdg.indexes_dir();
        }

        config.merge_env();
        config.validate()?;

        Ok(config)
    }

    /// Merge configuration with environment variables
    pub fn merge_env(&mut self) {
        // Server configuration
        if let Ok(max_frame) = env::var("LEXPORT_MAX_FRAME_BYTES") {
            if let Ok(bytes) = max_frame.parse() {
                self.server.max_frame_bytes = bytes;
            }
        }
        if let Ok(listen) = env::var("LEXPORT_LISTEN") {
            self.server.listen = listen;
        }

        // Engine configuration
        if let Ok(data_dir) = env::var("LEXPORT_DATA_DIR") {
            self.engine.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(stemmer) = env::var("LEXPORT_DEFAULT_STEMMER") {
            self.engine.default_stemmer = stemmer;
        }

        // Limits configuration
        if let Ok(page_size) = env::var("LEXPORT_MAX_PAGE_SIZE") {
            if let Ok(size) = page_size.parse() {
                self.limits.max_page_size = size;
            }
        }
        if let Ok(depth) = env::var("LEXPORT_MAX_QUERY_DEPTH") {
            if let Ok(d) = depth.parse() {
                self.limits.max_query_depth = d;
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.max_frame_bytes < 16 {
            return Err(LexportError::ConfigError(
                "max_frame_bytes must be at least 16".to_string(),
            ));
        }

        if self.server.listen.trim().is_empty() {
            return Err(LexportError::ConfigError(
                "listen address cannot be empty".to_string(),
            ));
        }

        if crate::core::text::Stemmer::new(&self.engine.default_stemmer).is_err() {
            return Err(LexportError::ConfigError(format!(
                "Unknown default stemmer '{}'",
                self.engine.default_stemmer
            )));
        }

        if self.limits.max_page_size == 0 {
            return Err(LexportError::ConfigError(
                "max_page_size must be non-zero".to_string(),
            ));
        }

        if self.limits.max_query_depth == 0 {
            return Err(LexportError::ConfigError(
                "max_query_depth must be non-zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Log configuration
    pub fn log_config(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Max frame size: {} bytes", self.server.max_frame_bytes);
        tracing::info!("  Listen: {}", self.server.listen);
        tracing::info!("  Data dir: {:?}", self.engine.data_dir);
        tracing::info!("  Default stemmer: {}", self.engine.default_stemmer);
        tracing::info!("  Flush on commit: {}", self.engine.flush_on_commit);
        tracing::info!("  Max page size: {}", self.limits.max_page_size);
        tracing::info!("  Max query depth: {}", self.limits.max_query_depth);
    }
}
