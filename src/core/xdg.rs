//! XDG Base Directory support
//!
//! Resolves where lexport looks for its configuration file and where
//! relative index paths land by default.

use std::env;
use std::fs;
use std::path::PathBuf;

/// XDG directory layout for lexport
#[derive(Debug, Clone)]
pub struct XdgDirs {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl XdgDirs {
    /// Resolve directories.
    ///
    /// Priority order (highest to lowest):
    /// 1. LEXPORT_CONFIG_DIR (config only; `LEXPORT_DATA_DIR` names the
    ///    index directory itself and is applied by the config loader)
    /// 2. XDG_CONFIG_HOME / XDG_DATA_HOME
    /// 3. XDG defaults (~/.config, ~/.local/share)
    pub fn new() -> Self {
        Self {
            config_dir: Self::resolve_config_dir(),
            data_dir: Self::resolve_data_dir(),
        }
    }

    fn resolve_config_dir() -> PathBuf {
        if let Ok(dir) = env::var("LEXPORT_CONFIG_DIR") {
            return PathBuf::from(dir);
        }

        if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("lexport");
        }

        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("lexport")
    }

    fn resolve_data_dir() -> PathBuf {
        if let Ok(xdg) = env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("lexport");
        }

        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".local")
            .join("share")
            .join("lexport")
    }

    /// Path of the config file inside the config directory
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Default base directory for relative index paths
    pub fn indexes_dir(&self) -> PathBuf {
        self.data_dir.join("indexes")
    }

    pub fn ensure_dirs_exist(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.config_dir)?;
        fs::create_dir_all(self.indexes_dir())?;
        Ok(())
    }

    pub fn log_paths(&self) {
        tracing::debug!(
            config = %self.config_dir.display(),
            data = %self.data_dir.display(),
            "XDG directories"
        );
    }
}

impl Default for XdgDirs {
    fn default() -> Self {
        Self::new()
    }
}
