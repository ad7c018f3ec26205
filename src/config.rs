use crate::core::synth::DEFAULT_TOOL;
use crate::utils::get_data_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the configured ufw command
pub const UFW_COMMAND_ENV: &str = "RUFW_UFW_COMMAND";

/// Persisted operator preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Command used to invoke ufw (a name on `PATH` or an absolute path)
    #[serde(default = "default_ufw_command")]
    pub ufw_command: String,
    /// Log file; the state directory's `rufw.log` when unset
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub audit_enabled: bool,
    /// Ask before delete, disable and reset
    #[serde(default = "default_true")]
    pub confirm_destructive: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ufw_command: default_ufw_command(),
            log_file: None,
            audit_enabled: true,
            confirm_destructive: true,
        }
    }
}

impl AppConfig {
    /// The ufw command to run, honouring `RUFW_UFW_COMMAND`
    pub fn effective_ufw_command(&self) -> String {
        match std::env::var(UFW_COMMAND_ENV) {
            Ok(cmd) if !cmd.trim().is_empty() => cmd.trim().to_string(),
            _ => self.ufw_command.clone(),
        }
    }
}

fn default_ufw_command() -> String {
    DEFAULT_TOOL.to_string()
}

fn default_true() -> bool {
    true
}

/// Path of `config.json` in the data directory
pub fn config_path() -> Option<PathBuf> {
    get_data_dir().map(|dir| dir.join("config.json"))
}

/// Saves the config to the data directory using an atomic write pattern.
///
/// # Security
///
/// On Unix systems, files are created with mode 0o600 (user read/write only).
pub async fn save_config(config: &AppConfig) -> std::io::Result<()> {
    match config_path() {
        Some(path) => save_config_to(config, &path).await,
        None => Ok(()),
    }
}

/// Saves the config to `path`.
/// 1. Writes to a temporary file next to it.
/// 2. Sets restrictive permissions (0o600).
/// 3. Atomically renames to the target path.
pub async fn save_config_to(config: &AppConfig, path: &Path) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    let temp_path = path.with_extension("json.tmp");

    // Permissions are set at creation so the file is never world-readable
    #[cfg(unix)]
    {
        use tokio::fs::OpenOptions;
        use tokio::io::AsyncWriteExt;

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(0o600)
            .open(&temp_path)
            .await?;

        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
    }

    #[cfg(not(unix))]
    {
        use tokio::io::AsyncWriteExt;

        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
    }

    tokio::fs::rename(&temp_path, path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::StorageFull {
            std::io::Error::new(
                std::io::ErrorKind::StorageFull,
                "Disk full: cannot save configuration. Free up space and try again.",
            )
        } else {
            e
        }
    })?;

    tracing::debug!("Saved config to {}", path.display());
    Ok(())
}

/// Loads the config from the data directory, or returns default if not found.
pub async fn load_config() -> AppConfig {
    match config_path() {
        Some(path) => load_config_from(&path).await,
        None => AppConfig::default(),
    }
}

/// Loads the config from `path`; a missing or unreadable file yields defaults
pub async fn load_config_from(path: &Path) -> AppConfig {
    let Ok(json) = tokio::fs::read_to_string(path).await else {
        return AppConfig::default();
    };
    serde_json::from_str(&json).unwrap_or_else(|e| {
        tracing::warn!("Ignoring unreadable config {}: {}", path.display(), e);
        AppConfig::default()
    })
}
