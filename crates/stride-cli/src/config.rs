//! Configuration file management for stride.
//!
//! Provides a TOML-based config file at `~/.config/stride/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use stride_core::plan::{RemapPreferences, Weekday};
use stride_db::config::DbConfig;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub remap: RemapSection,
    #[serde(default)]
    pub validator: ValidatorSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: DbConfig::DEFAULT_URL.to_string(),
        }
    }
}

/// Athlete defaults applied by `stride plan remap` when no flag is given.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RemapSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_run_day: Option<Weekday>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_ride_day: Option<Weekday>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_strength: Option<bool>,
}

impl RemapSection {
    fn preferences(&self) -> RemapPreferences {
        RemapPreferences {
            long_run_day: self.long_run_day,
            long_ride_day: self.long_ride_day,
            include_strength: self.include_strength.unwrap_or(true),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ValidatorSection {
    #[serde(default)]
    pub require_steps: bool,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the stride config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/stride` or `~/.config/stride`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("stride");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("stride")
}

/// Return the path to the stride config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file.
///
/// Returns `Ok(None)` when no config file exists; a file that exists but
/// does not parse is an error.
pub fn load_config() -> Result<Option<ConfigFile>> {
    let path = config_path();
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(Some(config))
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    // The database URL may carry a password.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct StrideConfig {
    pub db_config: DbConfig,
    pub remap: RemapPreferences,
    pub require_steps: bool,
}

impl StrideConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `STRIDE_DATABASE_URL` env > `config_file.database.url` > `DbConfig::DEFAULT_URL`
    /// - Remap preferences and validator options come from the config file only.
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file_config = load_config()?;

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var(DbConfig::ENV_VAR) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };

        let (remap, require_steps) = match file_config {
            Some(ref cfg) => (cfg.remap.preferences(), cfg.validator.require_steps),
            None => (RemapPreferences::default(), false),
        };

        Ok(Self {
            db_config: DbConfig::new(db_url),
            remap,
            require_steps,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
