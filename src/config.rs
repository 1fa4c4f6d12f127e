use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Database file used when neither the CLI nor the config names one
pub const DEFAULT_DATABASE: &str = "local.db";

/// Snapshot loaded by `seed` when no file is given
pub const DEFAULT_DATA_FILE: &str = "static/data/nature_papers_by_year.json";

/// Label stamped onto seeded rows when none is given
pub const DEFAULT_LABEL: &str = "Nature";

pub const DEFAULT_PORT: u16 = 5173;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SciSciConfig {
    pub database: Option<String>,
    pub data_file: Option<String>,
    pub label: Option<String>,
    pub port: Option<u16>,
}

impl SciSciConfig {
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(self.database.as_deref().unwrap_or(DEFAULT_DATABASE))
    }

    pub fn data_file_path(&self) -> PathBuf {
        PathBuf::from(self.data_file.as_deref().unwrap_or(DEFAULT_DATA_FILE))
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(DEFAULT_LABEL)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Reject settings that would only fail later, at open or bind time
    pub fn validate(&self) -> anyhow::Result<()> {
        if matches!(self.database.as_deref(), Some("")) {
            anyhow::bail!("database must not be empty");
        }
        if matches!(self.data_file.as_deref(), Some("")) {
            anyhow::bail!("data_file must not be empty");
        }
        if matches!(self.label.as_deref(), Some("")) {
            anyhow::bail!("label must not be empty");
        }
        if self.port == Some(0) {
            anyhow::bail!("port must be between 1 and 65535");
        }
        Ok(())
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("scisci.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<SciSciConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: SciSciConfig =
        toml::from_str(&contents).with_context(|| format!("invalid config in {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config in {}", path.display()))?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &SciSciConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }
    config.validate()?;

    ensure_parent_dir(path)?;
    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Create the directory holding the database file if it is missing
pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    ensure_parent_dir(db_path)
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display())),
        _ => Ok(()),
    }
}
