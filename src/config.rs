use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BIND: &str = "127.0.0.1:7878";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FieldstoreConfig {
    pub database: Option<String>,
    pub scaffold_dir: Option<String>,
    pub bind: Option<String>,
}

impl FieldstoreConfig {
    /// Database path: explicit flag, then config file, then the default location
    pub fn database_path(&self, flag: Option<&Path>, base: &Path) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.database.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| default_database_path_in(base))
    }

    pub fn bind_address(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.bind.clone())
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("fieldstore.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".fieldstore").join("fieldstore.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<FieldstoreConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: FieldstoreConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &FieldstoreConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
