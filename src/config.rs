use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use serde::Deserialize;

use crate::params::store::SCHEMA_VERSION;

/// Config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "flightcfg.toml";

static CONFIG: OnceLock<Config> = OnceLock::new();

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub menu: MenuConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// File emulating the EEPROM.
    pub path: PathBuf,
    /// Schema version records are stamped with and checked against.
    pub version: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("eeprom.bin"),
            version: SCHEMA_VERSION,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    /// Seconds to wait for Enter before skipping the menu.
    pub boot_wait_secs: u32,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self { boot_wait_secs: 10 }
    }
}

/// Read the config file. An explicit path must exist; the default one is
/// optional.
pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    let (path, required) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_FILE), false),
    };
    if !required && !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    parse(&content).with_context(|| format!("parsing config {}", path.display()))
}

pub fn parse(content: &str) -> anyhow::Result<Config> {
    Ok(toml::from_str(content)?)
}

pub fn init(config: Config) {
    CONFIG.set(config).ok();
}

fn get() -> &'static Config {
    CONFIG.get_or_init(Config::default)
}

pub fn storage_path() -> &'static Path {
    &get().storage.path
}

pub fn schema_version() -> u32 {
    get().storage.version
}

pub fn boot_wait_secs() -> u32 {
    get().menu.boot_wait_secs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.storage.path, PathBuf::from("eeprom.bin"));
        assert_eq!(config.storage.version, SCHEMA_VERSION);
        assert_eq!(config.menu.boot_wait_secs, 10);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse("[storage]\npath = \"/tmp/fc.bin\"\n").unwrap();
        assert_eq!(config.storage.path, PathBuf::from("/tmp/fc.bin"));
        assert_eq!(config.storage.version, SCHEMA_VERSION);
        assert_eq!(config.menu.boot_wait_secs, 10);
    }

    #[test]
    fn explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(Some(dir.path().join("missing.toml").as_path())).is_err());

        let path = dir.path().join("fc.toml");
        std::fs::write(&path, "[menu]\nboot_wait_secs = 3\n").unwrap();
        assert_eq!(load(Some(path.as_path())).unwrap().menu.boot_wait_secs, 3);
    }

    #[test]
    fn mistyped_values_are_rejected() {
        assert!(parse("[menu]\nboot_wait_secs = \"soon\"\n").is_err());
    }
}
