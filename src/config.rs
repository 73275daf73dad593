//! Process configuration feeding the module system: a `vesper.toml`
//! next to the script (or cwd), the `VESPER_MODULE_PATH` environment
//! variable, and a user-level module directory.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE: &str = "vesper.toml";
pub const MODULE_PATH_ENV: &str = "VESPER_MODULE_PATH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed reading config '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed parsing config '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub modules: ModuleConfig,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ModuleConfig {
    /// Explicit search directories, highest precedence first.
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
    /// Package name → package root directory.
    #[serde(default)]
    pub packages: HashMap<String, PathBuf>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `vesper.toml` in `dir`, or defaults when there is none.
    pub fn discover(dir: &Path) -> Result<Config, ConfigError> {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            Config::load(&candidate)
        } else {
            Ok(Config::default())
        }
    }
}

impl ModuleConfig {
    /// The ordered module search list: configured paths, then the
    /// `VESPER_MODULE_PATH` entries, then the per-user module dir.
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self.search_paths.clone();
        if let Ok(joined) = env::var(MODULE_PATH_ENV) {
            for entry in env::split_paths(&joined) {
                if !entry.as_os_str().is_empty() {
                    dirs.push(entry);
                }
            }
        }
        if let Some(data_dir) = dirs::data_dir() {
            dirs.push(data_dir.join("vesper").join("modules"));
        }
        dirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_module_section() {
        let parsed: Config = toml::from_str(
            r#"
[modules]
search_paths = ["lib", "vendor/modules"]

[modules.packages]
toolkit = "vendor/toolkit"
"#,
        )
        .expect("parse");
        assert_eq!(parsed.modules.search_paths.len(), 2);
        assert_eq!(
            parsed.modules.packages.get("toolkit"),
            Some(&PathBuf::from("vendor/toolkit"))
        );
    }

    #[test]
    fn discover_defaults_when_file_is_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::discover(dir.path()).expect("discover");
        assert!(config.modules.search_paths.is_empty());
        assert!(config.modules.packages.is_empty());
    }
}
