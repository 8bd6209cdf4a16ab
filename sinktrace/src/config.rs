//! Engine configuration loaded from `.sinktrace.toml`.
//!
//! The file is discovered by walking up from the analysis root; a malformed
//! file is reported and skipped, and the walk continues. Absence of any
//! config yields the defaults.

use crate::constants::CONFIG_FILENAME;
use crate::errors::report_non_fatal;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// The `[sinktrace]` table.
    #[serde(default)]
    pub sinktrace: EngineSettings,
    /// Where the configuration was found, if anywhere.
    #[serde(skip)]
    pub config_file_path: Option<PathBuf>,
}

/// Tunable engine settings.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EngineSettings {
    /// Default rule file, relative to the config file or absolute.
    #[serde(default)]
    pub rules_file: Option<PathBuf>,
    /// Override of the per-entry-point interpreted-node budget.
    #[serde(default)]
    pub node_budget: Option<usize>,
}

impl Config {
    /// Loads configuration by walking up the directory tree from `path`.
    #[must_use]
    pub fn load_from_path(path: &Path) -> Self {
        let mut current = path.to_path_buf();
        if current.is_file() {
            current.pop();
        }

        loop {
            let config_toml = current.join(CONFIG_FILENAME);
            if config_toml.exists() {
                if let Ok(content) = fs::read_to_string(&config_toml) {
                    match toml::from_str::<Self>(&content) {
                        Ok(mut config) => {
                            config.config_file_path = Some(config_toml);
                            return config;
                        }
                        Err(e) => {
                            report_non_fatal(
                                "config",
                                &format!("ignoring {}: {e}", config_toml.display()),
                            );
                        }
                    }
                }
            }

            if !current.pop() {
                break;
            }
        }

        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_walk_up_discovery() -> anyhow::Result<()> {
        let root = tempdir()?;
        fs::write(
            root.path().join(CONFIG_FILENAME),
            "[sinktrace]\nnode_budget = 500\n",
        )?;
        let nested = root.path().join("a").join("b");
        fs::create_dir_all(&nested)?;

        let config = Config::load_from_path(&nested);
        assert_eq!(config.sinktrace.node_budget, Some(500));
        assert!(config.config_file_path.is_some());
        Ok(())
    }

    #[test]
    fn test_malformed_config_degrades_to_defaults() -> anyhow::Result<()> {
        let root = tempdir()?;
        fs::write(root.path().join(CONFIG_FILENAME), "not valid toml [[[")?;

        let config = Config::load_from_path(root.path());
        assert!(config.sinktrace.node_budget.is_none());
        assert!(config.config_file_path.is_none());
        Ok(())
    }
}
