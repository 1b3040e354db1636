//! Configuration: compiled defaults, environment overrides, and an
//! optional `~/.apipod/config.json`.
//!
//! Precedence is layered rather than uniform: the config file's base URL
//! wins over the environment, while the environment wins for the API key
//! and model. A missing or malformed config file silently falls back to
//! defaults plus environment.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.apipod.net";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

const CONFIG_DIR: &str = ".apipod";
const CONFIG_FILE: &str = "config.json";

const ENV_BASE_URL: &str = "APIPOD_BASE_URL";
const ENV_API_KEY: &str = "APIPOD_API_KEY";
const ENV_MODEL: &str = "APIPOD_MODEL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// On-disk shape of the config file. All fields optional so a partial file
/// overrides only what it names.
#[derive(Debug, Default, Serialize, Deserialize)]
struct FileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model: Option<String>,
}

/// Values read from the process environment, captured separately so the
/// merge with the config file stays a pure function.
#[derive(Debug, Default)]
struct EnvOverrides {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
}

impl EnvOverrides {
    fn from_process() -> Self {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            base_url: non_empty(ENV_BASE_URL),
            api_key: non_empty(ENV_API_KEY),
            model: non_empty(ENV_MODEL),
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
}

impl Config {
    /// Load configuration from defaults, environment, and the config file.
    /// Never fails; anything unreadable is ignored.
    pub fn load() -> Self {
        let env = EnvOverrides::from_process();
        let file = config_path()
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|data| match serde_json::from_str::<FileConfig>(&data) {
                Ok(file) => Some(file),
                Err(e) => {
                    tracing::debug!(error = %e, "ignoring malformed config file");
                    None
                }
            });
        merge(env, file)
    }

    /// Persist the current values to the config file, creating the
    /// directory if needed.
    pub fn save(&self) -> Result<()> {
        let path =
            config_path().ok_or_else(|| Error::config("cannot determine home directory"))?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let file = FileConfig {
            base_url: Some(self.base_url.clone()),
            api_key: (!self.api_key.is_empty()).then(|| self.api_key.clone()),
            model: Some(self.model.clone()),
        };
        let data = serde_json::to_string_pretty(&file)?;
        std::fs::write(&path, data)?;

        // The file can hold an API key.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

fn merge(env: EnvOverrides, file: Option<FileConfig>) -> Config {
    let mut cfg = Config::default();

    if let Some(url) = env.base_url {
        cfg.base_url = url;
    }
    let env_key = env.api_key.is_some();
    let env_model = env.model.is_some();
    if let Some(key) = env.api_key {
        cfg.api_key = key;
    }
    if let Some(model) = env.model {
        cfg.model = model;
    }

    if let Some(file) = file {
        if let Some(url) = file.base_url.filter(|v| !v.is_empty()) {
            cfg.base_url = url;
        }
        if !env_key {
            if let Some(key) = file.api_key.filter(|v| !v.is_empty()) {
                cfg.api_key = key;
            }
        }
        if !env_model {
            if let Some(model) = file.model.filter(|v| !v.is_empty()) {
                cfg.model = model;
            }
        }
    }

    cfg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env_or_file() {
        let cfg = merge(EnvOverrides::default(), None);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.model, DEFAULT_MODEL);
        assert!(cfg.api_key.is_empty());
    }

    #[test]
    fn test_file_base_url_wins_over_env() {
        let env = EnvOverrides {
            base_url: Some("http://env.example".to_string()),
            ..Default::default()
        };
        let file = FileConfig {
            base_url: Some("http://file.example".to_string()),
            ..Default::default()
        };
        let cfg = merge(env, Some(file));
        assert_eq!(cfg.base_url, "http://file.example");
    }

    #[test]
    fn test_env_api_key_wins_over_file() {
        let env = EnvOverrides {
            api_key: Some("sk-env".to_string()),
            ..Default::default()
        };
        let file = FileConfig {
            api_key: Some("sk-file".to_string()),
            ..Default::default()
        };
        let cfg = merge(env, Some(file));
        assert_eq!(cfg.api_key, "sk-env");
    }

    #[test]
    fn test_env_model_wins_over_file() {
        let env = EnvOverrides {
            model: Some("model-env".to_string()),
            ..Default::default()
        };
        let file = FileConfig {
            model: Some("model-file".to_string()),
            ..Default::default()
        };
        let cfg = merge(env, Some(file));
        assert_eq!(cfg.model, "model-env");
    }

    #[test]
    fn test_file_fills_gaps_left_by_env() {
        let file = FileConfig {
            api_key: Some("sk-file".to_string()),
            model: Some("model-file".to_string()),
            ..Default::default()
        };
        let cfg = merge(EnvOverrides::default(), Some(file));
        assert_eq!(cfg.api_key, "sk-file");
        assert_eq!(cfg.model, "model-file");
    }

    #[test]
    fn test_empty_file_values_are_ignored() {
        let file = FileConfig {
            base_url: Some(String::new()),
            api_key: Some(String::new()),
            model: Some(String::new()),
        };
        let cfg = merge(EnvOverrides::default(), Some(file));
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_malformed_file_json_is_rejected_by_parser() {
        assert!(serde_json::from_str::<FileConfig>("{not json").is_err());
    }
}
