use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
}

impl LoggingConfig {
    const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
    const DEFAULT_LEVEL: &str = "info";

    fn default() -> Self {
        LoggingConfig {
            level: Self::DEFAULT_LEVEL.to_string(),
        }
    }

    /// Accepts a bare level ("debug") or a module spec whose every level part
    /// is valid ("warn, dbpilot=debug").
    fn ensure_valid(&mut self) {
        let str_original = self.level.clone();
        self.level = self.level.trim().to_ascii_lowercase();

        let valid = !self.level.is_empty()
            && self.level.split(',').all(|part| {
                let level = part.rsplit('=').next().unwrap_or("").trim();
                Self::LOG_LEVELS.contains(&level)
            });

        if !valid {
            eprintln!(
                "Config error: log level of '{}' is invalid - using default of '{}'",
                str_original,
                Self::DEFAULT_LEVEL
            );
            self.level = Self::DEFAULT_LEVEL.to_owned();
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub path: String,
}

impl StoreConfig {
    const DB_FILENAME: &str = "dbpilot.db";

    fn default(data_dir: &Path) -> Self {
        StoreConfig {
            path: data_dir.join(Self::DB_FILENAME).to_string_lossy().into_owned(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WebhookConfig {
    timeout_secs: u64,
    pub external_url: String,
}

impl WebhookConfig {
    const DEFAULT_TIMEOUT_SECS: u64 = 3;
    const MAX_TIMEOUT_SECS: u64 = 60;

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn default() -> Self {
        WebhookConfig {
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            external_url: "http://localhost:8080".to_owned(),
        }
    }

    fn ensure_valid(&mut self) {
        if self.timeout_secs == 0 || self.timeout_secs > Self::MAX_TIMEOUT_SECS {
            eprintln!(
                "Config error: webhook timeout of {}s is out of range (1-{}) - using default of {}s",
                self.timeout_secs,
                Self::MAX_TIMEOUT_SECS,
                Self::DEFAULT_TIMEOUT_SECS
            );
            self.timeout_secs = Self::DEFAULT_TIMEOUT_SECS;
        }
        let trimmed = self.external_url.trim().trim_end_matches('/');
        self.external_url = trimmed.to_owned();
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub logging: LoggingConfig,
    pub store: StoreConfig,
    pub webhook: WebhookConfig,
}

impl Config {
    const CONFIG_FILENAME: &str = "dbpilot.toml";
    const ENV_PREFIX: &str = "DBPILOT_";

    pub fn default_with_data_dir(data_dir: &Path) -> Self {
        Config {
            logging: LoggingConfig::default(),
            store: StoreConfig::default(data_dir),
            webhook: WebhookConfig::default(),
        }
    }

    /// Loads the configuration from `explicit_path`, or from `dbpilot.toml` in the
    /// app's data directory. A default file is written there on first run.
    /// Environment variables prefixed with `DBPILOT_` override file values,
    /// using `__` for nesting (`DBPILOT_WEBHOOK__TIMEOUT_SECS=5`).
    pub fn load_config(explicit_path: Option<&Path>) -> Self {
        let data_dir = ProjectDirs::from("", "", "dbpilot")
            .map(|dirs| dirs.data_local_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let config_path = match explicit_path {
            Some(path) => path.to_path_buf(),
            None => {
                let path = data_dir.join(Self::CONFIG_FILENAME);
                Self::write_default_if_missing(&path, &Self::default_with_data_dir(&data_dir));
                path
            }
        };

        Self::load_from(&config_path, &data_dir)
    }

    fn load_from(config_path: &Path, data_dir: &Path) -> Self {
        let default_config = Self::default_with_data_dir(data_dir);

        let figment = Figment::from(Serialized::defaults(default_config.clone()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed(Self::ENV_PREFIX).split("__"));

        let mut config = figment.extract().unwrap_or_else(|err| {
            eprintln!(
                "Could not load config file {}: {}. Using default configuration.",
                config_path.display(),
                err
            );
            default_config
        });

        config.ensure_valid();

        config
    }

    fn write_default_if_missing(config_path: &Path, default_config: &Config) {
        if config_path.exists() {
            return;
        }
        if let Some(parent) = config_path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!(
                    "Failed to create configuration directory {}: {}",
                    parent.display(),
                    e
                );
                return;
            }
        }
        match toml::to_string_pretty(default_config) {
            Ok(toml_string) => {
                if let Err(e) = fs::write(config_path, toml_string) {
                    eprintln!(
                        "Failed to write default config to {}: {}",
                        config_path.display(),
                        e
                    );
                }
            }
            Err(_) => eprintln!("Failed to serialize default config."),
        }
    }

    fn ensure_valid(&mut self) {
        self.logging.ensure_valid();
        self.webhook.ensure_valid();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_when_file_missing() {
        Jail::expect_with(|jail| {
            let dir = jail.directory().to_path_buf();
            let config = Config::load_from(&dir.join("missing.toml"), &dir);
            assert_eq!(config.logging.level, "info");
            assert_eq!(config.webhook.timeout(), Duration::from_secs(3));
            assert!(config.store.path.ends_with("dbpilot.db"));
            Ok(())
        });
    }

    #[test]
    fn test_file_and_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "dbpilot.toml",
                r#"
                [logging]
                level = "DEBUG"

                [webhook]
                timeout_secs = 10
                external_url = "https://ops.example.com/"
                "#,
            )?;
            jail.set_env("DBPILOT_WEBHOOK__TIMEOUT_SECS", "5");

            let dir = jail.directory().to_path_buf();
            let config = Config::load_from(&dir.join("dbpilot.toml"), &dir);
            assert_eq!(config.logging.level, "debug");
            assert_eq!(config.webhook.timeout(), Duration::from_secs(5));
            assert_eq!(config.webhook.external_url, "https://ops.example.com");
            Ok(())
        });
    }

    #[test]
    fn test_invalid_values_are_repaired() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "dbpilot.toml",
                r#"
                [logging]
                level = "loud"

                [webhook]
                timeout_secs = 0
                external_url = "http://x"
                "#,
            )?;

            let dir = jail.directory().to_path_buf();
            let config = Config::load_from(&dir.join("dbpilot.toml"), &dir);
            assert_eq!(config.logging.level, "info");
            assert_eq!(config.webhook.timeout(), Duration::from_secs(3));
            Ok(())
        });
    }

    #[test]
    fn test_module_level_spec_is_accepted() {
        let mut logging = LoggingConfig {
            level: "warn, dbpilot=debug".to_string(),
        };
        logging.ensure_valid();
        assert_eq!(logging.level, "warn, dbpilot=debug");
    }
}
