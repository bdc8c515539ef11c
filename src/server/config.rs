use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("{0} is required")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub bind_address: String,
    pub log_dir: String,
    /// Allowed CORS origin. Any origin is accepted when unset.
    pub frontend_url: Option<String>,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
pub struct PartialServerConfig {
    pub database_url: Option<String>,
    pub bind_address: Option<String>,
    pub log_dir: Option<String>,
    pub frontend_url: Option<String>,
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl PartialServerConfig {
    pub fn from_toml_str(contents: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    fn from_env() -> Result<Self, ConfigError> {
        Ok(envy::from_env::<PartialServerConfig>()?.without_blanks())
    }

    /// Same as reading the process environment, from an explicit list of
    /// variables.
    pub fn from_env_iter<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::from_iter::<_, PartialServerConfig>(vars)?.without_blanks())
    }

    /// Blank values count as unset.
    fn without_blanks(self) -> Self {
        let non_empty = |v: Option<String>| v.filter(|v| !v.trim().is_empty());
        PartialServerConfig {
            database_url: non_empty(self.database_url),
            bind_address: non_empty(self.bind_address),
            log_dir: non_empty(self.log_dir),
            frontend_url: non_empty(self.frontend_url),
        }
    }
}

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config = match config_path {
            Some(path_str) if Path::new(path_str).exists() => {
                let contents = fs::read_to_string(path_str).map_err(|source| ConfigError::Read {
                    path: path_str.to_string(),
                    source,
                })?;
                PartialServerConfig::from_toml_str(&contents, path_str)?
            }
            _ => PartialServerConfig::default(),
        };

        // 2. Load from environment variables
        let env_config = PartialServerConfig::from_env()?;

        Self::merge(env_config, file_config)
    }

    /// Environment overrides file.
    pub fn merge(
        env_config: PartialServerConfig,
        file_config: PartialServerConfig,
    ) -> Result<Self, ConfigError> {
        Ok(ServerConfig {
            database_url: env_config
                .database_url
                .or(file_config.database_url)
                .ok_or(ConfigError::Missing("DATABASE_URL"))?,
            bind_address: env_config
                .bind_address
                .or(file_config.bind_address)
                .unwrap_or_else(default_bind_address),
            log_dir: env_config
                .log_dir
                .or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
            frontend_url: env_config.frontend_url.or(file_config.frontend_url),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_overrides_file() {
        let file = PartialServerConfig::from_toml_str(
            r#"
            database_url = "sqlite://file.db"
            bind_address = "127.0.0.1:8000"
            "#,
            "config.toml",
        )
        .unwrap();
        let env = PartialServerConfig {
            database_url: Some("postgres://env/links".to_string()),
            ..Default::default()
        };

        let config = ServerConfig::merge(env, file).unwrap();
        assert_eq!(config.database_url, "postgres://env/links");
        assert_eq!(config.bind_address, "127.0.0.1:8000");
        assert_eq!(config.log_dir, "logs");
        assert!(config.frontend_url.is_none());
    }

    #[test]
    fn test_env_values_are_read_and_blank_ones_dropped() {
        let vars = [
            ("DATABASE_URL", "postgres://env/links"),
            ("BIND_ADDRESS", "  "),
            ("FRONTEND_URL", "http://localhost:5173"),
            ("UNRELATED", "ignored"),
        ]
        .map(|(k, v)| (k.to_string(), v.to_string()));

        let env = PartialServerConfig::from_env_iter(vars).unwrap();
        assert_eq!(env.database_url.as_deref(), Some("postgres://env/links"));
        assert!(env.bind_address.is_none());
        assert!(env.log_dir.is_none());

        let config = ServerConfig::merge(env, PartialServerConfig::default()).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:3000");
        assert_eq!(config.frontend_url.as_deref(), Some("http://localhost:5173"));
    }

    #[test]
    fn test_missing_database_url() {
        let result = ServerConfig::merge(PartialServerConfig::default(), PartialServerConfig::default());
        assert!(matches!(result, Err(ConfigError::Missing("DATABASE_URL"))));
    }

    #[test]
    fn test_invalid_toml() {
        let result = PartialServerConfig::from_toml_str("database_url = ", "broken.toml");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
