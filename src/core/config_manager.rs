// src/core/config_manager.rs
//! Unified configuration management: defaults, optional config.yaml, then environment

use anyhow::{Context, Result};
use base64::prelude::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_DATABASE_PATH: &str = "influra_posts.db";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";
pub const DEFAULT_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8000/auth/linkedin/callback";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_PORT: u16 = 8000;

const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct ConfigManager {
    pub environment: String,
    pub server: ServerConfig,
    pub ai: AiConfig,
    pub linkedin: LinkedInConfig,
    secret_key: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    pub database_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct LinkedInConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Non-secret knobs that may live in config.yaml
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileOverrides {
    pub address: Option<String>,
    pub port: Option<u16>,
    pub database_path: Option<PathBuf>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    local: FileOverrides,
    #[serde(default)]
    production: FileOverrides,
}

impl ConfigManager {
    /// Load configuration from `config.yaml` and the process environment.
    /// `.env` is applied once in `main` before this runs.
    pub fn load() -> Result<Self> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "local".to_string());
        info!("Loading configuration for environment: {}", environment);

        let overrides = Self::load_file(Path::new("config.yaml"), &environment)?;
        Self::from_sources(&environment, overrides, |key| std::env::var(key).ok())
    }

    /// Database location only; store-only commands run without the web secrets
    pub fn load_database_path() -> Result<PathBuf> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "local".to_string());
        let overrides = Self::load_file(Path::new("config.yaml"), &environment)?;
        Ok(Self::database_path_from(&overrides, |key| std::env::var(key).ok()))
    }

    fn database_path_from<F>(file: &FileOverrides, lookup: F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup("DATABASE_URL")
            .filter(|url| !url.is_empty())
            .map(PathBuf::from)
            .or_else(|| file.database_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH))
    }

    fn load_file(path: &Path, environment: &str) -> Result<FileOverrides> {
        if !path.exists() {
            return Ok(FileOverrides::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::parse_file(&content, environment)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn parse_file(content: &str, environment: &str) -> Result<FileOverrides> {
        let file: ConfigFile = serde_yaml::from_str(content)?;
        Ok(match environment {
            "production" => file.production,
            _ => file.local,
        })
    }

    /// Assemble settings from file overrides and a key lookup (the environment in production)
    pub fn from_sources<F>(environment: &str, file: FileOverrides, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_key = lookup("SECRET_KEY").filter(|s| !s.is_empty()).ok_or_else(|| {
            anyhow::anyhow!(
                "SECRET_KEY environment variable not set. Please set a strong random string."
            )
        })?;

        if secret_key.len() < MIN_SECRET_LEN {
            anyhow::bail!(
                "SECRET_KEY must be at least {} bytes long (got {})",
                MIN_SECRET_LEN,
                secret_key.len()
            );
        }

        let port = match lookup("ROCKET_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("ROCKET_PORT must be a valid port number"))?,
            None => file.port.unwrap_or(DEFAULT_PORT),
        };

        let temperature = match lookup("GEMINI_TEMPERATURE") {
            Some(raw) => raw
                .parse::<f32>()
                .map_err(|_| anyhow::anyhow!("GEMINI_TEMPERATURE must be a number"))?,
            None => file.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        };

        let server = ServerConfig {
            database_path: Self::database_path_from(&file, &lookup),
            address: lookup("ROCKET_ADDRESS")
                .or(file.address)
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
        };

        let ai = AiConfig {
            api_key: lookup("GEMINI_API_KEY").unwrap_or_default(),
            model: lookup("GEMINI_MODEL")
                .or(file.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: lookup("GEMINI_API_URL").unwrap_or_else(|| DEFAULT_AI_BASE_URL.to_string()),
            temperature,
        };

        let linkedin = LinkedInConfig {
            client_id: lookup("LINKEDIN_CLIENT_ID").unwrap_or_default(),
            client_secret: lookup("LINKEDIN_CLIENT_SECRET").unwrap_or_default(),
            redirect_uri: lookup("LINKEDIN_REDIRECT_URI")
                .or(file.redirect_uri)
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
        };

        Ok(Self {
            environment: environment.to_string(),
            server,
            ai,
            linkedin,
            secret_key,
        })
    }

    pub fn with_database_path(mut self, path: PathBuf) -> Self {
        self.server.database_path = path;
        self
    }

    /// Key material for Rocket's private cookies, base64 of 64 or 32 secret bytes
    pub fn session_key(&self) -> String {
        let bytes = self.secret_key.as_bytes();
        let take = if bytes.len() >= 64 { 64 } else { MIN_SECRET_LEN };
        BASE64_STANDARD.encode(&bytes[..take])
    }

    /// Ensure the database parent directory exists
    pub async fn ensure_directories(&self) -> Result<()> {
        if let Some(db_parent) = self.server.database_path.parent() {
            if !db_parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(db_parent).await.with_context(|| {
                    format!(
                        "Failed to create database directory: {}",
                        db_parent.display()
                    )
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef-secret";

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_secret_key_fails() {
        let err = ConfigManager::from_sources("local", FileOverrides::default(), lookup(&[]))
            .unwrap_err();
        assert!(err.to_string().contains("SECRET_KEY"));
    }

    #[test]
    fn test_short_secret_key_fails() {
        let result = ConfigManager::from_sources(
            "local",
            FileOverrides::default(),
            lookup(&[("SECRET_KEY", "short")]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults() {
        let config = ConfigManager::from_sources(
            "local",
            FileOverrides::default(),
            lookup(&[("SECRET_KEY", SECRET)]),
        )
        .unwrap();

        assert_eq!(config.environment, "local");
        assert_eq!(config.server.database_path, PathBuf::from(DEFAULT_DATABASE_PATH));
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.ai.model, DEFAULT_MODEL);
        assert_eq!(config.ai.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(config.linkedin.redirect_uri, DEFAULT_REDIRECT_URI);
        assert!(config.ai.api_key.is_empty());
    }

    #[test]
    fn test_environment_beats_file() {
        let file = FileOverrides {
            port: Some(9000),
            model: Some("file-model".to_string()),
            database_path: Some(PathBuf::from("from_file.db")),
            ..Default::default()
        };
        let config = ConfigManager::from_sources(
            "local",
            file,
            lookup(&[
                ("SECRET_KEY", SECRET),
                ("ROCKET_PORT", "8088"),
                ("DATABASE_URL", "env.db"),
            ]),
        )
        .unwrap();

        assert_eq!(config.server.port, 8088);
        assert_eq!(config.server.database_path, PathBuf::from("env.db"));
        assert_eq!(config.ai.model, "file-model");
    }

    #[test]
    fn test_parse_file_selects_section() {
        let yaml = "local:\n  port: 7000\nproduction:\n  port: 80\n  model: prod-model\n";
        let local = ConfigManager::parse_file(yaml, "local").unwrap();
        let production = ConfigManager::parse_file(yaml, "production").unwrap();

        assert_eq!(local.port, Some(7000));
        assert_eq!(production.port, Some(80));
        assert_eq!(production.model.as_deref(), Some("prod-model"));
    }

    #[test]
    fn test_session_key_is_valid_base64_length() {
        let config = ConfigManager::from_sources(
            "local",
            FileOverrides::default(),
            lookup(&[("SECRET_KEY", SECRET)]),
        )
        .unwrap();

        let decoded = BASE64_STANDARD.decode(config.session_key()).unwrap();
        assert_eq!(decoded.len(), 32);
    }
}
