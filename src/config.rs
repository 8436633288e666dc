use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PaperbotError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
        }
    }
}

fn default_provider() -> String {
    "openai".into()
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArxivConfig {
    #[serde(default = "default_arxiv_base_url")]
    pub base_url: String,
    #[serde(default = "default_arxiv_timeout")]
    pub timeout_secs: u64,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            base_url: default_arxiv_base_url(),
            timeout_secs: default_arxiv_timeout(),
        }
    }
}

fn default_arxiv_base_url() -> String {
    crate::arxiv::DEFAULT_BASE_URL.into()
}

fn default_arxiv_timeout() -> u64 {
    30
}

/// Process configuration, constructed once at startup and injected into the
/// gateway and model client. Never read as ambient global state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub arxiv: ArxivConfig,
}

impl AppConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let cfg: Self = toml::from_str(&raw)
            .map_err(|err| PaperbotError::Protocol(format!("failed to parse configuration: {err}")))?;
        Ok(cfg)
    }

    pub fn from_env_or_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut cfg = if path.as_ref().exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        if let Ok(host) = env::var("PAPERBOT_HOST") {
            cfg.server.host = host;
        }
        if let Ok(port) = env::var("PAPERBOT_PORT") {
            if let Ok(parsed) = port.parse::<u16>() {
                cfg.server.port = parsed;
            }
        }
        if let Ok(provider) = env::var("PAPERBOT_MODEL_PROVIDER") {
            cfg.model.provider = provider;
        }
        if let Ok(model) = env::var("PAPERBOT_MODEL") {
            cfg.model.model = model;
        }
        if let Ok(key) = env::var("PAPERBOT_API_KEY") {
            cfg.model.api_key = Some(key);
        }
        if let Ok(base) = env::var("PAPERBOT_MODEL_BASE_URL") {
            cfg.model.base_url = Some(base);
        }
        if let Ok(base) = env::var("PAPERBOT_ARXIV_BASE_URL") {
            cfg.arxiv.base_url = base;
        }
        if let Ok(timeout) = env::var("PAPERBOT_ARXIV_TIMEOUT_SECS") {
            if let Ok(parsed) = timeout.parse::<u64>() {
                cfg.arxiv.timeout_secs = parsed;
            }
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_and_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nhost='127.0.0.1'\nport=9000\n[model]\nprovider='stub'\nmodel='scripted'"
        )
        .unwrap();

        env::set_var("PAPERBOT_PORT", "9100");
        let cfg = AppConfig::from_env_or_file(file.path()).unwrap();

        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.model.provider, "stub");
        env::remove_var("PAPERBOT_PORT");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = AppConfig::from_env_or_file("does-not-exist.toml").unwrap();
        assert_eq!(cfg.arxiv.base_url, crate::arxiv::DEFAULT_BASE_URL);
        assert_eq!(cfg.arxiv.timeout_secs, 30);
    }
}
