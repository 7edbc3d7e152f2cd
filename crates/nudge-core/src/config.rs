//! Configuration loading
//!
//! Settings come from an optional TOML file and are then overridden by
//! environment variables, so secrets can stay out of the file entirely.
//!
//! ```toml
//! [ai]
//! backend = "ollama"
//! host = "http://localhost:11434"
//! model = "llama3.2"
//!
//! [database]
//! path = "/home/me/nudge.db"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Backend used when none is configured
pub const DEFAULT_AI_BACKEND: &str = "gemini";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ai: AiConfig,
    pub database: DatabaseConfig,
}

/// `[ai]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// gemini, ollama, openai_compatible or mock
    pub backend: Option<String>,
    pub host: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
}

impl AiConfig {
    /// Normalized backend name, falling back to the default
    pub fn backend_name(&self) -> String {
        self.backend
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or(DEFAULT_AI_BACKEND)
            .to_lowercase()
    }
}

/// `[database]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

/// Default config file location
pub fn default_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("nudge").join("config.toml"))
}

impl Config {
    /// Load from an explicit file, or from the default location if it exists
    ///
    /// An explicit path must exist. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match default_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        config.apply_env();
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse TOML content
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override settings from process environment variables
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Override settings using a custom variable lookup
    ///
    /// Only the variables of the selected backend are consulted, so a stray
    /// `OLLAMA_HOST` does not leak into a Gemini setup.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(backend) = var("AI_BACKEND") {
            self.ai.backend = Some(backend);
        }

        let prefix = match self.ai.backend_name().as_str() {
            "gemini" => "GEMINI",
            "ollama" => "OLLAMA",
            "openai_compatible" | "openai" | "vllm" | "localai" | "llamacpp" => {
                "OPENAI_COMPATIBLE"
            }
            _ => return,
        };

        if let Some(host) = var(&format!("{}_HOST", prefix)) {
            self.ai.host = Some(host);
        }
        if let Some(model) = var(&format!("{}_MODEL", prefix)) {
            self.ai.model = Some(model);
        }
        if let Some(key) = var(&format!("{}_API_KEY", prefix)) {
            self.ai.api_key = Some(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_config_file() {
        let config = Config::parse(
            r#"
            [ai]
            backend = "ollama"
            host = "http://localhost:11434"

            [database]
            path = "/tmp/nudge.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.ai.backend_name(), "ollama");
        assert_eq!(config.ai.host.as_deref(), Some("http://localhost:11434"));
        assert!(config.ai.model.is_none());
        assert_eq!(config.database.path, Some(PathBuf::from("/tmp/nudge.db")));
    }

    #[test]
    fn test_empty_and_invalid_config() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
        assert!(matches!(
            Config::parse("[ai]\nbackend = 3"),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn test_default_backend_name() {
        let ai = AiConfig::default();
        assert_eq!(ai.backend_name(), "gemini");

        let ai = AiConfig {
            backend: Some("  Ollama ".into()),
            ..Default::default()
        };
        assert_eq!(ai.backend_name(), "ollama");
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config =
            Config::parse("[ai]\nbackend = \"gemini\"\nmodel = \"from-file\"").unwrap();
        config.apply_env_from(env(&[
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_MODEL", "gemini-2.5-pro"),
            ("OLLAMA_HOST", "http://ignored:11434"),
        ]));

        assert_eq!(config.ai.api_key.as_deref(), Some("secret"));
        assert_eq!(config.ai.model.as_deref(), Some("gemini-2.5-pro"));
        assert!(config.ai.host.is_none());
    }

    #[test]
    fn test_env_selects_backend() {
        let mut config = Config::default();
        config.apply_env_from(env(&[
            ("AI_BACKEND", "openai_compatible"),
            ("OPENAI_COMPATIBLE_HOST", "http://gpu:8000"),
            ("OPENAI_COMPATIBLE_API_KEY", "sk-test"),
            ("GEMINI_API_KEY", "unused"),
        ]));

        assert_eq!(config.ai.backend_name(), "openai_compatible");
        assert_eq!(config.ai.host.as_deref(), Some("http://gpu:8000"));
        assert_eq!(config.ai.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let mut config =
            Config::parse("[ai]\nbackend = \"ollama\"\nhost = \"http://a:1\"").unwrap();
        config.apply_env_from(env(&[("OLLAMA_HOST", "  ")]));
        assert_eq!(config.ai.host.as_deref(), Some("http://a:1"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[ai]\nbackend = \"mock\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.ai.backend_name(), "mock");

        let missing = dir.path().join("missing.toml");
        assert!(matches!(Config::load(Some(&missing)), Err(crate::Error::Io(_))));
    }
}
