use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_COMPLETION_URL: &str =
    "https://api.openai.com/v1/engines/gpt-3.5-turbo-instruct/completions";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_PER_PAGE: usize = 10;
pub const DEFAULT_COMMENT_PREFIX: &str = "ChatGPT suggests:";

const CONFIG_FILE: &str = ".pr-reviewer.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration, built once at startup and handed to each
/// component by reference.
///
/// Every field has a default so the tool runs with nothing but environment
/// variables set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub review: ReviewConfig,
}

/// Completion endpoint settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// Overridden by OPENAI_API_KEY
    pub api_key: String,
    /// Overridden by ORGANIZATION_ID
    pub organization_id: String,
    /// Overridden by PROJECT_ID
    pub project_id: String,
    pub api_url: String,
    pub max_tokens: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            organization_id: String::new(),
            project_id: String::new(),
            api_url: DEFAULT_COMPLETION_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Overridden by GITHUB_TOKEN
    pub token: String,
    /// REST API root, e.g. https://ghe.example.com/api/v3 for Enterprise
    pub api_url: String,
    /// Page size for the changed-files listing
    pub per_page: usize,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: DEFAULT_GITHUB_API_URL.to_string(),
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// First line of every posted comment
    pub comment_prefix: String,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            comment_prefix: DEFAULT_COMMENT_PREFIX.to_string(),
        }
    }
}

impl Config {
    /// Load configuration for a run.
    ///
    /// 1. Start from .pr-reviewer.toml in the current directory, or defaults
    /// 2. Load a local .env file into the environment, if there is one
    /// 3. Let OPENAI_API_KEY, ORGANIZATION_ID, PROJECT_ID and GITHUB_TOKEN
    ///    override the matching values
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(CONFIG_FILE);
        let mut config = if path.exists() {
            debug!(path = %path.display(), "reading config file");
            Self::load_from(path)?
        } else {
            Config::default()
        };

        match dotenvy::dotenv() {
            Ok(env_path) => debug!(path = %env_path.display(), "loaded .env overlay"),
            Err(e) if e.not_found() => {}
            Err(e) => warn!(error = %e, "ignoring unreadable .env file"),
        }

        config.apply_env(|key| std::env::var(key).ok());
        config.warn_missing_credentials();
        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Override credentials from an environment lookup. Unset variables
    /// leave the current value alone.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let overrides = [
            ("OPENAI_API_KEY", &mut self.openai.api_key),
            ("ORGANIZATION_ID", &mut self.openai.organization_id),
            ("PROJECT_ID", &mut self.openai.project_id),
            ("GITHUB_TOKEN", &mut self.github.token),
        ];
        for (key, slot) in overrides {
            if let Some(value) = lookup(key) {
                *slot = value;
            }
        }
    }

    fn warn_missing_credentials(&self) {
        let credentials = [
            ("OPENAI_API_KEY", &self.openai.api_key),
            ("ORGANIZATION_ID", &self.openai.organization_id),
            ("PROJECT_ID", &self.openai.project_id),
            ("GITHUB_TOKEN", &self.github.token),
        ];
        for (key, value) in credentials {
            if value.is_empty() {
                warn!(key, "credential is not set, using empty value");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.openai.api_key.is_empty());
        assert!(config.github.token.is_empty());
        assert_eq!(config.openai.api_url, DEFAULT_COMPLETION_URL);
        assert_eq!(config.openai.max_tokens, 500);
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.github.per_page, 10);
        assert_eq!(config.review.comment_prefix, "ChatGPT suggests:");
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
[openai]
api_url = "http://localhost:8080/v1/completions"
max_tokens = 256

[github]
api_url = "https://ghe.example.com/api/v3"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.openai.api_url, "http://localhost:8080/v1/completions");
        assert_eq!(config.openai.max_tokens, 256);
        assert!(config.openai.api_key.is_empty());
        assert_eq!(config.github.api_url, "https://ghe.example.com/api/v3");
        assert_eq!(config.github.per_page, 10);
    }

    #[test]
    fn test_env_overrides_credentials() {
        let env: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-test"),
            ("PROJECT_ID", "proj_1"),
            ("GITHUB_TOKEN", "ghp_test"),
        ]
        .into_iter()
        .collect();

        let mut config: Config = toml::from_str("[openai]\norganization_id = \"org-file\"").unwrap();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.openai.api_key, "sk-test");
        assert_eq!(config.openai.organization_id, "org-file");
        assert_eq!(config.openai.project_id, "proj_1");
        assert_eq!(config.github.token, "ghp_test");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[review]\ncomment_prefix = \"Bot says:\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.review.comment_prefix, "Bot says:");
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[github\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));
    }
}
