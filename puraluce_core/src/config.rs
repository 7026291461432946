use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Applies to whichever provider is configured.
const API_KEY_ENV_VAR: &str = "PURALUCE_API_KEY";
/// Gemini-only fallbacks, checked in order.
const GEMINI_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];
const MODEL_ENV_VAR: &str = "PURALUCE_MODEL";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Values read from the environment. Never written back to disk.
    #[serde(skip)]
    pub env: EnvOverrides,
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub model: Option<String>,
}

impl std::fmt::Debug for EnvOverrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvOverrides")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field(
                "gemini_api_key",
                &self.gemini_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("model", &self.model)
            .finish()
    }
}

impl EnvOverrides {
    /// The environment key usable with `kind`, if any.
    pub fn api_key_for(&self, kind: ProviderKind) -> Option<&str> {
        self.api_key
            .as_deref()
            .or_else(|| match kind {
                ProviderKind::Gemini => self.gemini_api_key.as_deref(),
                _ => None,
            })
    }
}

fn default_theme() -> String {
    "sanctuary".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Gemini,
    #[serde(rename = "openai")]
    OpenAI,
    Ollama,
    Custom,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Gemini,
        ProviderKind::OpenAI,
        ProviderKind::Ollama,
        ProviderKind::Custom,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI",
            ProviderKind::OpenAI => "OPENAI",
            ProviderKind::Ollama => "OLLAMA",
            ProviderKind::Custom => "CUSTOM",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            ProviderKind::OpenAI => "https://api.openai.com/v1",
            ProviderKind::Ollama => "http://localhost:11434/v1",
            ProviderKind::Custom => "https://api.openai.com/v1",
        }
    }

    pub fn default_auth(self) -> ProviderAuth {
        match self {
            ProviderKind::Gemini => ProviderAuth::GoogApiKey,
            ProviderKind::Ollama => ProviderAuth::None,
            _ => ProviderAuth::Bearer,
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-3-flash-preview",
            ProviderKind::OpenAI => "gpt-4o-mini",
            ProviderKind::Ollama => "llama3.2",
            ProviderKind::Custom => "",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderAuth {
    #[default]
    Bearer,
    GoogApiKey,
    None,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub auth: Option<ProviderAuth>,
    #[serde(default)]
    pub model: String,
}

// Hand-written so the key never reaches a log line through `{:?}`.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("auth", &self.auth)
            .field("model", &self.model)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::builtin(ProviderKind::Gemini, None)
    }
}

impl ProviderConfig {
    pub fn builtin(kind: ProviderKind, api_key: Option<String>) -> Self {
        Self {
            kind,
            api_key,
            base_url: kind.default_base_url().to_string(),
            auth: None,
            model: kind.default_model().to_string(),
        }
    }

    pub fn effective_auth(&self) -> ProviderAuth {
        self.auth.unwrap_or_else(|| self.kind.default_auth())
    }

    pub fn normalized(mut self) -> Self {
        if self.base_url.trim().is_empty() {
            self.base_url = self.kind.default_base_url().to_string();
        }
        self.base_url = self.base_url.trim().trim_end_matches('/').to_string();

        self.model = self.model.trim().to_string();
        if self.model.is_empty() {
            self.model = self.kind.default_model().to_string();
        }

        self.api_key = clean_optional(self.api_key.take());
        self
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self.effective_auth(), ProviderAuth::None)
    }

    pub fn is_configured(&self) -> bool {
        let has_model = !self.model.trim().is_empty();
        if !self.requires_api_key() {
            return has_model;
        }
        has_model
            && self
                .api_key
                .as_ref()
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            theme: default_theme(),
            request_timeout_secs: None,
            env: EnvOverrides::default(),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("puraluce");
        Ok(config_dir.join("config.toml"))
    }

    /// Loads the config file (defaults when absent) and applies environment
    /// overrides for the credential and model.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };
        let mut config = Self::load_from_path(&path).await?;
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub async fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config at {}", path.display()))?;

        Ok(config)
    }

    pub async fn save(&self, path: Option<&Path>) -> Result<()> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir).await?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content).await?;
        Ok(())
    }

    /// Records environment overrides. They are merged in by
    /// `effective_provider` and never serialized.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.env = EnvOverrides {
            api_key: clean_optional(lookup(API_KEY_ENV_VAR)),
            gemini_api_key: GEMINI_KEY_ENV_VARS
                .iter()
                .find_map(|name| clean_optional(lookup(name))),
            model: clean_optional(lookup(MODEL_ENV_VAR)),
        };
    }

    /// The provider as it will be used: file values with environment
    /// overrides applied for the configured kind.
    pub fn effective_provider(&self) -> ProviderConfig {
        let mut provider = self.provider.clone();
        if let Some(key) = self.env.api_key_for(provider.kind) {
            provider.api_key = Some(key.to_string());
        }
        if let Some(model) = &self.env.model {
            provider.model = model.clone();
        }
        provider.normalized()
    }

    pub fn has_credentials(&self) -> bool {
        self.effective_provider().is_configured()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

fn clean_optional(input: Option<String>) -> Option<String> {
    input.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn empty_toml_falls_back_to_gemini_defaults() {
        let config: Config = toml::from_str("").unwrap();
        let provider = config.effective_provider();
        assert_eq!(provider.kind, ProviderKind::Gemini);
        assert_eq!(provider.model, "gemini-3-flash-preview");
        assert_eq!(
            provider.base_url,
            "https://generativelanguage.googleapis.com/v1beta"
        );
        assert_eq!(provider.effective_auth(), ProviderAuth::GoogApiKey);
        assert_eq!(config.theme, "sanctuary");
        assert!(config.request_timeout().is_none());
        assert!(!config.has_credentials());
    }

    #[test]
    fn parses_provider_table() {
        let raw = r#"
theme = "dark"
request_timeout_secs = 45

[provider]
kind = "openai"
api_key = "  sk-test-key  "
base_url = "https://example.com/v1/"
model = "gpt-4o"
"#;
        let config: Config = toml::from_str(raw).unwrap();
        let provider = config.effective_provider();
        assert_eq!(provider.kind, ProviderKind::OpenAI);
        assert_eq!(provider.api_key.as_deref(), Some("sk-test-key"));
        assert_eq!(provider.base_url, "https://example.com/v1");
        assert_eq!(provider.effective_auth(), ProviderAuth::Bearer);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(45)));
        assert!(config.has_credentials());
    }

    #[test]
    fn ollama_needs_no_key() {
        let mut config = Config::default();
        config.provider = ProviderConfig::builtin(ProviderKind::Ollama, None);
        assert!(config.has_credentials());
    }

    #[test]
    fn env_overrides_follow_priority_order() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("GEMINI_API_KEY", "gemini-key"),
            ("API_KEY", "generic-key"),
            ("PURALUCE_MODEL", " gemini-2.5-pro "),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));
        let provider = config.effective_provider();
        assert_eq!(provider.api_key.as_deref(), Some("gemini-key"));
        assert_eq!(provider.model, "gemini-2.5-pro");

        let env: HashMap<&str, &str> = HashMap::from([
            ("PURALUCE_API_KEY", "puraluce-key"),
            ("GEMINI_API_KEY", "gemini-key"),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(
            config.effective_provider().api_key.as_deref(),
            Some("puraluce-key")
        );

        let env: HashMap<&str, &str> = HashMap::from([("PURALUCE_API_KEY", "  ")]);
        let mut config = Config::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));
        assert!(config.effective_provider().api_key.is_none());
    }

    #[test]
    fn gemini_env_key_never_reaches_other_providers() {
        let raw = r#"
[provider]
kind = "openai"
api_key = "sk-openai-configured"
"#;
        let mut config: Config = toml::from_str(raw).unwrap();
        let env: HashMap<&str, &str> =
            HashMap::from([("GEMINI_API_KEY", "AIzaGeminiKey"), ("API_KEY", "AIzaOther")]);
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        let provider = config.effective_provider();
        assert_eq!(provider.kind, ProviderKind::OpenAI);
        assert_eq!(provider.api_key.as_deref(), Some("sk-openai-configured"));
    }

    #[tokio::test]
    async fn env_values_are_not_saved() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        let env: HashMap<&str, &str> =
            HashMap::from([("GEMINI_API_KEY", "AIzaFromEnv"), ("PURALUCE_MODEL", "env-model")]);
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));
        assert!(config.has_credentials());
        assert!(config.provider.api_key.is_none());
        config.save(Some(&path)).await?;

        let written = tokio::fs::read_to_string(&path).await?;
        assert!(!written.contains("AIzaFromEnv"));
        assert!(!written.contains("env-model"));

        let loaded = Config::load_from_path(&path).await?;
        assert!(loaded.provider.api_key.is_none());
        assert_eq!(loaded.env, EnvOverrides::default());
        Ok(())
    }

    #[test]
    fn debug_output_masks_api_key() {
        let provider = ProviderConfig::builtin(ProviderKind::Gemini, Some("AIzaSecret".into()));
        let rendered = format!("{:?}", provider);
        assert!(!rendered.contains("AIzaSecret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn save_then_load_preserves_settings() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("config.toml");

        let missing = Config::load_from_path(&path).await?;
        assert_eq!(missing.theme, "sanctuary");

        let mut config = Config::default();
        config.theme = "light".to_string();
        config.provider.api_key = Some("k-123".to_string());
        config.save(Some(&path)).await?;

        let loaded = Config::load_from_path(&path).await?;
        assert_eq!(loaded.theme, "light");
        assert_eq!(loaded.provider.api_key.as_deref(), Some("k-123"));
        assert_eq!(loaded.provider.kind, ProviderKind::Gemini);
        Ok(())
    }
}
