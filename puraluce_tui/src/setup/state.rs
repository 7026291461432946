use anyhow::Result;
use puraluce_core::{Config, ProviderConfig, ProviderKind};
use std::path::Path;

use crate::theme::Theme;

#[derive(Debug, Clone, PartialEq)]
pub enum SetupState {
    Welcome,
    ProviderSelection,
    ApiKeyEntry,
    ModelEntry,
    Confirm,
    Error(String),
}

pub struct SetupApp {
    pub state: SetupState,
    pub selected_provider_idx: usize,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub config: Config,
    pub theme: Theme,
    pub dirty: bool,
}

impl SetupApp {
    pub fn new(config: Config, show_welcome: bool) -> Self {
        let provider = config.provider.clone();
        let selected_provider_idx = ProviderKind::ALL
            .iter()
            .position(|kind| *kind == provider.kind)
            .unwrap_or(0);

        Self {
            state: if show_welcome {
                SetupState::Welcome
            } else {
                SetupState::ProviderSelection
            },
            selected_provider_idx,
            api_key: provider.api_key.unwrap_or_default(),
            model: provider.model,
            base_url: provider.base_url,
            theme: Theme::from_config(&config.theme),
            config,
            dirty: true,
        }
    }

    pub fn selected_kind(&self) -> ProviderKind {
        ProviderKind::ALL[self.selected_provider_idx.min(ProviderKind::ALL.len() - 1)]
    }

    pub fn selected_requires_key(&self) -> bool {
        ProviderConfig::builtin(self.selected_kind(), None).requires_api_key()
    }

    pub fn select_previous(&mut self) {
        self.selected_provider_idx = self.selected_provider_idx.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        self.selected_provider_idx =
            (self.selected_provider_idx + 1).min(ProviderKind::ALL.len() - 1);
    }

    /// Leaves provider selection. Switching kind drops the previous
    /// endpoint and model so the new kind's defaults apply.
    pub fn confirm_provider(&mut self) {
        let kind = self.selected_kind();
        if kind != self.config.provider.kind {
            self.base_url.clear();
            self.model = kind.default_model().to_string();
        }
        if self.model.trim().is_empty() {
            self.model = kind.default_model().to_string();
        }
        self.state = if self.selected_requires_key() {
            SetupState::ApiKeyEntry
        } else {
            SetupState::ModelEntry
        };
    }

    /// Whether the environment already supplies a key for the selected kind.
    pub fn env_key_available(&self) -> bool {
        self.config.env.api_key_for(self.selected_kind()).is_some()
    }

    /// A blank key is accepted when the environment provides one; it is then
    /// left out of the saved file.
    pub fn confirm_api_key(&mut self) {
        self.state = if self.api_key.trim().is_empty() && !self.env_key_available() {
            SetupState::Error(format!(
                "{} requires an API key.",
                self.selected_kind().display_name()
            ))
        } else {
            SetupState::ModelEntry
        };
    }

    pub fn confirm_model(&mut self) {
        if self.model.trim().is_empty() {
            self.model = self.selected_kind().default_model().to_string();
        }
        // Custom endpoints have no default model.
        self.state = if self.model.trim().is_empty() {
            SetupState::Error("A model name is required.".to_string())
        } else {
            SetupState::Confirm
        };
    }

    /// One step back; `false` means Esc should abort the wizard.
    pub fn back(&mut self) -> bool {
        self.state = match self.state {
            SetupState::Welcome | SetupState::ProviderSelection => return false,
            SetupState::ApiKeyEntry | SetupState::Error(_) => SetupState::ProviderSelection,
            SetupState::ModelEntry => {
                if self.selected_requires_key() {
                    SetupState::ApiKeyEntry
                } else {
                    SetupState::ProviderSelection
                }
            }
            SetupState::Confirm => SetupState::ModelEntry,
        };
        true
    }

    /// Field being typed into on the current screen.
    pub fn active_input_mut(&mut self) -> Option<&mut String> {
        match self.state {
            SetupState::ApiKeyEntry => Some(&mut self.api_key),
            SetupState::ModelEntry => Some(&mut self.model),
            _ => None,
        }
    }

    pub fn to_config(&self) -> Config {
        let kind = self.selected_kind();
        let api_key = if self.selected_requires_key() {
            Some(self.api_key.trim().to_string()).filter(|key| !key.is_empty())
        } else {
            None
        };

        let mut config = self.config.clone();
        config.provider = ProviderConfig {
            kind,
            api_key,
            base_url: self.base_url.trim().to_string(),
            auth: None,
            model: self.model.trim().to_string(),
        }
        .normalized();
        config
    }

    pub async fn save(&mut self, path: Option<&Path>) -> Result<Config> {
        let config = self.to_config();
        config.save(path).await?;
        self.config = config.clone();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_flow_requires_key_before_model() {
        let mut app = SetupApp::new(Config::default(), true);
        assert_eq!(app.state, SetupState::Welcome);
        assert_eq!(app.selected_kind(), ProviderKind::Gemini);

        app.confirm_provider();
        assert_eq!(app.state, SetupState::ApiKeyEntry);

        app.confirm_api_key();
        assert!(matches!(app.state, SetupState::Error(_)));
        assert!(app.back());
        assert_eq!(app.state, SetupState::ProviderSelection);

        app.confirm_provider();
        app.api_key = "  AIzaTestKey  ".to_string();
        app.confirm_api_key();
        assert_eq!(app.state, SetupState::ModelEntry);

        app.confirm_model();
        assert_eq!(app.state, SetupState::Confirm);

        let config = app.to_config();
        assert_eq!(config.provider.api_key.as_deref(), Some("AIzaTestKey"));
        assert_eq!(config.provider.model, "gemini-3-flash-preview");
        assert!(config.has_credentials());
    }

    #[test]
    fn keyless_provider_skips_key_screen() {
        let mut app = SetupApp::new(Config::default(), false);
        app.api_key = "stale".to_string();
        app.selected_provider_idx = ProviderKind::ALL
            .iter()
            .position(|k| *k == ProviderKind::Ollama)
            .unwrap();

        app.confirm_provider();
        assert_eq!(app.state, SetupState::ModelEntry);
        assert_eq!(app.model, ProviderKind::Ollama.default_model());

        let config = app.to_config();
        assert!(config.provider.api_key.is_none());
        assert_eq!(config.provider.base_url, ProviderKind::Ollama.default_base_url());
    }

    #[test]
    fn blank_model_falls_back_to_default() {
        let mut app = SetupApp::new(Config::default(), false);
        app.model = "   ".to_string();
        app.state = SetupState::ModelEntry;
        app.confirm_model();
        assert_eq!(app.model, ProviderKind::Gemini.default_model());
    }

    #[test]
    fn esc_on_first_screens_aborts() {
        let mut app = SetupApp::new(Config::default(), true);
        assert!(!app.back());
        app.state = SetupState::Confirm;
        assert!(app.back());
        assert_eq!(app.state, SetupState::ModelEntry);
    }

    #[tokio::test]
    async fn env_key_is_used_but_never_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.apply_overrides(|name| {
            (name == "GEMINI_API_KEY").then(|| "AIzaFromEnv".to_string())
        });
        let mut app = SetupApp::new(config, false);
        assert!(app.api_key.is_empty());

        app.confirm_provider();
        app.confirm_api_key();
        assert_eq!(app.state, SetupState::ModelEntry);
        app.confirm_model();
        let saved = app.save(Some(&path)).await.unwrap();
        assert!(saved.has_credentials());

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(!written.contains("AIzaFromEnv"));
    }

    #[tokio::test]
    async fn save_writes_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut app = SetupApp::new(Config::default(), false);
        app.api_key = "AIzaSaved".to_string();
        app.confirm_provider();
        app.confirm_api_key();
        app.confirm_model();
        let saved = app.save(Some(&path)).await.unwrap();

        let loaded = Config::load_from_path(&path).await.unwrap();
        assert_eq!(loaded.provider.api_key, saved.provider.api_key);
        assert_eq!(loaded.provider.model, saved.provider.model);
    }
}
