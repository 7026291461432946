pub use config::{Config, EnvOverrides, ProviderAuth, ProviderConfig, ProviderKind};
pub use controller::{Controller, FormInput, Resolution, ViewState};
pub use generation::{failure_markdown, run_generation, GenerationFailure, GenerationResult, TextGenerator};
pub use llm::LlmClient;
pub use prompt::{GenerationRequest, GENERATION_TEMPERATURE, PROMPT_VERSION};
pub use redaction::redact_sensitive_text;

pub mod config;
pub mod controller;
pub mod generation;
pub mod llm;
pub mod prompt;
pub mod redaction;
