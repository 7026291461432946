use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::prompt::{GenerationRequest, PROMPT_VERSION};

/// The single failure shape surfaced to the controller. Transport errors,
/// upstream API errors and empty responses all collapse into a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GenerationFailure {
    message: String,
}

impl GenerationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn empty_response() -> Self {
        Self::new("Il modello non ha restituito alcun testo.")
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<reqwest::Error> for GenerationFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(format!("timeout: {}", err))
        } else {
            Self::new(err.to_string())
        }
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationFailure>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult {
    Success(String),
    Failure(String),
}

impl GenerationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Success(_))
    }

    pub fn into_markdown(self) -> String {
        match self {
            GenerationResult::Success(text) => text,
            GenerationResult::Failure(message) => failure_markdown(&message),
        }
    }
}

pub fn failure_markdown(message: &str) -> String {
    format!(
        "# Errore nel Santuario\n\nLe voci sono confuse. Riprova più tardi.\n\n*{}*",
        message.trim()
    )
}

/// Performs exactly one generation call and folds the outcome into a
/// `GenerationResult`. Never returns early without calling the generator.
pub async fn run_generation(
    generator: &dyn TextGenerator,
    request: &GenerationRequest,
) -> GenerationResult {
    info!(
        model = %request.model,
        prompt_version = PROMPT_VERSION,
        user_chars = request.user_message.chars().count(),
        "generation started"
    );

    match generator.generate(request).await {
        Ok(text) if !text.trim().is_empty() => {
            info!(chars = text.chars().count(), "generation succeeded");
            GenerationResult::Success(text)
        }
        Ok(_) => {
            let failure = GenerationFailure::empty_response();
            warn!(error = %failure, "generation returned empty text");
            GenerationResult::Failure(failure.message().to_string())
        }
        Err(failure) => {
            warn!(error = %failure, "generation failed");
            GenerationResult::Failure(failure.message().to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::FormInput;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedGenerator {
        reply: Result<String, GenerationFailure>,
        calls: AtomicUsize,
    }

    impl ScriptedGenerator {
        fn new(reply: Result<String, GenerationFailure>) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> Result<String, GenerationFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new(
            "gemini-3-flash-preview",
            &FormInput {
                need: "Paura del futuro".to_string(),
                guide: String::new(),
            },
        )
    }

    #[tokio::test]
    async fn success_passes_markdown_through_untouched() {
        let generator = ScriptedGenerator::new(Ok("# Titolo\n\nTesto".to_string()));
        let result = run_generation(&generator, &request()).await;
        assert_eq!(result, GenerationResult::Success("# Titolo\n\nTesto".to_string()));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_message_survives_into_markdown() {
        let generator = ScriptedGenerator::new(Err(GenerationFailure::new("timeout")));
        let result = run_generation(&generator, &request()).await;
        assert!(!result.is_success());
        let markdown = result.into_markdown();
        assert!(markdown.starts_with("# Errore nel Santuario"));
        assert!(markdown.contains("*timeout*"));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blank_text_is_treated_as_failure() {
        let generator = ScriptedGenerator::new(Ok("  \n ".to_string()));
        let result = run_generation(&generator, &request()).await;
        assert_eq!(
            result,
            GenerationResult::Failure(GenerationFailure::empty_response().message().to_string())
        );
    }
}
