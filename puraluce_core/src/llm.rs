use crate::config::{Config, ProviderAuth, ProviderConfig, ProviderKind};
use crate::generation::{GenerationFailure, TextGenerator};
use crate::prompt::GenerationRequest;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Clone)]
pub struct LlmClient {
    http_client: Client,
    target: LlmTarget,
}

#[derive(Clone)]
struct LlmTarget {
    kind: ProviderKind,
    api_key: Option<String>,
    base_url: String,
    auth: ProviderAuth,
    model: String,
}

impl fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmClient")
            .field("provider", &self.target.kind.display_name())
            .field("base_url", &self.target.base_url)
            .field("model", &self.target.model)
            .field("auth", &self.target.auth)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChatMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

impl LlmClient {
    pub fn new(provider: ProviderConfig, timeout: Option<Duration>) -> Result<Self> {
        let provider = provider.normalized();
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            target: LlmTarget {
                kind: provider.kind,
                auth: provider.effective_auth(),
                api_key: provider.api_key,
                base_url: provider.base_url,
                model: provider.model,
            },
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.effective_provider(), config.request_timeout())
    }

    pub fn model(&self) -> &str {
        &self.target.model
    }

    pub fn provider_name(&self) -> &'static str {
        self.target.kind.display_name()
    }

    async fn execute_gemini(&self, request: &GenerationRequest) -> Result<String, GenerationFailure> {
        let url = gemini_url(&self.target.base_url, &request.model);
        let body = gemini_body(request);

        let builder = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json");
        let builder = apply_auth_header(builder, &self.target)?;
        let response = builder.json(&body).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(api_error(status, &text));
        }

        extract_gemini_text(&text)
    }

    async fn execute_openai(&self, request: &GenerationRequest) -> Result<String, GenerationFailure> {
        let url = format!("{}/chat/completions", self.target.base_url);
        let body = openai_body(request);

        let builder = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json");
        let builder = apply_auth_header(builder, &self.target)?;
        let response = builder.json(&body).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(api_error(status, &text));
        }

        extract_openai_text(&text)
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationFailure> {
        match self.target.kind {
            ProviderKind::Gemini => self.execute_gemini(request).await,
            ProviderKind::OpenAI | ProviderKind::Ollama | ProviderKind::Custom => {
                self.execute_openai(request).await
            }
        }
    }
}

fn gemini_url(base_url: &str, model: &str) -> String {
    let model = model.strip_prefix("models/").unwrap_or(model);
    format!("{}/models/{}:generateContent", base_url, model)
}

fn gemini_body(request: &GenerationRequest) -> GeminiRequest {
    GeminiRequest {
        system_instruction: GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: request.system_instruction.clone(),
            }],
        },
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts: vec![GeminiPart {
                text: request.user_message.clone(),
            }],
        }],
        generation_config: GeminiGenerationConfig {
            temperature: request.temperature,
        },
    }
}

fn openai_body(request: &GenerationRequest) -> ChatRequest {
    ChatRequest {
        model: request.model.clone(),
        messages: vec![
            ChatMessage {
                role: "system".to_string(),
                content: request.system_instruction.clone(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: request.user_message.clone(),
            },
        ],
        temperature: request.temperature,
    }
}

fn api_error(status: reqwest::StatusCode, body: &str) -> GenerationFailure {
    let lower = body.to_lowercase();
    let hint = if status.as_u16() == 429 || lower.contains("rate limit") || lower.contains("quota")
    {
        " (quota/rate-limit)"
    } else if status.as_u16() == 401 || status.as_u16() == 403 {
        " (check the API key)"
    } else {
        ""
    };
    GenerationFailure::new(format!(
        "LLM API Error (Status {}): {}{}",
        status,
        truncate_error(body),
        hint
    ))
}

fn extract_gemini_text(raw: &str) -> Result<String, GenerationFailure> {
    let parsed: GeminiResponse = serde_json::from_str(raw).map_err(|e| {
        GenerationFailure::new(format!(
            "Failed to parse LLM response: {} | Raw response: {}",
            e,
            truncate_error(raw)
        ))
    })?;

    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(GenerationFailure::new(format!(
            "Request blocked by provider safety filter ({})",
            reason
        )));
    }

    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| GenerationFailure::new("No candidates returned from LLM"))?;

    let chunks: Vec<String> = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|part| !part.thought)
        .filter_map(|part| part.text)
        .collect();
    let content = chunks.concat();

    if content.trim().is_empty() {
        return Err(match candidate.finish_reason {
            Some(reason) => GenerationFailure::new(format!(
                "LLM stopped without text. Reason: {}",
                reason
            )),
            None => GenerationFailure::empty_response(),
        });
    }

    Ok(content)
}

fn extract_openai_text(raw: &str) -> Result<String, GenerationFailure> {
    let parsed: ChatResponse = serde_json::from_str(raw).map_err(|e| {
        GenerationFailure::new(format!(
            "Failed to parse LLM response: {} | Raw response: {}",
            e,
            truncate_error(raw)
        ))
    })?;

    let first_choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GenerationFailure::new("No choices returned from LLM"))?;

    match first_choice.message {
        Some(msg) if !msg.content.trim().is_empty() => Ok(msg.content),
        _ => match first_choice.finish_reason {
            Some(reason) if reason.to_lowercase().contains("content_filter") => Err(
                GenerationFailure::new("content filter triggered by current provider/model"),
            ),
            Some(reason) => Err(GenerationFailure::new(format!(
                "LLM stopped without text. Reason: {}",
                reason
            ))),
            None => Err(GenerationFailure::empty_response()),
        },
    }
}

fn apply_auth_header(
    request: reqwest::RequestBuilder,
    target: &LlmTarget,
) -> Result<reqwest::RequestBuilder, GenerationFailure> {
    let key = || {
        target.api_key.as_ref().ok_or_else(|| {
            GenerationFailure::new(format!(
                "Missing API key for provider {}",
                target.kind.display_name()
            ))
        })
    };

    match target.auth {
        ProviderAuth::None => Ok(request),
        ProviderAuth::Bearer => Ok(request.header("Authorization", format!("Bearer {}", key()?))),
        ProviderAuth::GoogApiKey => Ok(request.header("x-goog-api-key", key()?)),
    }
}

fn truncate_error(text: &str) -> String {
    const MAX: usize = 320;
    if text.chars().count() > MAX {
        let head: String = text.chars().take(MAX).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
