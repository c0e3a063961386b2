//! Level-2 warning generation via an OpenAI-compatible chat completions endpoint.
//!
//! API key: `ROOMGUARD_LLM_API_KEY` or `OPENROUTER_API_KEY` in `.env`.
//! Callers substitute `escalation.fallback_warning` when this returns an error.

use crate::config::ResponderConfig;
use crate::error::{GuardError, GuardResult};
use crate::ports::Responder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

const NO_RESPONSE: &str = "no response";

const SYSTEM_PROMPT: &str = "You are the voice of a home security guard agent. \
    You speak directly to a person the camera does not recognize. \
    Reply with one or two short spoken sentences: firm, calm, no markdown, no lists.";

/// What the unrecognized subject said when challenged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntruderExchange {
    Said(String),
    NoResponse,
}

impl IntruderExchange {
    pub fn from_transcript(heard: Option<String>) -> Self {
        match heard {
            Some(t) if !t.trim().is_empty() => IntruderExchange::Said(t.trim().to_string()),
            _ => IntruderExchange::NoResponse,
        }
    }
}

impl fmt::Display for IntruderExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntruderExchange::Said(s) => f.write_str(s),
            IntruderExchange::NoResponse => f.write_str(NO_RESPONSE),
        }
    }
}

/// Prompt for the level-2 warning, built from the level-1 exchange.
pub fn warning_prompt(exchange: &IntruderExchange) -> String {
    format!(
        "An unrecognized person is in the room I am guarding. \
         I asked them who they are and why they are here. Their answer: \"{}\". \
         They are still not recognized. Warn them to leave immediately and say that \
         the authorities will be contacted if they stay.",
        exchange
    )
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

/// Blocking chat-completions responder (OpenRouter by default).
pub struct OpenRouterResponder {
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::blocking::Client,
}

impl OpenRouterResponder {
    /// Build from config; the key comes from the environment.
    pub fn from_config(cfg: &ResponderConfig) -> GuardResult<Self> {
        let api_key = cfg
            .api_key()
            .ok_or_else(|| GuardError::Config("responder requires ROOMGUARD_LLM_API_KEY or OPENROUTER_API_KEY".to_string()))?;
        Self::new(cfg, api_key)
    }

    pub fn new(cfg: &ResponderConfig, api_key: impl Into<String>) -> GuardResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| GuardError::Responder(e.to_string()))?;
        Ok(Self {
            api_url: cfg.api_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
            client,
        })
    }
}

impl Responder for OpenRouterResponder {
    fn respond(&self, prompt: &str) -> GuardResult<String> {
        let url = format!("{}/chat/completions", self.api_url);
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
        };

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("X-Title", "roomguard")
            .json(&body)
            .send()
            .map_err(|e| GuardError::Responder(format!("request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(GuardError::Responder(format!("API error {}: {}", status, body)));
        }

        let parsed: ChatResponse = res
            .json()
            .map_err(|e| GuardError::Responder(format!("response parse failed: {}", e)))?;

        let text = parsed
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(GuardError::Responder("empty completion".to_string()));
        }
        debug!(chars = text.len(), "warning generated");
        Ok(text)
    }
}
