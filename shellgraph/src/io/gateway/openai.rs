use std::env;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::ModelGateway;
use crate::error::{ConfigError, GatewayError, GatewayFailure};
use crate::io::config::ModelConfig;
use crate::io::prompt::Prompt;

const SYSTEM_PROMPT: &str = "You are the planning and safety component of a command-line assistant. \
Follow the output format requested in each message exactly.";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAiGateway {
    agent: ureq::Agent,
    config: ModelConfig,
    api_key: Option<String>,
}

impl OpenAiGateway {
    /// Build a client, reading the key from `config.api_key_env`.
    ///
    /// A missing key is only a warning here; the first call fails instead.
    pub fn from_env(config: &ModelConfig) -> Self {
        let api_key = env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            warn!(var = %config.api_key_env, "API key not set; model calls will fail");
        }
        Self::new(config.clone(), api_key)
    }

    pub fn new(config: ModelConfig, api_key: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self {
            agent,
            config,
            api_key,
        }
    }
}

impl ModelGateway for OpenAiGateway {
    #[instrument(skip_all, fields(stage = %prompt.kind, model = %self.config.model))]
    fn complete(&self, prompt: &Prompt) -> Result<String> {
        let stage = prompt.kind;
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingCredential {
                var: self.config.api_key_env.clone(),
            })?;

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.text,
                },
            ],
            max_tokens: self.config.max_tokens,
        };

        debug!(prompt_bytes = prompt.text.len(), "sending completion request");
        let response = match self
            .agent
            .post(&self.config.api_url)
            .set("Authorization", &format!("Bearer {key}"))
            .send_json(&request)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let message = response
                    .into_json::<ErrorEnvelope>()
                    .map(|envelope| envelope.error.message)
                    .unwrap_or_else(|_| "no error body".to_string());
                warn!(code, %message, "completion request rejected");
                return Err(GatewayError {
                    stage,
                    failure: GatewayFailure::Status { code, message },
                }
                .into());
            }
            Err(err) => {
                warn!(err = %err, "completion request failed");
                return Err(GatewayError {
                    stage,
                    failure: GatewayFailure::Transport(err.to_string()),
                }
                .into());
            }
        };

        let parsed: ChatResponse = response
            .into_json()
            .map_err(|err| GatewayError::parse(stage, err.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GatewayError::parse(stage, "response has no message content"))?;
        debug!(reply_bytes = content.len(), "completion received");
        Ok(content)
    }
}
