//! Groq chat completion client (OpenAI-compatible API).

use super::{map_http_error, GenerationGateway, GROQ};
use crate::config::GenerationConfig;
use crate::error::GatewayError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Sampling options
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self::from(&GenerationConfig::default())
    }
}

impl From<&GenerationConfig> for CompletionOptions {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

pub struct GroqClient {
    client: Client,
    url: String,
    api_key: String,
}

impl GroqClient {
    pub fn new(client: Client, url: String, api_key: String) -> Self {
        Self {
            client,
            url,
            api_key,
        }
    }
}

#[async_trait]
impl GenerationGateway for GroqClient {
    async fn chat_completion(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<String, GatewayError> {
        let request = ChatCompletionRequest {
            model,
            messages: &messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            top_p: options.top_p,
        };

        debug!(model, messages = messages.len(), "Calling Groq API");
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_http_error(GROQ, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.error)
                .and_then(|detail| detail.message)
                .unwrap_or_else(|| "Unknown error".to_string());
            error!(status = status.as_u16(), error = %message, "Groq API error");
            return Err(GatewayError::Upstream {
                service: GROQ,
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionResponse =
            response.json().await.map_err(|e| GatewayError::Decode {
                service: GROQ,
                message: e.to_string(),
            })?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::Decode {
                service: GROQ,
                message: "No choices in response".to_string(),
            })?;

        debug!("Groq API response received");
        Ok(choice.message.content.unwrap_or_default())
    }
}
