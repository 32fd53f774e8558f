//! OpenRouter chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, LlmClient, Role};

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for the OpenRouter chat-completions API.
pub struct OpenRouterClient {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenRouterClient {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self { client, api_key }
    }
}

/// Flatten a conversation message for the wire. Tool results travel as user
/// text: the fence protocol keeps tool-call structure inside message content,
/// so the upstream API only ever sees system/user/assistant roles.
fn to_wire(message: &ChatMessage) -> WireMessage {
    match message.role {
        Role::System => WireMessage {
            role: "system",
            content: message.content.clone(),
        },
        Role::User => WireMessage {
            role: "user",
            content: message.content.clone(),
        },
        Role::Assistant => WireMessage {
            role: "assistant",
            content: message.content.clone(),
        },
        Role::Tool => {
            let id = message.tool_call_id.as_deref().unwrap_or("unknown");
            WireMessage {
                role: "user",
                content: format!("Tool result ({}): {}", id, message.content),
            }
        }
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> anyhow::Result<String> {
        let request = CompletionRequest {
            model: model.to_string(),
            messages: messages.iter().map(to_wire).collect(),
        };

        let response = self
            .client
            .post(OPENROUTER_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("model API error {}: {}", status, body);
        }

        let parsed: CompletionResponse = response.json().await?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| anyhow::anyhow!("model returned an empty reply"))
    }
}
