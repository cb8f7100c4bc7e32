//! OpenAI-compatible `/chat/completions` provider.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{ProviderError, ProviderResult};
use super::traits::CompletionProvider;
use super::types::{ChatMessage, Role, ToolCall, ToolDefinition};
use crate::config::CompletionConfig;

const PROVIDER_NAME: &str = "openai";

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(config: &CompletionConfig) -> ProviderResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        tracing::info!(
            api_base = %config.api_base,
            model = %config.model,
            "Completion provider configured"
        );

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> ProviderResult<ChatMessage> {
        let url = format!("{}/chat/completions", self.api_base);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(ProviderError::rate_limited(PROVIDER_NAME, body));
            }
            return Err(ProviderError::api(PROVIDER_NAME, status.as_u16(), body));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(PROVIDER_NAME, e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.into())
            .ok_or_else(|| ProviderError::invalid_response(PROVIDER_NAME, "response has no choices"))
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn propose_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> ProviderResult<ChatMessage> {
        let request = CompletionRequest::new(&self.model, messages).with_tools(tools);
        self.complete(&request).await
    }

    async fn finalize(&self, messages: &[ChatMessage]) -> ProviderResult<ChatMessage> {
        let request = CompletionRequest::new(&self.model, messages);
        self.complete(&request).await
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

impl<'a> CompletionRequest<'a> {
    fn new(model: &'a str, messages: &[ChatMessage]) -> Self {
        Self {
            model,
            messages: messages.iter().map(WireMessage::from).collect(),
            tools: None,
            tool_choice: None,
        }
    }

    fn with_tools(mut self, tools: &'a [ToolDefinition]) -> Self {
        self.tools = Some(tools.iter().map(WireTool::from).collect());
        self.tool_choice = Some("auto");
        self
    }
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

impl<'a> From<&'a ToolDefinition> for WireTool<'a> {
    fn from(tool: &'a ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: WireFunction {
                name: &tool.name,
                description: &tool.description,
                parameters: &tool.parameters,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

fn function_kind() -> String {
    "function".to_string()
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
            tool_calls: message
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    kind: function_kind(),
                    function: WireFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect(),
            tool_call_id: message.tool_call_id.clone(),
        }
    }
}

impl From<WireMessage> for ChatMessage {
    fn from(message: WireMessage) -> Self {
        let role = match message.role.as_str() {
            "user" => Role::User,
            "tool" => Role::Tool,
            _ => Role::Assistant,
        };

        Self {
            role,
            content: message.content,
            tool_calls: message
                .tool_calls
                .into_iter()
                // Only function tools exist in this protocol version.
                .filter(|call| call.kind == "function")
                .map(|call| ToolCall::new(call.id, call.function.name, call.function.arguments))
                .collect(),
            tool_call_id: message.tool_call_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}
