//! Mock provider for testing
//!
//! Replays a scripted reply for each phase without any network access and
//! records every request it receives so tests can inspect the conversation
//! the chat loop assembled.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::error::{ProviderError, ProviderResult};
use super::traits::CompletionProvider;
use super::types::{ChatMessage, ToolCall, ToolDefinition};

/// Which half of the two-phase protocol a request belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Propose,
    Finalize,
}

/// Scripted reply for one phase.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Assistant text (may be empty to exercise the fallback answer)
    Text(String),
    /// Assistant message requesting these tool calls
    ToolCalls(Vec<ToolCall>),
    /// Simulate a provider failure
    Fail(String),
}

impl MockReply {
    fn into_message(self) -> ProviderResult<ChatMessage> {
        match self {
            MockReply::Text(text) => Ok(ChatMessage::assistant(text)),
            MockReply::ToolCalls(calls) => Ok(ChatMessage::assistant_tool_calls(calls)),
            MockReply::Fail(message) => Err(ProviderError::Other(format!("Mock error: {}", message))),
        }
    }
}

/// A request as seen by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub phase: Phase,
    pub messages: Vec<ChatMessage>,
    /// Names of the tools attached to the request (empty for phase 2)
    pub tool_names: Vec<String>,
}

pub struct MockProvider {
    proposal: MockReply,
    final_reply: MockReply,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockProvider {
    pub fn new(proposal: MockReply, final_reply: MockReply) -> Self {
        Self {
            proposal,
            final_reply,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers directly in phase 1 without requesting tools.
    pub fn answering(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(MockReply::Text(text.clone()), MockReply::Text(text))
    }

    /// Requests `calls` in phase 1, then answers with `final_text`.
    pub fn calling_tools(calls: Vec<ToolCall>, final_text: impl Into<String>) -> Self {
        Self::new(MockReply::ToolCalls(calls), MockReply::Text(final_text.into()))
    }

    /// Fails every request.
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(MockReply::Fail(message.clone()), MockReply::Fail(message))
    }

    /// Snapshot of the requests received so far, in order.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    async fn record(&self, phase: Phase, messages: &[ChatMessage], tools: &[ToolDefinition]) {
        self.requests.lock().await.push(RecordedRequest {
            phase,
            messages: messages.to_vec(),
            tool_names: tools.iter().map(|tool| tool.name.clone()).collect(),
        });
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn propose_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> ProviderResult<ChatMessage> {
        self.record(Phase::Propose, messages, tools).await;
        self.proposal.clone().into_message()
    }

    async fn finalize(&self, messages: &[ChatMessage]) -> ProviderResult<ChatMessage> {
        self.record(Phase::Finalize, messages, &[]).await;
        self.final_reply.clone().into_message()
    }
}
