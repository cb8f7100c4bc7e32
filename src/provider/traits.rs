//! Provider trait definition

use async_trait::async_trait;

use super::error::ProviderResult;
use super::types::{ChatMessage, ToolDefinition};

/// A hosted model that can answer a conversation, optionally asking for tools.
///
/// The chat loop issues at most two requests per query: one
/// [`propose_with_tools`](Self::propose_with_tools) and, if tools were
/// requested, one [`finalize`](Self::finalize).
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name used in logs and errors (e.g. "openai").
    fn name(&self) -> &str;

    /// Phase 1: send the conversation with the full tool set and automatic
    /// tool choice. The returned assistant message may carry tool calls.
    async fn propose_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> ProviderResult<ChatMessage>;

    /// Phase 2: send the conversation including tool results, without tools.
    async fn finalize(&self, messages: &[ChatMessage]) -> ProviderResult<ChatMessage>;
}
