//! The two-phase tool-calling loop.

use crate::provider::{ChatMessage, CompletionProvider, ProviderResult, ToolCall};
use crate::tools::ToolRegistry;
use futures::future::join_all;
use std::sync::Arc;

/// Returned whenever the model's answer is empty.
pub const FALLBACK_ANSWER: &str = "I couldn't find any relevant information.";

/// Answers free-text queries, letting the model call local tools once.
///
/// Each call to [`answer`](Self::answer) is independent; no conversation state
/// is kept between queries.
pub struct ChatService {
    provider: Arc<dyn CompletionProvider>,
    registry: Arc<ToolRegistry>,
}

impl ChatService {
    pub fn new(provider: Arc<dyn CompletionProvider>, registry: Arc<ToolRegistry>) -> Self {
        Self { provider, registry }
    }

    /// Answer `query`.
    ///
    /// # Flow
    /// 1. Phase 1: user message + every tool definition, tool choice automatic
    /// 2. No tool calls: return the reply directly
    /// 3. Otherwise run every requested tool; failures become result payloads
    /// 4. Phase 2: user message, phase-1 assistant message, one tool message per
    ///    call in call order, no tools attached
    /// 5. Return the phase-2 reply
    ///
    /// Only provider failures are returned as errors. Tools run for a single
    /// round; tool calls in the phase-2 reply are not executed.
    pub async fn answer(&self, query: &str) -> ProviderResult<String> {
        let user = ChatMessage::user(query);

        let proposal = self
            .provider
            .propose_with_tools(std::slice::from_ref(&user), self.registry.definitions())
            .await?;

        if proposal.tool_calls.is_empty() {
            tracing::debug!(provider = self.provider.name(), "Answered without tools");
            return Ok(answer_text(&proposal));
        }

        tracing::debug!(
            provider = self.provider.name(),
            tool_calls = proposal.tool_calls.len(),
            "Model requested tools"
        );

        let results = self.run_tool_calls(&proposal.tool_calls).await;

        let mut messages = Vec::with_capacity(2 + results.len());
        messages.push(user);
        messages.push(proposal);
        messages.extend(results);

        let reply = self.provider.finalize(&messages).await?;
        if !reply.tool_calls.is_empty() {
            tracing::warn!(
                tool_calls = reply.tool_calls.len(),
                "Ignoring tool calls in final reply"
            );
        }

        Ok(answer_text(&reply))
    }

    /// Run `calls` concurrently; one tool message per call, in call order.
    async fn run_tool_calls(&self, calls: &[ToolCall]) -> Vec<ChatMessage> {
        let pending = calls.iter().map(|call| async move {
            let payload = self.registry.dispatch(call).await;
            ChatMessage::tool_result(call.id.clone(), payload)
        });

        // join_all yields outputs in input order regardless of completion order
        join_all(pending).await
    }
}

fn answer_text(message: &ChatMessage) -> String {
    message.text().unwrap_or(FALLBACK_ANSWER).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::provider::{MockProvider, MockReply, Phase, Role};
    use crate::tools::{CurrencyConverter, FixedRates, ProductSearch};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn catalog_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "displayTitle,embeddingText,url,imageUrl,productType,discount,price,variants,createDate"
        )
        .unwrap();
        writeln!(file, "Smart Phone,Android phone,u1,i1,1,0,$300.00 USD,Black,2023-01-01").unwrap();
        file.flush().unwrap();
        file
    }

    fn service(provider: Arc<MockProvider>, catalog: &NamedTempFile) -> ChatService {
        let registry = ToolRegistry::new(
            ProductSearch::new(Arc::new(Catalog::new(catalog.path(), true))),
            CurrencyConverter::new(Arc::new(FixedRates::default())),
        )
        .unwrap();
        ChatService::new(provider, Arc::new(registry))
    }

    #[tokio::test]
    async fn test_direct_answer_skips_phase_two() {
        let file = catalog_file();
        let provider = Arc::new(MockProvider::answering("Hello! How can I help?"));
        let chat = service(Arc::clone(&provider), &file);

        let answer = chat.answer("hi").await.unwrap();

        assert_eq!(answer, "Hello! How can I help?");
        let requests = provider.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].phase, Phase::Propose);
        assert_eq!(requests[0].tool_names, vec!["searchProducts", "convertCurrencies"]);
        assert_eq!(requests[0].messages, vec![ChatMessage::user("hi")]);
    }

    #[tokio::test]
    async fn test_empty_direct_answer_uses_fallback() {
        let file = catalog_file();
        let provider = Arc::new(MockProvider::answering(""));
        let chat = service(provider, &file);

        assert_eq!(chat.answer("hi").await.unwrap(), FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn test_empty_final_answer_uses_fallback() {
        let file = catalog_file();
        let provider = Arc::new(MockProvider::calling_tools(
            vec![ToolCall::new("call_1", "searchProducts", r#"{"query":"phone"}"#)],
            "",
        ));
        let chat = service(provider, &file);

        assert_eq!(chat.answer("phone").await.unwrap(), FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn test_whitespace_answer_is_returned_as_is() {
        let file = catalog_file();
        let provider = Arc::new(MockProvider::answering("  "));
        let chat = service(provider, &file);

        assert_eq!(chat.answer("hi").await.unwrap(), "  ");
    }

    #[tokio::test]
    async fn test_phase_two_conversation_layout() {
        let file = catalog_file();
        let calls = vec![
            ToolCall::new("call_a", "convertCurrencies", r#"{"amount":100,"from":"USD","to":"EUR"}"#),
            ToolCall::new("call_b", "searchProducts", r#"{"query":"phone"}"#),
            ToolCall::new("call_c", "doSomething", "{}"),
        ];
        let provider = Arc::new(MockProvider::calling_tools(calls.clone(), "Done."));
        let chat = service(Arc::clone(&provider), &file);

        let answer = chat.answer("convert and search").await.unwrap();
        assert_eq!(answer, "Done.");

        let requests = provider.requests().await;
        assert_eq!(requests.len(), 2);
        let finalize = &requests[1];
        assert_eq!(finalize.phase, Phase::Finalize);
        assert!(finalize.tool_names.is_empty());

        let messages = &finalize.messages;
        assert_eq!(messages.len(), 2 + calls.len());
        assert_eq!(messages[0], ChatMessage::user("convert and search"));
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].tool_calls, calls);

        let result_ids: Vec<&str> = messages[2..]
            .iter()
            .map(|m| m.tool_call_id.as_deref().unwrap())
            .collect();
        assert_eq!(result_ids, vec!["call_a", "call_b", "call_c"]);
        assert!(messages[2..].iter().all(|m| m.role == Role::Tool));

        let conversion: serde_json::Value =
            serde_json::from_str(messages[2].content.as_deref().unwrap()).unwrap();
        assert_eq!(conversion["result"], 85.0);
        assert!(messages[4]
            .content
            .as_deref()
            .unwrap()
            .contains("Function doSomething not implemented."));
    }

    #[tokio::test]
    async fn test_result_count_matches_call_count() {
        let file = catalog_file();
        for n in [1usize, 2, 5, 8] {
            let calls: Vec<ToolCall> = (0..n)
                .map(|i| {
                    let name = if i % 2 == 0 { "searchProducts" } else { "bogus" };
                    ToolCall::new(format!("call_{}", i), name, r#"{"query":"phone"}"#)
                })
                .collect();
            let provider = Arc::new(MockProvider::calling_tools(calls.clone(), "ok"));
            let chat = service(Arc::clone(&provider), &file);

            chat.answer("q").await.unwrap();

            let requests = provider.requests().await;
            let results = &requests[1].messages[2..];
            assert_eq!(results.len(), n);
            for (result, call) in results.iter().zip(&calls) {
                assert_eq!(result.tool_call_id.as_deref(), Some(call.id.as_str()));
            }
        }
    }

    #[tokio::test]
    async fn test_phase_one_failure_propagates() {
        let file = catalog_file();
        let provider = Arc::new(MockProvider::failing("quota exceeded"));
        let chat = service(provider, &file);

        let err = chat.answer("hi").await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_phase_two_failure_propagates() {
        let file = catalog_file();
        let provider = Arc::new(MockProvider::new(
            MockReply::ToolCalls(vec![ToolCall::new("call_1", "searchProducts", r#"{"query":"x"}"#)]),
            MockReply::Fail("timeout".to_string()),
        ));
        let chat = service(provider, &file);

        assert!(chat.answer("x").await.is_err());
    }
}
