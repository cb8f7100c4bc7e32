//! Completion provider abstraction.
//!
//! The chat loop only talks to [`CompletionProvider`]. [`OpenAiProvider`] is the
//! production implementation against any OpenAI-compatible `/chat/completions`
//! endpoint; [`MockProvider`] replays scripted replies for tests.

mod error;
mod mock;
mod openai;
mod traits;
mod types;

pub use error::{ProviderError, ProviderResult};
pub use mock::{MockProvider, MockReply, Phase, RecordedRequest};
pub use openai::OpenAiProvider;
pub use traits::CompletionProvider;
pub use types::{ChatMessage, Role, ToolCall, ToolDefinition};
