//! Wizzybot - shopping assistant service
//!
//! This library exposes the core components for the chat service: the
//! two-phase tool-calling loop, the tool registry with its product search and
//! currency conversion tools, and the completion provider abstraction.

pub mod catalog;
pub mod chat;
pub mod config;
pub mod error;
pub mod handlers;
pub mod provider;
pub mod state;
pub mod tools;

// Re-export key types for convenience
pub use catalog::{Catalog, Product};
pub use chat::{ChatService, FALLBACK_ANSWER};
pub use config::Config;
pub use error::{AppError, Result};
pub use handlers::{chat_handler, health_handler, ready_handler};
pub use provider::{CompletionProvider, MockProvider, OpenAiProvider};
pub use state::AppState;
pub use tools::{ToolKind, ToolRegistry};
