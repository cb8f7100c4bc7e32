//! Query orchestration.

pub mod service;

pub use service::{ChatService, FALLBACK_ANSWER};
