mod client;
mod types;

pub use client::OpenAiClient;
pub use types::{ChatMessage, ChatRequest, ChatResponse, Choice, ChoiceMessage, ResponseFormat};
