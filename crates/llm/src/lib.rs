pub mod client;
pub mod config;
pub mod conversation;
pub mod memory;
pub mod openai;

pub use client::{ChatMessage, LlmClient, LlmRequest, LlmResponse, Role, TokenUsage};
pub use config::{LlmConfig, build_llm_client};
pub use conversation::ConversationalChain;
pub use memory::ChatMemory;
pub use openai::OpenAiClient;
