//! Conversation chain: a chat model paired with a bounded memory.

use std::sync::Arc;

use ragdemo_common::Result;
use tracing::{debug, instrument};

use crate::client::{ChatMessage, LlmClient, LlmRequest};
use crate::memory::ChatMemory;

pub struct ConversationalChain {
    llm: Arc<dyn LlmClient>,
    memory: ChatMemory,
}

impl ConversationalChain {
    pub fn new(llm: Arc<dyn LlmClient>, memory: ChatMemory) -> Self {
        Self { llm, memory }
    }

    /// Sends `user_message` along with the remembered turns and records the reply.
    #[instrument(skip(self, user_message), fields(model = %self.llm.model_name()))]
    pub async fn execute(&mut self, user_message: &str) -> Result<String> {
        self.memory.add(ChatMessage::user(user_message));

        let request = LlmRequest {
            system_prompt: self.memory.system_message().map(str::to_string),
            messages: self.memory.turns().cloned().collect(),
            ..Default::default()
        };
        debug!(history = request.messages.len(), "Executing conversation turn");

        let response = self.llm.complete(request).await?;
        self.memory.add(ChatMessage::assistant(response.content.clone()));
        Ok(response.content)
    }

    pub fn memory(&self) -> &ChatMemory {
        &self.memory
    }
}
