//! Bounded chat memory for a single conversation.

use std::collections::VecDeque;

use tracing::debug;

use crate::client::{ChatMessage, Role};

/// Keeps the most recent `max_messages` messages of a conversation.
///
/// A system message is held apart from the window: adding another one
/// replaces it, and it is never evicted. It still counts toward the limit.
#[derive(Debug, Clone)]
pub struct ChatMemory {
    max_messages: usize,
    system: Option<ChatMessage>,
    messages: VecDeque<ChatMessage>,
}

impl ChatMemory {
    pub fn with_max_messages(max_messages: usize) -> Self {
        Self {
            max_messages: max_messages.max(1),
            system: None,
            messages: VecDeque::new(),
        }
    }

    pub fn add(&mut self, message: ChatMessage) {
        if message.role == Role::System {
            self.system = Some(message);
        } else {
            self.messages.push_back(message);
        }

        while self.len() > self.max_messages {
            match self.messages.pop_front() {
                Some(evicted) => debug!(role = ?evicted.role, "Evicted from chat memory"),
                None => break,
            }
        }
    }

    /// System message (if any) followed by the retained turns, oldest first.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.system
            .iter()
            .cloned()
            .chain(self.messages.iter().cloned())
            .collect()
    }

    /// Retained non-system turns, oldest first.
    pub fn turns(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn system_message(&self) -> Option<&str> {
        self.system.as_ref().map(|m| m.content.as_str())
    }

    pub fn len(&self) -> usize {
        self.messages.len() + usize::from(self.system.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    pub fn clear(&mut self) {
        self.system = None;
        self.messages.clear();
    }
}
