//! Chat and generated-content types shared by every AI connector
// Copyright 2025 Synaptik Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use serde::{Deserialize, Serialize};

/// Role of a chat message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorRole {
    System,
    User,
    Assistant,
    Tool,
}

impl AuthorRole {
    /// Wire name used by OpenAI-style chat schemas
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorRole::System => "system",
            AuthorRole::User => "user",
            AuthorRole::Assistant => "assistant",
            AuthorRole::Tool => "tool",
        }
    }
}

/// A single chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: AuthorRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn new(role: AuthorRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
        }
    }
}

/// Ordered conversation history passed to chat completion connectors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatHistory {
    messages: Vec<ChatMessage>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a history with a system prompt
    pub fn with_system_message(prompt: impl Into<String>) -> Self {
        let mut history = Self::new();
        history.add_system_message(prompt);
        history
    }

    pub fn add_system_message(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::new(AuthorRole::System, content));
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::new(AuthorRole::User, content));
    }

    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::new(AuthorRole::Assistant, content));
    }

    pub fn add_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Token usage reported by a provider
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Result of a chat completion call
#[derive(Debug, Clone)]
pub struct ChatResult {
    pub content: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
}

/// A single embedding vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.0
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(v: Vec<f32>) -> Self {
        Embedding(v)
    }
}

/// Image produced by a text-to-image connector
#[derive(Debug, Clone)]
pub enum GeneratedImage {
    /// Hosted URL returned by the provider
    Url(String),
    /// Raw image bytes decoded from a base64 payload
    Bytes(Vec<u8>),
}

/// Audio produced by a text-to-audio connector
#[derive(Debug, Clone)]
pub struct AudioContent {
    pub data: Vec<u8>,
    pub mime_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_history_ordering() {
        let mut history = ChatHistory::with_system_message("You are helpful.");
        history.add_user_message("hi");
        history.add_assistant_message("hello");

        assert_eq!(history.len(), 3);
        assert_eq!(history.messages()[0].role, AuthorRole::System);
        assert_eq!(history.messages()[1].role, AuthorRole::User);
        assert_eq!(history.messages()[2].role, AuthorRole::Assistant);
    }

    #[test]
    fn test_message_serializes_with_lowercase_role() {
        let message = ChatMessage::new(AuthorRole::User, "hi");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hi");
        // name is omitted entirely when unset
        assert!(json.get("name").is_none());
    }

    #[test]
    fn test_embedding_dim() {
        let embedding = Embedding::from(vec![0.1, 0.2, 0.3]);
        assert_eq!(embedding.dim(), 3);
    }
}
