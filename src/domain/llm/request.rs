use serde::{Deserialize, Serialize};

use super::Message;

/// Parameters for a single completion call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Ask the provider for a JSON object response when it supports it
    #[serde(default)]
    pub json_mode: bool,
}

impl LlmRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
            json_mode: false,
        }
    }

    pub fn builder() -> LlmRequestBuilder {
        LlmRequestBuilder::new()
    }

    /// Concatenated text of all user messages
    pub fn user_text(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == super::MessageRole::User)
            .map(|m| m.content_text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Builder for LlmRequest
#[derive(Debug, Default)]
pub struct LlmRequestBuilder {
    messages: Vec<Message>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    json_mode: bool,
}

impl LlmRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn system(self, content: impl Into<String>) -> Self {
        self.message(Message::system(content))
    }

    pub fn user(self, content: impl Into<String>) -> Self {
        self.message(Message::user(content))
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn max_tokens_opt(mut self, tokens: Option<u32>) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }

    pub fn build(self) -> LlmRequest {
        LlmRequest {
            messages: self.messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            json_mode: self.json_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = LlmRequest::builder()
            .system("You are a grader")
            .user("Is this relevant?")
            .temperature(0.0)
            .max_tokens(50)
            .json_mode(true)
            .build();

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.max_tokens, Some(50));
        assert!(request.json_mode);
    }

    #[test]
    fn test_user_text_skips_system_messages() {
        let request = LlmRequest::builder()
            .system("hidden")
            .user("first")
            .user("second")
            .build();

        assert_eq!(request.user_text(), "first\nsecond");
    }
}
