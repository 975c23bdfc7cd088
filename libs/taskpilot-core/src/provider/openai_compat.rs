//! Client for OpenAI-compatible chat completion APIs (OpenRouter, Groq)

use super::{ProviderError, ProviderKind, TextGenerator};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// `POST {base_url}/chat/completions` with bearer authentication
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleClient {
    client: Client,
    kind: ProviderKind,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    extra_headers: Vec<(&'static str, String)>,
}

impl OpenAiCompatibleClient {
    #[must_use]
    pub fn new(
        client: Client,
        kind: ProviderKind,
        base_url: String,
        api_key: String,
        model: String,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            client,
            kind,
            base_url,
            api_key,
            model,
            temperature,
            max_tokens,
            extra_headers: Vec::new(),
        }
    }

    /// Send an additional header with every request
    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.extra_headers.push((name, value.into()));
        self
    }

    #[must_use]
    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn request_body<'a>(&'a self, prompt: &'a str, system_instructions: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_instructions,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Extract `choices[0].message.content` from a chat completion body
pub(crate) fn parse_chat_response(body: &str) -> Result<String, ProviderError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("invalid JSON: {e}")))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ProviderError::MalformedResponse("no message content in choices".to_string()))
}

#[async_trait]
impl TextGenerator for OpenAiCompatibleClient {
    async fn generate(&self, prompt: &str, system_instructions: &str) -> Result<String, ProviderError> {
        debug!(provider = self.name(), model = %self.model, "Sending chat completion request");

        let mut request = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt, system_instructions));
        for (name, value) in &self.extra_headers {
            request = request.header(*name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16(), &body));
        }

        parse_chat_response(&body)
    }

    fn name(&self) -> &'static str {
        self.kind.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAiCompatibleClient {
        OpenAiCompatibleClient::new(
            Client::new(),
            ProviderKind::Groq,
            "https://api.groq.com/openai/v1/".to_string(),
            "key".to_string(),
            "llama3-8b-8192".to_string(),
            0.7,
            1500,
        )
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        assert_eq!(
            client().endpoint(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let client = client();
        let body = serde_json::to_value(client.request_body("the prompt", "be brief")).unwrap();

        assert_eq!(body["model"], "llama3-8b-8192");
        assert_eq!(body["max_tokens"], 1500);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be brief");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "the prompt");
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_parse_chat_response() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "Do the overdue task first."}}]}"#;
        assert_eq!(
            parse_chat_response(body).unwrap(),
            "Do the overdue task first."
        );
    }

    #[test]
    fn test_parse_chat_response_without_choices() {
        let err = parse_chat_response(r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));

        let err = parse_chat_response("not json").unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn test_with_header() {
        let client = client().with_header("X-Title", "TaskPilot");
        assert_eq!(client.extra_headers, vec![("X-Title", "TaskPilot".to_string())]);
    }
}
