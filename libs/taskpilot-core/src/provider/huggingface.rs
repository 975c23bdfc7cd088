//! Hugging Face Inference API client

use super::{ProviderError, TextGenerator};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Deserialize)]
struct InferenceOutput {
    generated_text: Option<String>,
}

/// `POST {base_url}/models/{model}` with `{"inputs": prompt}`
///
/// The inference API takes raw text, so system instructions are not sent.
#[derive(Debug, Clone)]
pub struct HuggingFaceClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HuggingFaceClient {
    #[must_use]
    pub fn new(client: Client, base_url: String, api_key: String, model: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

/// Extract `[0].generated_text` from an inference reply
pub(crate) fn parse_inference_response(body: &str) -> Result<String, ProviderError> {
    let outputs: Vec<InferenceOutput> = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("invalid JSON: {e}")))?;

    outputs
        .into_iter()
        .next()
        .and_then(|output| output.generated_text)
        .ok_or_else(|| ProviderError::MalformedResponse("no generated_text in reply".to_string()))
}

#[async_trait]
impl TextGenerator for HuggingFaceClient {
    async fn generate(&self, prompt: &str, _system_instructions: &str) -> Result<String, ProviderError> {
        debug!(model = %self.model, "Sending inference request");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&InferenceRequest { inputs: prompt })
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

        parse_inference_response(&body)
    }

    fn name(&self) -> &'static str {
        "huggingface"
    }
}
