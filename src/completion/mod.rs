pub mod types;

use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::OpenAiConfig;
use types::{CompletionRequest, CompletionResponse};

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Completion API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode completion response: {source} (body: {body})")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },
}

/// Client for a text-completion endpoint.
///
/// Holds no per-request state; every `send` is one POST.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    organization_id: String,
    project_id: String,
}

impl CompletionClient {
    pub fn new(config: &OpenAiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            organization_id: config.organization_id.clone(),
            project_id: config.project_id.clone(),
        }
    }

    fn build_request(&self, prompt: &str, max_tokens: u32) -> reqwest::RequestBuilder {
        self.http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .header("OpenAI-Organization", &self.organization_id)
            .header("OpenAI-Project", &self.project_id)
            .json(&CompletionRequest { prompt, max_tokens })
    }

    /// Send a prompt and return the text of the first choice.
    ///
    /// An empty choice list is a valid answer and comes back as an empty
    /// string.
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    pub async fn send(&self, prompt: &str, max_tokens: u32) -> Result<String, CompletionError> {
        let response = self.build_request(prompt, max_tokens).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), body_bytes = body.len(), "received completion response");
        decode_response(status, body)
    }
}

/// Interpret a completion response body.
pub fn decode_response(status: StatusCode, body: String) -> Result<String, CompletionError> {
    if !status.is_success() {
        return Err(CompletionError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let response: CompletionResponse = match serde_json::from_str(&body) {
        Ok(response) => response,
        Err(source) => return Err(CompletionError::Decode { source, body }),
    };

    for warning in &response.warnings {
        warn!(warning = %warning, "completion API warning");
    }

    match response.choices.into_iter().next() {
        Some(choice) => Ok(choice.text),
        None => {
            debug!("no choices in completion response");
            Ok(String::new())
        }
    }
}
