use serde::{Deserialize, Serialize};

/// Request body for the completions endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest<'a> {
    pub prompt: &'a str,
    pub max_tokens: u32,
}

/// Response body from the completions endpoint. Fields other than these are
/// ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<Choice>,
    /// Advisory messages sent alongside a successful response
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub text: String,
}
