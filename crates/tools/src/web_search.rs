use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use perch_core::config::WebSearchConfig;
use perch_core::{normalize, ErrorKind, NormalizedResult, Tool, ToolDescriptor, ToolError, ToolFactory};
use secrecy::ExposeSecret;
use serde_json::{json, Value};

use crate::auth::{AccessTokens, GcloudTokens};
use crate::error::BackendError;

pub const WEB_SEARCH_TOOL_NAME: &str = "web_knowledge_search";

const EMPTY_FALLBACK: &str = "The web search returned no relevant information.";

/// A hosted model with a built-in search-grounding tool.
///
/// The response is already-formatted prose with citations; this adapter
/// treats it as a black box and applies no extraction beyond a blank
/// check and generic error mapping.
#[async_trait]
pub trait GroundedSearch: Send + Sync {
    async fn ground(&self, query: &str) -> Result<String, BackendError>;
}

/// Adapter for general bird-knowledge questions outside the store's
/// own documents.
pub struct WebSearchTool<B> {
    backend: B,
}

impl<B: GroundedSearch> WebSearchTool<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl<B: GroundedSearch + 'static> Tool for WebSearchTool<B> {
    fn name(&self) -> &str {
        WEB_SEARCH_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Answers general bird-care and species questions using live web \
         search with citations."
    }

    async fn invoke(&self, query: &str) -> NormalizedResult {
        match self.backend.ground(query).await {
            Ok(prose) => normalize([prose], EMPTY_FALLBACK),
            Err(error) => NormalizedResult::failure(
                error.classify(),
                format!("Error running web search: {error}"),
            ),
        }
    }
}

/// HTTP client for the hosted model's generateContent endpoint with the
/// search-grounding tool enabled.
pub struct GroundedModelClient {
    http: reqwest::Client,
    url: String,
    instruction: String,
    tokens: Arc<dyn AccessTokens>,
}

impl GroundedModelClient {
    pub fn new(
        config: &WebSearchConfig,
        instruction: String,
        tokens: Arc<dyn AccessTokens>,
    ) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, url: model_url(config), instruction, tokens })
    }
}

fn model_url(config: &WebSearchConfig) -> String {
    let host = if config.location == "global" {
        "https://aiplatform.googleapis.com".to_string()
    } else {
        format!("https://{}-aiplatform.googleapis.com", config.location)
    };
    format!(
        "{host}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
        config.project_id, config.location, config.model
    )
}

#[async_trait]
impl GroundedSearch for GroundedModelClient {
    async fn ground(&self, query: &str) -> Result<String, BackendError> {
        let token = self.tokens.access_token().await?;
        let body = json!({
            "systemInstruction": { "parts": [{ "text": self.instruction }] },
            "contents": [{ "role": "user", "parts": [{ "text": query }] }],
            "tools": [{ "googleSearch": {} }],
        });

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(token.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status: status.as_u16(), body });
        }

        let payload: Value =
            response.json().await.map_err(|error| BackendError::Decode(error.to_string()))?;
        candidate_text(&payload)
            .ok_or_else(|| BackendError::Decode("response carried no candidate text".to_string()))
    }
}

fn candidate_text(payload: &Value) -> Option<String> {
    let parts = payload
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let texts: Vec<&str> =
        parts.iter().filter_map(|part| part.get("text").and_then(Value::as_str)).collect();

    if texts.is_empty() {
        return None;
    }
    Some(texts.join("\n"))
}

/// Registration-time constructor for the web search tool.
pub struct WebSearchFactory {
    config: WebSearchConfig,
    tokens: Arc<dyn AccessTokens>,
}

impl WebSearchFactory {
    pub fn new(config: WebSearchConfig) -> Self {
        Self::with_tokens(config, Arc::new(GcloudTokens))
    }

    pub fn with_tokens(config: WebSearchConfig, tokens: Arc<dyn AccessTokens>) -> Self {
        Self { config, tokens }
    }
}

#[async_trait]
impl ToolFactory for WebSearchFactory {
    fn name(&self) -> &str {
        WEB_SEARCH_TOOL_NAME
    }

    async fn configure(&self) -> Result<ToolDescriptor, ToolError> {
        let missing = self.config.missing_required();
        if !missing.is_empty() {
            return Err(ToolError::configuration_missing(&missing));
        }

        // The search agent has its own instruction file; a missing one is
        // a configuration problem, not an invocation-time failure.
        let instruction =
            tokio::fs::read_to_string(&self.config.instruction_path).await.map_err(|error| {
                ToolError::new(
                    ErrorKind::ConfigurationMissing,
                    format!(
                        "instruction file `{}` could not be read: {error}",
                        self.config.instruction_path.display()
                    ),
                )
            })?;

        let client = GroundedModelClient::new(&self.config, instruction, Arc::clone(&self.tokens))
            .map_err(|error| {
                ToolError::new(
                    ErrorKind::Unknown,
                    format!("could not build the grounded search client: {error}"),
                )
            })?;

        Ok(ToolDescriptor::new(WebSearchTool::new(client)))
    }
}
