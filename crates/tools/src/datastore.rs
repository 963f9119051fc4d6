use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use perch_core::config::DatastoreConfig;
use perch_core::{normalize, ErrorKind, NormalizedResult, Tool, ToolDescriptor, ToolError, ToolFactory};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::{AccessTokens, GcloudTokens};
use crate::error::BackendError;

pub const DATASTORE_TOOL_NAME: &str = "search_store_documents";

// Retrieval tuning: top 5 ranked results, up to 3 snippet excerpts each,
// summary over the full page with citations.
const PAGE_SIZE: u32 = 5;
const MAX_SNIPPETS_PER_RESULT: u32 = 3;
const SUMMARY_RESULT_COUNT: u32 = 5;

const EMPTY_FALLBACK: &str = "No relevant information found in the store documents.";

// Structured fields worth displaying when a result carries no snippets,
// in display priority order.
const STRUCT_FALLBACK_KEYS: &[&str] = &["title", "content", "text", "body"];

/// Search request in adapter terms; the backend maps it onto the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchRequest {
    pub serving_config: String,
    pub query: String,
    pub page_size: u32,
    pub max_snippet_count: u32,
    pub summary_result_count: u32,
}

/// One ranked result: snippet excerpts plus raw structured fields.
#[derive(Clone, Debug, Default)]
pub struct SearchResultItem {
    pub snippets: Vec<String>,
    pub struct_data: Map<String, Value>,
}

/// The managed search engine, behind a seam so the adapter logic is
/// testable without network access.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResultItem>, BackendError>;
}

/// Full resource name of the search app serving config.
pub fn serving_config_path(config: &DatastoreConfig) -> String {
    format!(
        "projects/{}/locations/{}/collections/default_collection/engines/{}/servingConfigs/default_config",
        config.project_id, config.location, config.engine_id
    )
}

/// Adapter for store-document questions (hours, location, history, staff).
pub struct DatastoreSearchTool<B> {
    backend: B,
    serving_config: String,
}

impl<B: SearchBackend> DatastoreSearchTool<B> {
    pub fn new(backend: B, serving_config: String) -> Self {
        Self { backend, serving_config }
    }

    fn request_for(&self, query: &str) -> SearchRequest {
        SearchRequest {
            serving_config: self.serving_config.clone(),
            query: query.to_string(),
            page_size: PAGE_SIZE,
            max_snippet_count: MAX_SNIPPETS_PER_RESULT,
            summary_result_count: SUMMARY_RESULT_COUNT,
        }
    }
}

#[async_trait]
impl<B: SearchBackend + 'static> Tool for DatastoreSearchTool<B> {
    fn name(&self) -> &str {
        DATASTORE_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Searches the store's uploaded documents for information about \
         hours, location, history, staff, and policies."
    }

    async fn invoke(&self, query: &str) -> NormalizedResult {
        match self.backend.search(&self.request_for(query)).await {
            Ok(items) => normalize(extract_display_lines(&items), EMPTY_FALLBACK),
            Err(error) => NormalizedResult::failure(
                error.classify(),
                format!("Error searching the store documents: {error}"),
            ),
        }
    }
}

/// Snippets win; a result without any falls back to its well-known
/// structured fields, joined with single spaces into one line. Ranked
/// order is preserved throughout.
fn extract_display_lines(items: &[SearchResultItem]) -> Vec<String> {
    let mut lines = Vec::new();

    for item in items.iter().take(PAGE_SIZE as usize) {
        let snippets: Vec<&String> = item
            .snippets
            .iter()
            .filter(|snippet| !snippet.trim().is_empty())
            .take(MAX_SNIPPETS_PER_RESULT as usize)
            .collect();

        if !snippets.is_empty() {
            lines.extend(snippets.into_iter().cloned());
            continue;
        }

        let mut content_parts = Vec::new();
        for wanted in STRUCT_FALLBACK_KEYS {
            for (key, value) in &item.struct_data {
                if key.eq_ignore_ascii_case(wanted) {
                    content_parts.push(render_field(value));
                }
            }
        }
        if !content_parts.is_empty() {
            lines.push(content_parts.join(" "));
        }
    }

    lines
}

fn render_field(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// HTTP client for the managed search REST endpoint.
pub struct DiscoveryClient {
    http: reqwest::Client,
    endpoint: String,
    tokens: Arc<dyn AccessTokens>,
}

impl DiscoveryClient {
    pub fn new(
        location: &str,
        timeout_secs: u64,
        tokens: Arc<dyn AccessTokens>,
    ) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { http, endpoint: endpoint_for(location), tokens })
    }
}

// Multi-region datastores are served from the bare host; regional ones
// from a location-prefixed host.
fn endpoint_for(location: &str) -> String {
    if location == "global" {
        "https://discoveryengine.googleapis.com".to_string()
    } else {
        format!("https://{location}-discoveryengine.googleapis.com")
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireSearchRequest<'a> {
    query: &'a str,
    page_size: u32,
    content_search_spec: WireContentSearchSpec,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireContentSearchSpec {
    snippet_spec: WireSnippetSpec,
    summary_spec: WireSummarySpec,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireSnippetSpec {
    max_snippet_count: u32,
    reference_only: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireSummarySpec {
    summary_result_count: u32,
    include_citations: bool,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WireSearchResponse {
    results: Vec<WireResult>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct WireResult {
    document: WireDocument,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WireDocument {
    derived_struct_data: Map<String, Value>,
    struct_data: Map<String, Value>,
}

#[async_trait]
impl SearchBackend for DiscoveryClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResultItem>, BackendError> {
        let token = self.tokens.access_token().await?;
        let url = format!("{}/v1/{}:search", self.endpoint, request.serving_config);
        tracing::debug!(query = %request.query, page_size = request.page_size, "datastore search");

        let body = WireSearchRequest {
            query: &request.query,
            page_size: request.page_size,
            content_search_spec: WireContentSearchSpec {
                snippet_spec: WireSnippetSpec {
                    max_snippet_count: request.max_snippet_count,
                    reference_only: false,
                },
                summary_spec: WireSummarySpec {
                    summary_result_count: request.summary_result_count,
                    include_citations: true,
                },
            },
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(token.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status: status.as_u16(), body });
        }

        let parsed: WireSearchResponse =
            response.json().await.map_err(|error| BackendError::Decode(error.to_string()))?;

        Ok(parsed.results.into_iter().map(item_from_wire).collect())
    }
}

fn item_from_wire(result: WireResult) -> SearchResultItem {
    let snippets = result
        .document
        .derived_struct_data
        .get("snippets")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get("snippet").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    SearchResultItem { snippets, struct_data: result.document.struct_data }
}

/// Registration-time constructor for the datastore tool.
pub struct DatastoreSearchFactory {
    config: DatastoreConfig,
    tokens: Arc<dyn AccessTokens>,
}

impl DatastoreSearchFactory {
    pub fn new(config: DatastoreConfig) -> Self {
        Self::with_tokens(config, Arc::new(GcloudTokens))
    }

    pub fn with_tokens(config: DatastoreConfig, tokens: Arc<dyn AccessTokens>) -> Self {
        Self { config, tokens }
    }
}

#[async_trait]
impl ToolFactory for DatastoreSearchFactory {
    fn name(&self) -> &str {
        DATASTORE_TOOL_NAME
    }

    async fn configure(&self) -> Result<ToolDescriptor, ToolError> {
        let missing = self.config.missing_required();
        if !missing.is_empty() {
            return Err(ToolError::configuration_missing(&missing));
        }

        let client =
            DiscoveryClient::new(&self.config.location, self.config.timeout_secs, Arc::clone(&self.tokens))
                .map_err(|error| {
                    ToolError::new(
                        ErrorKind::Unknown,
                        format!("could not build the search client: {error}"),
                    )
                })?;

        Ok(ToolDescriptor::new(DatastoreSearchTool::new(
            client,
            serving_config_path(&self.config),
        )))
    }
}
