use std::time::Duration;

use async_trait::async_trait;
use perch_core::config::ToolboxConfig;
use perch_core::{normalize, ErrorKind, NormalizedResult, Tool, ToolDescriptor, ToolError, ToolFactory};
use serde_json::{json, Value};

use crate::error::BackendError;

const EMPTY_FALLBACK: &str = "No matching products were found in the price database.";

/// Remote tool-execution proxy exposing named, pre-declared database
/// operations. The agent never sees SQL; it sees a callable by name.
#[async_trait]
pub trait ToolProxy: Send + Sync {
    /// Confirm the named tool is declared on the proxy.
    async fn load(&self, name: &str) -> Result<(), BackendError>;
    /// Execute the named tool; returns the payload of the `result` field.
    async fn execute(&self, name: &str, params: Value) -> Result<Value, BackendError>;
}

/// HTTP client for the tool-execution proxy.
pub struct ToolboxClient {
    http: reqwest::Client,
    base_url: String,
}

impl ToolboxClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string() })
    }

    fn tool_url(&self, name: &str) -> String {
        format!("{}/api/tool/{name}", self.base_url)
    }
}

#[async_trait]
impl ToolProxy for ToolboxClient {
    async fn load(&self, name: &str) -> Result<(), BackendError> {
        let response = self.http.get(self.tool_url(name)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status: status.as_u16(), body });
        }
        Ok(())
    }

    async fn execute(&self, name: &str, params: Value) -> Result<Value, BackendError> {
        tracing::debug!(tool = %name, "toolbox invoke");
        let response = self
            .http
            .post(format!("{}/invoke", self.tool_url(name)))
            .json(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status: status.as_u16(), body });
        }

        let payload: Value =
            response.json().await.map_err(|error| BackendError::Decode(error.to_string()))?;
        payload
            .get("result")
            .cloned()
            .ok_or_else(|| BackendError::Decode("response has no `result` field".to_string()))
    }
}

/// Adapter for product price lookups through the proxy.
pub struct ProductPriceTool<P> {
    proxy: P,
    tool_name: String,
}

impl<P: ToolProxy> ProductPriceTool<P> {
    pub fn new(proxy: P, tool_name: String) -> Self {
        Self { proxy, tool_name }
    }
}

#[async_trait]
impl<P: ToolProxy + 'static> Tool for ProductPriceTool<P> {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn description(&self) -> &str {
        "Looks up current prices for boutique products by product name."
    }

    async fn invoke(&self, query: &str) -> NormalizedResult {
        let params = json!({ "product_name": query });
        match self.proxy.execute(&self.tool_name, params).await {
            Ok(result) => normalize(render_result_lines(&result), EMPTY_FALLBACK),
            Err(error) => NormalizedResult::failure(
                error.classify(),
                format!("Error querying the product database: {error}"),
            ),
        }
    }
}

// The proxy renders scalar results for simple tools and row arrays for
// multi-row ones; both shapes must display cleanly.
fn render_result_lines(result: &Value) -> Vec<String> {
    match result {
        Value::String(text) => vec![text.clone()],
        Value::Array(rows) => rows.iter().map(render_row).collect(),
        Value::Null => Vec::new(),
        other => vec![render_row(other)],
    }
}

fn render_row(row: &Value) -> String {
    match row {
        Value::Object(fields) => fields
            .iter()
            .map(|(key, value)| format!("{key}: {}", render_scalar(value)))
            .collect::<Vec<_>>()
            .join(", "),
        other => render_scalar(other),
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Registration-time constructor for the product price tool.
pub struct ProductPriceFactory {
    config: ToolboxConfig,
}

impl ProductPriceFactory {
    pub fn new(config: ToolboxConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ToolFactory for ProductPriceFactory {
    fn name(&self) -> &str {
        &self.config.tool_name
    }

    async fn configure(&self) -> Result<ToolDescriptor, ToolError> {
        let client = ToolboxClient::new(&self.config.base_url, self.config.timeout_secs)
            .map_err(|error| {
                ToolError::new(
                    ErrorKind::Unknown,
                    format!("could not build the toolbox client: {error}"),
                )
            })?;

        // An unreachable proxy is detected at registration time so the
        // registry drops the tool instead of the agent discovering the
        // outage mid-conversation.
        if let Err(error) = client.load(&self.config.tool_name).await {
            return Err(ToolError::new(
                ErrorKind::ServiceUnreachable,
                format!(
                    "could not load tool `{}` from the toolbox at {}: {error}",
                    self.config.tool_name, self.config.base_url
                ),
            ));
        }

        Ok(ToolDescriptor::new(ProductPriceTool::new(client, self.config.tool_name.clone())))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use perch_core::{ErrorKind, NormalizedResult, Tool};
    use serde_json::{json, Value};

    use super::{render_result_lines, ProductPriceTool, ToolProxy};
    use crate::error::BackendError;

    enum StubOutcome {
        Result(Value),
        Status(u16, String),
        MissingResultField,
    }

    struct StubProxy {
        outcome: StubOutcome,
    }

    #[async_trait]
    impl ToolProxy for StubProxy {
        async fn load(&self, _name: &str) -> Result<(), BackendError> {
            Ok(())
        }

        async fn execute(&self, _name: &str, params: Value) -> Result<Value, BackendError> {
            assert!(params.get("product_name").is_some(), "query must map to product_name");
            match &self.outcome {
                StubOutcome::Result(value) => Ok(value.clone()),
                StubOutcome::Status(status, body) => {
                    Err(BackendError::Status { status: *status, body: body.clone() })
                }
                StubOutcome::MissingResultField => {
                    Err(BackendError::Decode("response has no `result` field".to_string()))
                }
            }
        }
    }

    fn tool_with(outcome: StubOutcome) -> ProductPriceTool<StubProxy> {
        ProductPriceTool::new(StubProxy { outcome }, "get-product-price".to_string())
    }

    #[tokio::test]
    async fn scalar_result_displays_as_is() {
        let tool = tool_with(StubOutcome::Result(json!("Finch Seed: $12.99")));
        let result = tool.invoke("Finch Seed").await;
        assert_eq!(result, NormalizedResult::success("Finch Seed: $12.99"));
    }

    #[tokio::test]
    async fn row_array_renders_one_line_per_row() {
        let tool = tool_with(StubOutcome::Result(json!([
            { "name": "Finch Seed", "price": 12.99 },
            { "name": "Cuttlebone 2-Pack", "price": 4.50 },
        ])));

        let result = tool.invoke("seed").await;
        assert_eq!(
            result,
            NormalizedResult::success(
                "name: Finch Seed, price: 12.99\n\nname: Cuttlebone 2-Pack, price: 4.5"
            )
        );
    }

    #[tokio::test]
    async fn null_result_is_the_canned_fallback() {
        let tool = tool_with(StubOutcome::Result(Value::Null));
        let result = tool.invoke("nonexistent product").await;
        assert_eq!(
            result,
            NormalizedResult::success("No matching products were found in the price database.")
        );
    }

    #[tokio::test]
    async fn missing_result_field_classifies_as_unknown() {
        let tool = tool_with(StubOutcome::MissingResultField);

        match tool.invoke("seed").await {
            NormalizedResult::Failure { kind, message } => {
                assert_eq!(kind, ErrorKind::Unknown);
                assert!(message.contains("no `result` field"));
            }
            NormalizedResult::Success { .. } => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn credential_rejection_classifies_as_authentication_failed() {
        let tool = tool_with(StubOutcome::Status(401, "bad credentials".to_string()));

        match tool.invoke("seed").await {
            NormalizedResult::Failure { kind, .. } => {
                assert_eq!(kind, ErrorKind::AuthenticationFailed)
            }
            NormalizedResult::Success { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn numeric_result_renders_through_display() {
        assert_eq!(render_result_lines(&json!(12.99)), vec!["12.99"]);
    }
}
