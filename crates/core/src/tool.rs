use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{info, warn};

use crate::result::{ErrorKind, NormalizedResult, ToolError};

/// One external capability exposed to the hosted agent.
///
/// Implementations wrap exactly one remote service. They never let
/// transport or parsing failures escape: every outcome is returned as a
/// [`NormalizedResult`].
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    /// Shown to the orchestrating agent when it selects among tools.
    fn description(&self) -> &str;
    async fn invoke(&self, query: &str) -> NormalizedResult;
}

/// Fallible constructor for a tool, run once at process startup.
///
/// `configure` reads its configuration section and performs any
/// registration-time reachability checks, so a broken tool is excluded
/// before the agent ever sees it as available.
#[async_trait]
pub trait ToolFactory: Send + Sync {
    fn name(&self) -> &str;
    async fn configure(&self) -> Result<ToolDescriptor, ToolError>;
}

/// An immutable, registered tool. Identity is the name.
#[derive(Clone)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    tool: Arc<dyn Tool>,
}

impl ToolDescriptor {
    pub fn new(tool: impl Tool + 'static) -> Self {
        let name = tool.name().to_string();
        let description = tool.description().to_string();
        Self { name, description, tool: Arc::new(tool) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Run the tool with a panic guard.
    ///
    /// A panicking adapter is a bug, but the orchestrator still gets a
    /// failure value instead of a crashed turn.
    pub async fn invoke(&self, query: &str) -> NormalizedResult {
        match AssertUnwindSafe(self.tool.invoke(query)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload);
                warn!(tool = %self.name, panic = %message, "tool invocation panicked");
                NormalizedResult::failure(
                    ErrorKind::Unknown,
                    format!("Error invoking {}: {message}", self.name),
                )
            }
        }
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor").field("name", &self.name).finish_non_exhaustive()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unidentified panic".to_string()
    }
}

/// The set of tools that configured successfully, in candidate order.
///
/// Candidate order is preserved because the orchestrator treats it as a
/// tie-break preference hint. After construction the registry is
/// read-only, so sharing it across turns is safe.
#[derive(Default)]
pub struct ToolRegistry {
    descriptors: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    /// Configure every candidate and keep the survivors.
    ///
    /// This is the only place registration failure is absorbed: a tool
    /// that cannot configure is logged and omitted, and the agent keeps
    /// serving with whatever remains. Callers must treat the output as
    /// the authoritative "currently available tools" set.
    pub async fn build(candidates: Vec<Box<dyn ToolFactory>>) -> Self {
        let mut descriptors: Vec<ToolDescriptor> = Vec::with_capacity(candidates.len());

        for factory in candidates {
            match factory.configure().await {
                Ok(descriptor) => {
                    if descriptors.iter().any(|existing| existing.name() == descriptor.name()) {
                        warn!(
                            tool = %descriptor.name(),
                            "duplicate tool name, keeping the first registration"
                        );
                        continue;
                    }
                    info!(tool = %descriptor.name(), "tool registered");
                    descriptors.push(descriptor);
                }
                Err(error) => {
                    warn!(
                        tool = %factory.name(),
                        kind = %error.kind,
                        reason = %error.message,
                        "tool skipped: configuration failed"
                    );
                }
            }
        }

        Self { descriptors }
    }

    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.descriptors.iter().find(|descriptor| descriptor.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(ToolDescriptor::name).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Invoke a registered tool by name.
    ///
    /// An unknown name is a failure value like any other: the orchestrator
    /// may race a stale tool list against a rebuilt registry.
    pub async fn invoke(&self, name: &str, query: &str) -> NormalizedResult {
        match self.get(name) {
            Some(descriptor) => descriptor.invoke(query).await,
            None => NormalizedResult::failure(
                ErrorKind::Unknown,
                format!("unknown tool `{name}` (available: {})", self.names().join(", ")),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::{Tool, ToolDescriptor, ToolFactory, ToolRegistry};
    use crate::result::{ErrorKind, NormalizedResult, ToolError};

    struct EchoTool {
        name: &'static str,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "echoes the query back"
        }

        async fn invoke(&self, query: &str) -> NormalizedResult {
            NormalizedResult::success(format!("{}: {query}", self.name))
        }
    }

    struct PanickingTool;

    #[async_trait]
    impl Tool for PanickingTool {
        fn name(&self) -> &str {
            "panicky"
        }

        fn description(&self) -> &str {
            "always panics"
        }

        async fn invoke(&self, _query: &str) -> NormalizedResult {
            panic!("index out of range");
        }
    }

    struct StubFactory {
        name: &'static str,
        outcome: Result<(), ToolError>,
    }

    impl StubFactory {
        fn ok(name: &'static str) -> Box<dyn ToolFactory> {
            Box::new(Self { name, outcome: Ok(()) })
        }

        fn failing(name: &'static str, error: ToolError) -> Box<dyn ToolFactory> {
            Box::new(Self { name, outcome: Err(error) })
        }
    }

    #[async_trait]
    impl ToolFactory for StubFactory {
        fn name(&self) -> &str {
            self.name
        }

        async fn configure(&self) -> Result<ToolDescriptor, ToolError> {
            self.outcome
                .clone()
                .map(|()| ToolDescriptor::new(EchoTool { name: self.name }))
        }
    }

    #[tokio::test]
    async fn registry_keeps_only_candidates_that_configure() {
        let registry = ToolRegistry::build(vec![
            StubFactory::ok("datastore_search"),
            StubFactory::failing(
                "get-product-price",
                ToolError::new(ErrorKind::ServiceUnreachable, "proxy refused connection"),
            ),
            StubFactory::ok("web_search"),
        ])
        .await;

        assert_eq!(registry.len(), 2);
        assert!(registry.get("get-product-price").is_none());
    }

    #[tokio::test]
    async fn registry_preserves_candidate_order() {
        let registry = ToolRegistry::build(vec![
            StubFactory::ok("first"),
            StubFactory::ok("second"),
            StubFactory::ok("third"),
        ])
        .await;

        assert_eq!(registry.names(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn missing_configuration_excludes_the_candidate() {
        let registry = ToolRegistry::build(vec![StubFactory::failing(
            "datastore_search",
            ToolError::configuration_missing(&["project_id", "engine_id"]),
        )])
        .await;

        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn duplicate_names_keep_the_first_registration() {
        let registry =
            ToolRegistry::build(vec![StubFactory::ok("echo"), StubFactory::ok("echo")]).await;

        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_invocation_is_a_failure_value() {
        let registry = ToolRegistry::build(vec![StubFactory::ok("echo")]).await;
        let result = registry.invoke("nonexistent", "hello").await;

        match result {
            NormalizedResult::Failure { kind, message } => {
                assert_eq!(kind, ErrorKind::Unknown);
                assert!(message.contains("nonexistent"));
                assert!(message.contains("echo"));
            }
            NormalizedResult::Success { .. } => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn panicking_tool_yields_unknown_failure_not_a_crash() {
        let descriptor = ToolDescriptor::new(PanickingTool);
        let result = descriptor.invoke("anything").await;

        match result {
            NormalizedResult::Failure { kind, message } => {
                assert_eq!(kind, ErrorKind::Unknown);
                assert!(message.contains("index out of range"));
            }
            NormalizedResult::Success { .. } => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn registered_tool_invokes_through_the_registry() {
        let registry = ToolRegistry::build(vec![StubFactory::ok("echo")]).await;
        let result = registry.invoke("echo", "how much is finch seed?").await;

        assert_eq!(result, NormalizedResult::success("echo: how much is finch seed?"));
    }
}
