use std::time::Instant;

use perch_core::config::AppConfig;
use perch_core::{NormalizedResult, ToolFactory, ToolRegistry};
use perch_tools::{DatastoreSearchFactory, ProductPriceFactory, WebSearchFactory};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::instructions::{self, InstructionError};
use crate::session::InMemorySessionService;

/// Identity of the hosted root agent.
#[derive(Clone, Debug)]
pub struct AgentDefinition {
    pub name: String,
    pub model: String,
    pub instruction: String,
}

/// Declaration handed to the hosted framework for each registered tool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Instruction(#[from] InstructionError),
}

/// The assembled concierge: hosted identity plus the tools that survived
/// registration. Read-only after construction.
pub struct AgentHarness {
    definition: AgentDefinition,
    registry: ToolRegistry,
    sessions: InMemorySessionService,
}

impl AgentHarness {
    pub fn new(definition: AgentDefinition, registry: ToolRegistry) -> Self {
        Self { definition, registry, sessions: InMemorySessionService::new() }
    }

    pub fn definition(&self) -> &AgentDefinition {
        &self.definition
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Short-term conversation memory, scoped to this process.
    pub fn sessions(&self) -> &InMemorySessionService {
        &self.sessions
    }

    pub fn tool_manifest(&self) -> Vec<ToolDeclaration> {
        self.registry
            .descriptors()
            .iter()
            .map(|descriptor| ToolDeclaration {
                name: descriptor.name().to_string(),
                description: descriptor.description().to_string(),
            })
            .collect()
    }

    /// The seam the hosted orchestrator calls once per selected tool.
    ///
    /// Failures surface as prose - the model has no channel other than
    /// text to explain an inability to answer.
    pub async fn dispatch(&self, tool_name: &str, query: &str) -> String {
        let started = Instant::now();
        let result = self.registry.invoke(tool_name, query).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            NormalizedResult::Success { .. } => info!(
                event_name = "agent.tool.completed",
                tool = %tool_name,
                elapsed_ms,
                "tool invocation completed"
            ),
            NormalizedResult::Failure { kind, message } => warn!(
                event_name = "agent.tool.failed",
                tool = %tool_name,
                kind = %kind,
                elapsed_ms,
                reason = %message,
                "tool invocation failed"
            ),
        }

        result.display_text().to_string()
    }
}

/// Build the concierge from configuration: instruction file first, then
/// the three tool candidates in preference order (store documents, web
/// knowledge, product prices). Candidates that fail to configure are
/// logged and dropped by the registry; the agent serves with the rest.
pub async fn bootstrap(config: &AppConfig) -> Result<AgentHarness, BootstrapError> {
    let instruction = instructions::load(&config.agent.instruction_path)?;

    let candidates: Vec<Box<dyn ToolFactory>> = vec![
        Box::new(DatastoreSearchFactory::new(config.datastore.clone())),
        Box::new(WebSearchFactory::new(config.web_search.clone())),
        Box::new(ProductPriceFactory::new(config.toolbox.clone())),
    ];

    let registry = ToolRegistry::build(candidates).await;
    info!(
        event_name = "agent.bootstrap.tools_registered",
        tool_count = registry.len(),
        tools = %registry.names().join(","),
        "tool registry built"
    );

    Ok(AgentHarness::new(
        AgentDefinition {
            name: config.agent.name.clone(),
            model: config.agent.model.clone(),
            instruction,
        },
        registry,
    ))
}
