//! Perch Agent - assembly of the hosted concierge agent
//!
//! The agent's reasoning runs in a hosted service; this crate owns what
//! surrounds it on our side of the wire:
//! - **Instructions** (`instructions`) - the root agent's prompt, read
//!   from a file at startup
//! - **Sessions** (`session`) - short-term, in-memory conversation
//!   history per session (nothing persists across restarts)
//! - **Runtime** (`runtime`) - the tool registry built from the three
//!   adapters, plus the dispatch seam the orchestrator calls per turn
//!
//! # Safety Principle
//!
//! The hosted model only ever selects tools and phrases answers. Prices,
//! store facts, and web citations come from the registered tools; a tool
//! failure reaches the model as prose it can relay, never as a fault.

pub mod instructions;
pub mod runtime;
pub mod session;

pub use runtime::{bootstrap, AgentDefinition, AgentHarness, BootstrapError, ToolDeclaration};
pub use session::{InMemorySessionService, SessionId, SessionService, Speaker, Turn};
