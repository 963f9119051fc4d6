//! Perch Core - tool contract, result normalization, and configuration
//!
//! This crate holds the seam between the hosted agent and the external
//! services it answers from:
//! - **Results** (`result`) - the adapter-independent success/failure value
//!   and the error taxonomy every adapter maps onto
//! - **Normalization** (`normalize`) - ranked result lines joined into one
//!   display string, with a canned fallback for empty result sets
//! - **Tool contract** (`tool`) - the uniform invoke trait, fallible
//!   registration factories, and the order-preserving registry
//! - **Configuration** (`config`) - layered application config
//!   (defaults, optional `perch.toml`, environment overrides)
//!
//! # Design Principle
//!
//! Adapters never let transport or parsing failures escape. Every outcome
//! crossing the tool boundary is data - `NormalizedResult` - so the hosted
//! agent can always relay something sensible to the customer.

pub mod config;
pub mod normalize;
pub mod result;
pub mod tool;

pub use normalize::normalize;
pub use result::{ErrorKind, NormalizedResult, ToolError};
pub use tool::{Tool, ToolDescriptor, ToolFactory, ToolRegistry};
