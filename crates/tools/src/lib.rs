//! Perch Tools - adapters over the boutique's external services
//!
//! Each adapter wraps exactly one managed service behind the uniform
//! `Tool` contract from `perch-core`:
//! - **Datastore search** (`datastore`) - the store's uploaded documents
//!   (hours, location, history, staff) via the managed search engine
//! - **Web search** (`web_search`) - general bird knowledge via a hosted
//!   model with a built-in search-grounding tool
//! - **Product prices** (`toolbox`) - the catalog database via a remote
//!   tool-execution proxy (no raw SQL leaves this process)
//!
//! The substantive work (ranking, summarization, grounding, SQL) happens
//! in the services; the adapters own configuration, the wire formats,
//! result extraction, and the mapping of every failure onto the shared
//! error taxonomy.

pub mod auth;
pub mod datastore;
pub mod error;
pub mod toolbox;
pub mod web_search;

pub use auth::{AccessTokens, GcloudTokens};
pub use datastore::{DatastoreSearchFactory, DatastoreSearchTool, DiscoveryClient};
pub use error::BackendError;
pub use toolbox::{ProductPriceFactory, ProductPriceTool, ToolboxClient};
pub use web_search::{GroundedModelClient, WebSearchFactory, WebSearchTool};
