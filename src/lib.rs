//! Pragma SDK
//!
//! Client library and provider-authoring toolkit for the Pragma platform.
//!
//! # Overview
//!
//! - **Clients**: async [`client::PragmaClient`] and blocking
//!   [`blocking::PragmaClient`] for the platform's HTTP API, with credential
//!   discovery from the environment and the CLI's config files
//! - **Provider authoring**: declare a resource's [`Config`] and [`Outputs`],
//!   implement [`ResourceHandler`], and register it on a [`Provider`]
//! - **References**: [`Field`] and [`Dependency`] wire resources together
//! - **Schemas**: JSON Schemas reflected from the declared types, dumped at
//!   build time and used to validate incoming configs
//! - **Testing**: [`testing::ProviderHarness`] runs hooks in-process
//!
//! # Quick Start
//!
//! ```ignore
//! use pragma_sdk::{async_trait, Config, Outputs, Provider, ProviderError, ResourceHandler, ResourceOf};
//! use schemars::JsonSchema;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
//! #[serde(deny_unknown_fields)]
//! struct DatabaseConfig {
//!     size_gb: u32,
//! }
//! impl Config for DatabaseConfig {}
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
//! struct DatabaseOutputs {
//!     connection_url: String,
//! }
//! impl Outputs for DatabaseOutputs {}
//!
//! struct Database;
//!
//! #[async_trait]
//! impl ResourceHandler for Database {
//!     type Config = DatabaseConfig;
//!     type Outputs = DatabaseOutputs;
//!
//!     async fn on_create(&self, resource: &ResourceOf<Self>) -> Result<DatabaseOutputs, ProviderError> {
//!         Ok(DatabaseOutputs {
//!             connection_url: format!("postgres://{}.internal:5432", resource.name),
//!         })
//!     }
//! }
//!
//! fn provider() -> Result<Provider, ProviderError> {
//!     let mut provider = Provider::new("postgres");
//!     provider.register("database", Database)?;
//!     Ok(provider)
//! }
//! ```
//!
//! # Lifecycle
//!
//! The platform delivers CREATE, UPDATE and DELETE events. [`Provider::dispatch`]
//! validates the config against the resource's schema, moves the resource
//! `draft -> pending -> processing`, runs the hook and reports success or
//! failure; the platform then marks the resource `ready` or `failed`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
#[cfg(feature = "blocking")]
pub mod blocking;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod models;
pub mod provider;
pub mod references;
pub mod resource;
mod routes;
pub mod schema;
pub mod testing;
pub mod validation;

// Re-export main types at crate root
pub use auth::BearerAuth;
pub use client::{PragmaClient, ResourceFilter};
pub use config::ClientConfig;
pub use context::{wait_for_resource_state, RuntimeContext};
pub use error::{ClientError, ConfigError, ProviderError};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use models::{
    BuildInfo, BuildStatus, DeploymentResult, DeploymentStatus, EventType, LifecycleEvent,
    LifecycleState, ProviderDeleteResult, ProviderInfo, ProviderResponse, ProviderStatus,
    PushResult, ResourceDefinition, ResponseStatus, UserInfo,
};
pub use provider::{discover_resources, Provider, ResourceType};
pub use references::{Dependency, Field, FieldReference, ResourceReference};
pub use resource::{Config, Outputs, Resource, ResourceHandler, ResourceOf};
pub use schema::{extract_schemas, ResourceSchema};
pub use validation::{is_valid, validate, validate_result, Diagnostic};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use schemars;
pub use serde_json;
pub use tracing;
