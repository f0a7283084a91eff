//! Resource types and lifecycle hooks.
//!
//! A resource type is a pair of user-declared types, a [`Config`] and an
//! [`Outputs`], plus a [`ResourceHandler`] that turns the first into the
//! second. The platform delivers create, update and delete events; the SDK
//! calls the matching hook with the current [`Resource`] record.
//!
//! # Example
//!
//! ```
//! use pragma_sdk::resource::{Config, Outputs, Resource, ResourceHandler};
//! use pragma_sdk::{async_trait, ProviderError};
//! use schemars::JsonSchema;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
//! #[serde(deny_unknown_fields)]
//! struct BucketConfig {
//!     region: String,
//! }
//! impl Config for BucketConfig {}
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
//! struct BucketOutputs {
//!     url: String,
//! }
//! impl Outputs for BucketOutputs {}
//!
//! struct Bucket;
//!
//! #[async_trait]
//! impl ResourceHandler for Bucket {
//!     type Config = BucketConfig;
//!     type Outputs = BucketOutputs;
//!
//!     async fn on_create(
//!         &self,
//!         resource: &Resource<BucketConfig, BucketOutputs>,
//!     ) -> Result<BucketOutputs, ProviderError> {
//!         Ok(BucketOutputs {
//!             url: format!("https://{}.{}.example.com", resource.name, resource.config.region),
//!         })
//!     }
//!
//!     async fn on_delete(
//!         &self,
//!         _resource: &Resource<BucketConfig, BucketOutputs>,
//!     ) -> Result<(), ProviderError> {
//!         Ok(())
//!     }
//! }
//! ```

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::models::{format_resource_id, LifecycleState};
use crate::references::ResourceReference;

/// Configuration of a resource type.
///
/// Implement this for the struct users fill in. Its JSON Schema is what the
/// platform validates submitted configs against; unknown keys are rejected,
/// so the struct should also carry `#[serde(deny_unknown_fields)]`.
pub trait Config:
    Serialize + DeserializeOwned + JsonSchema + Clone + Debug + Send + Sync + 'static
{
}

/// Outputs produced by lifecycle handlers.
pub trait Outputs:
    Serialize + DeserializeOwned + JsonSchema + Clone + Debug + Send + Sync + 'static
{
}

/// A resource instance as stored by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource<C, O> {
    /// Provider name.
    #[serde(default)]
    pub provider: String,
    /// Resource type name.
    #[serde(default)]
    pub resource: String,
    /// Instance name, unique per resource type.
    pub name: String,
    /// Desired configuration.
    pub config: C,
    /// Resources this one depends on.
    #[serde(default)]
    pub dependencies: Vec<ResourceReference>,
    /// Outputs of the last successful lifecycle event.
    #[serde(default = "Option::default")]
    pub outputs: Option<O>,
    /// Error of the last failed lifecycle event.
    #[serde(default)]
    pub error: Option<String>,
    /// Where the resource is in its lifecycle.
    #[serde(default)]
    pub lifecycle_state: LifecycleState,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl<C, O> Resource<C, O> {
    /// Create a draft resource.
    pub fn new(
        provider: impl Into<String>,
        resource: impl Into<String>,
        name: impl Into<String>,
        config: C,
    ) -> Self {
        Self {
            provider: provider.into(),
            resource: resource.into(),
            name: name.into(),
            config,
            dependencies: Vec::new(),
            outputs: None,
            error: None,
            lifecycle_state: LifecycleState::Draft,
            tags: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Unique resource ID: `resource:{provider}_{resource}_{name}`.
    pub fn id(&self) -> String {
        format_resource_id(&self.provider, &self.resource, &self.name)
    }

    /// Set the outputs of a previous event.
    pub fn with_outputs(mut self, outputs: O) -> Self {
        self.outputs = Some(outputs);
        self
    }

    /// Add a dependency.
    pub fn with_dependency(mut self, dependency: ResourceReference) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Set the tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    pub fn transition(&mut self, next: LifecycleState) -> Result<(), ProviderError> {
        if !self.lifecycle_state.can_transition_to(next) {
            return Err(ProviderError::FailedPrecondition(format!(
                "{}: cannot move from {} to {}",
                self.id(),
                self.lifecycle_state,
                next
            )));
        }
        self.lifecycle_state = next;
        self.updated_at = Some(Utc::now());
        Ok(())
    }
}

/// The resource record a handler of type `H` works with.
pub type ResourceOf<H> =
    Resource<<H as ResourceHandler>::Config, <H as ResourceHandler>::Outputs>;

/// Lifecycle hooks of a resource type.
///
/// Handlers must be idempotent: the runtime may redeliver an event if it
/// crashes after the handler ran but before the result was acknowledged.
///
/// Every hook has a default that fails with [`ProviderError::Unimplemented`].
#[async_trait::async_trait]
pub trait ResourceHandler: Send + Sync + 'static {
    /// Configuration type.
    type Config: Config;
    /// Outputs type.
    type Outputs: Outputs;

    /// Description published with the resource definition.
    fn description(&self) -> Option<String> {
        None
    }

    /// Create the resource and return its outputs.
    async fn on_create(&self, resource: &ResourceOf<Self>) -> Result<Self::Outputs, ProviderError> {
        let _ = resource;
        Err(unimplemented_hook::<Self>("on_create"))
    }

    /// Update the resource. `previous_config` is the config before the change.
    async fn on_update(
        &self,
        resource: &ResourceOf<Self>,
        previous_config: &Self::Config,
    ) -> Result<Self::Outputs, ProviderError> {
        let _ = (resource, previous_config);
        Err(unimplemented_hook::<Self>("on_update"))
    }

    /// Delete the resource.
    async fn on_delete(&self, resource: &ResourceOf<Self>) -> Result<(), ProviderError> {
        let _ = resource;
        Err(unimplemented_hook::<Self>("on_delete"))
    }
}

fn unimplemented_hook<H: ?Sized>(hook: &str) -> ProviderError {
    let type_name = std::any::type_name::<H>();
    let short = type_name.rsplit("::").next().unwrap_or(type_name);
    ProviderError::Unimplemented(format!("{} must implement {}()", short, hook))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
    #[serde(deny_unknown_fields)]
    struct StubConfig {
        name: String,
        #[serde(default = "default_size")]
        size: i64,
    }

    fn default_size() -> i64 {
        10
    }

    impl Config for StubConfig {}

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
    struct StubOutputs {
        url: String,
    }

    impl Outputs for StubOutputs {}

    struct Bare;

    #[async_trait::async_trait]
    impl ResourceHandler for Bare {
        type Config = StubConfig;
        type Outputs = StubOutputs;
    }

    fn stub() -> Resource<StubConfig, StubOutputs> {
        Resource::new(
            "test",
            "stub",
            "my-resource",
            StubConfig {
                name: "my-resource".to_string(),
                size: 10,
            },
        )
    }

    #[test]
    fn test_resource_id() {
        assert_eq!(stub().id(), "resource:test_stub_my-resource");
    }

    #[test]
    fn test_resource_defaults_to_draft() {
        let resource = stub();
        assert_eq!(resource.lifecycle_state, LifecycleState::Draft);
        assert!(resource.outputs.is_none());
        assert!(resource.dependencies.is_empty());
    }

    #[test]
    fn test_config_forbids_extra_fields() {
        let result: Result<StubConfig, _> =
            serde_json::from_value(json!({"name": "test", "size": 10, "unknown_field": "bad"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_resource_deserializes_api_shape() {
        let resource: Resource<StubConfig, StubOutputs> = serde_json::from_value(json!({
            "name": "db1",
            "config": {"name": "db1"},
            "lifecycle_state": "ready"
        }))
        .unwrap();

        assert_eq!(resource.name, "db1");
        assert_eq!(resource.config.size, 10);
        assert_eq!(resource.lifecycle_state, LifecycleState::Ready);
    }

    #[test]
    fn test_resource_deserializes_outputs_without_default() {
        let resource: Resource<StubConfig, StubOutputs> = serde_json::from_value(json!({
            "name": "db1",
            "config": {"name": "db1"},
            "outputs": {"url": "postgres://db1"},
            "lifecycle_state": "ready"
        }))
        .unwrap();

        assert_eq!(
            resource.outputs,
            Some(StubOutputs {
                url: "postgres://db1".to_string()
            })
        );
    }

    #[test]
    fn test_transition_follows_lifecycle() {
        let mut resource = stub();
        resource.transition(LifecycleState::Pending).unwrap();
        resource.transition(LifecycleState::Processing).unwrap();
        resource.transition(LifecycleState::Ready).unwrap();
        assert!(resource.updated_at.is_some());

        let err = resource.transition(LifecycleState::Failed).unwrap_err();
        assert!(matches!(err, ProviderError::FailedPrecondition(_)));
        assert_eq!(resource.lifecycle_state, LifecycleState::Ready);
    }

    #[tokio::test]
    async fn test_default_hooks_are_unimplemented() {
        let resource = stub();
        let err = Bare.on_create(&resource).await.unwrap_err();
        assert_eq!(err.message(), "Bare must implement on_create()");

        let err = Bare.on_update(&resource, &resource.config).await.unwrap_err();
        assert_eq!(err.message(), "Bare must implement on_update()");

        let err = Bare.on_delete(&resource).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unimplemented(_)));
    }
}
