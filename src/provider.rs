//! Provider registry and event dispatch.
//!
//! A [`Provider`] is a named set of resource types. Registering a handler
//! returns a [`ResourceType`] handle bound to the provider and resource
//! names; the provider keeps a type-erased copy so the runtime can route
//! [`LifecycleEvent`]s by name and extract schemas without knowing the
//! concrete types.
//!
//! # Example
//!
//! ```ignore
//! let mut provider = Provider::new("postgres");
//! let database = provider.register("database", DatabaseHandler::new())?;
//! assert_eq!(database.id("main"), "resource:postgres_database_main");
//!
//! let response = provider.dispatch(event).await;
//! ```

use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::context::{with_runtime_context, RuntimeContext};
use crate::error::ProviderError;
use crate::models::{
    format_resource_id, EventType, LifecycleEvent, LifecycleState, ProviderResponse,
    ResourceDefinition, ResponseStatus,
};
use crate::resource::{Resource, ResourceHandler, ResourceOf};
use crate::schema::{config_schema, outputs_schema, ResourceSchema};
use crate::validation::{format_diagnostics, validate};

/// A resource type registered on a provider.
///
/// Cheap to clone; clones share the handler.
pub struct ResourceType<H> {
    provider: String,
    resource: String,
    handler: Arc<H>,
}

impl<H> Clone for ResourceType<H> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            resource: self.resource.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<H: ResourceHandler> ResourceType<H> {
    /// Provider name.
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Resource type name.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// The lifecycle handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// ID of the instance called `name`.
    pub fn id(&self, name: &str) -> String {
        format_resource_id(&self.provider, &self.resource, name)
    }

    /// A draft instance of this type.
    pub fn instance(&self, name: impl Into<String>, config: H::Config) -> ResourceOf<H> {
        Resource::new(&self.provider, &self.resource, name, config)
    }

    /// Schema entry for this type.
    pub fn schema(&self) -> ResourceSchema {
        ResourceSchema {
            provider: self.provider.clone(),
            resource: self.resource.clone(),
            config_schema: config_schema::<H::Config>(),
            outputs_schema: outputs_schema::<H::Outputs>(),
        }
    }
}

impl<H> fmt::Debug for ResourceType<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceType")
            .field("provider", &self.provider)
            .field("resource", &self.resource)
            .finish()
    }
}

/// Object-safe view of a [`ResourceType`].
#[async_trait::async_trait]
trait ErasedResource: Send + Sync {
    fn handler_type(&self) -> TypeId;
    fn schema(&self) -> ResourceSchema;
    fn description(&self) -> Option<String>;
    async fn handle(&self, event: &LifecycleEvent) -> Result<Option<Value>, ProviderError>;
}

#[async_trait::async_trait]
impl<H: ResourceHandler> ErasedResource for ResourceType<H> {
    fn handler_type(&self) -> TypeId {
        TypeId::of::<H>()
    }

    fn schema(&self) -> ResourceSchema {
        ResourceType::schema(self)
    }

    fn description(&self) -> Option<String> {
        self.handler.description()
    }

    async fn handle(&self, event: &LifecycleEvent) -> Result<Option<Value>, ProviderError> {
        let schema = config_schema::<H::Config>();
        let diagnostics = validate(&schema, &event.config);
        if !diagnostics.is_empty() {
            return Err(ProviderError::Validation(format_diagnostics(&diagnostics)));
        }

        let config: H::Config = serde_json::from_value(event.config.clone())?;
        let mut resource = self.instance(&event.name, config);
        if let Some(outputs) = &event.current_outputs {
            resource.outputs = Some(serde_json::from_value(outputs.clone())?);
        }
        resource.transition(LifecycleState::Pending)?;
        resource.transition(LifecycleState::Processing)?;

        match event.event_type {
            EventType::Create => {
                let outputs = self.handler.on_create(&resource).await?;
                Ok(Some(serde_json::to_value(outputs)?))
            },
            EventType::Update => {
                let previous = event.previous_config.clone().ok_or_else(|| {
                    ProviderError::Validation(format!(
                        "UPDATE event {} has no previous_config",
                        event.event_id
                    ))
                })?;
                let previous: H::Config = serde_json::from_value(previous)?;
                let outputs = self.handler.on_update(&resource, &previous).await?;
                Ok(Some(serde_json::to_value(outputs)?))
            },
            EventType::Delete => {
                self.handler.on_delete(&resource).await?;
                Ok(None)
            },
        }
    }
}

/// A named collection of resource types.
pub struct Provider {
    name: String,
    resources: BTreeMap<String, Arc<dyn ErasedResource>>,
}

impl Provider {
    /// Create an empty provider.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: BTreeMap::new(),
        }
    }

    /// Provider name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register `handler` as resource type `resource`.
    ///
    /// Fails if the name is already taken on this provider.
    pub fn register<H: ResourceHandler>(
        &mut self,
        resource: impl Into<String>,
        handler: H,
    ) -> Result<ResourceType<H>, ProviderError> {
        let resource = resource.into();
        if self.resources.contains_key(&resource) {
            return Err(ProviderError::DuplicateResource {
                provider: self.name.clone(),
                resource,
            });
        }

        let resource_type = ResourceType {
            provider: self.name.clone(),
            resource: resource.clone(),
            handler: Arc::new(handler),
        };
        debug!(provider = %self.name, resource = %resource, "registered resource type");
        self.resources
            .insert(resource, Arc::new(resource_type.clone()));
        Ok(resource_type)
    }

    /// Registered resource type names, sorted.
    pub fn resources(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    /// Whether a resource type called `resource` is registered.
    pub fn contains(&self, resource: &str) -> bool {
        self.resources.contains_key(resource)
    }

    /// Whether a handler of type `H` is registered under any name.
    pub fn is_registered<H: ResourceHandler>(&self) -> bool {
        let wanted = TypeId::of::<H>();
        self.resources.values().any(|r| r.handler_type() == wanted)
    }

    /// Number of registered resource types.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Schemas of all registered resource types, sorted by resource name.
    pub fn schemas(&self) -> Vec<ResourceSchema> {
        self.resources.values().map(|r| r.schema()).collect()
    }

    /// Definitions of all registered resource types, with config schemas.
    pub fn definitions(&self) -> Vec<ResourceDefinition> {
        self.resources
            .values()
            .map(|r| {
                let schema = r.schema();
                ResourceDefinition {
                    provider: schema.provider,
                    resource: schema.resource,
                    schema: Some(schema.config_schema),
                    description: r.description(),
                    tags: None,
                    created_at: None,
                    updated_at: None,
                }
            })
            .collect()
    }

    /// Run the hook for `event` and report the outcome.
    ///
    /// Never fails: unknown resource types, invalid configs and handler
    /// errors all become a `failure` response.
    #[instrument(
        skip(self, event),
        name = "provider.dispatch",
        fields(provider = %self.name, resource = %event.resource, event_type = %event.event_type)
    )]
    pub async fn dispatch(&self, event: LifecycleEvent) -> ProviderResponse {
        debug!(event_id = %event.event_id, name = %event.name, "dispatching event");

        let outcome = match self.resources.get(&event.resource) {
            Some(resource_type) if event.provider == self.name => {
                resource_type.handle(&event).await
            },
            _ => Err(ProviderError::UnknownResource(format!(
                "{}/{}",
                event.provider, event.resource
            ))),
        };

        let (status, outputs, error) = match outcome {
            Ok(outputs) => {
                info!(event_id = %event.event_id, "event handled");
                (ResponseStatus::Success, outputs, None)
            },
            Err(e) => {
                warn!(event_id = %event.event_id, error = %e, "event failed");
                (ResponseStatus::Failure, None, Some(e.to_string()))
            },
        };

        ProviderResponse {
            resource_id: event.resource_id(),
            event_id: event.event_id,
            event_type: event.event_type,
            tenant_id: event.tenant_id,
            status,
            outputs,
            error,
            timestamp: Utc::now(),
        }
    }

    /// Like [`Provider::dispatch`], with `context` available to the handler
    /// through [`wait_for_resource_state`](crate::context::wait_for_resource_state).
    pub async fn dispatch_with_context(
        &self,
        event: LifecycleEvent,
        context: Arc<dyn RuntimeContext>,
    ) -> ProviderResponse {
        with_runtime_context(context, self.dispatch(event)).await
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name)
            .field("resources", &self.resources())
            .finish()
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.resources().join(", "))
    }
}

/// Collect resource definitions from several providers.
///
/// Keyed by `(provider, resource)`. If two providers share a name, the later
/// one wins for overlapping resource names.
pub fn discover_resources(providers: &[&Provider]) -> BTreeMap<(String, String), ResourceDefinition> {
    let mut found = BTreeMap::new();
    for provider in providers {
        for definition in provider.definitions() {
            let key = (definition.provider.clone(), definition.resource.clone());
            if found.insert(key, definition).is_some() {
                warn!(provider = %provider.name(), "resource type discovered twice, keeping the last");
            }
        }
    }
    found
}
