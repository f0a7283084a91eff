//! References between resources.
//!
//! A config can point at another resource in two ways:
//!
//! - [`Field<T>`] holds either a literal value or a [`FieldReference`] to one
//!   output field of another resource. The runtime substitutes the value
//!   before handlers run.
//! - [`Dependency<R>`] names a whole resource. The runtime injects the
//!   resolved instance, which handlers read with [`Dependency::resolve`].

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::models::format_resource_id;

/// Key that marks a serialized [`Dependency`].
pub const DEPENDENCY_MARKER: &str = "__dependency__";

/// Reference to another resource for dependency tracking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ResourceReference {
    /// Provider name.
    pub provider: String,
    /// Resource type name.
    pub resource: String,
    /// Resource instance name.
    pub name: String,
}

impl ResourceReference {
    /// Create a reference.
    pub fn new(
        provider: impl Into<String>,
        resource: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            resource: resource.into(),
            name: name.into(),
        }
    }

    /// ID of the referenced resource.
    pub fn id(&self) -> String {
        format_resource_id(&self.provider, &self.resource, &self.name)
    }
}

/// Reference to one output field of another resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FieldReference {
    /// Provider name.
    pub provider: String,
    /// Resource type name.
    pub resource: String,
    /// Resource instance name.
    pub name: String,
    /// Dotted path of the field, e.g. `outputs.connection_url`.
    pub field: String,
}

impl FieldReference {
    /// Create a field reference.
    pub fn new(
        provider: impl Into<String>,
        resource: impl Into<String>,
        name: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            resource: resource.into(),
            name: name.into(),
            field: field.into(),
        }
    }

    /// ID of the referenced resource.
    pub fn id(&self) -> String {
        format_resource_id(&self.provider, &self.resource, &self.name)
    }

    /// The resource part of this reference, without the field.
    pub fn reference(&self) -> ResourceReference {
        ResourceReference::new(&self.provider, &self.resource, &self.name)
    }
}

/// Config field that accepts a direct value or a [`FieldReference`].
///
/// The reference form is tried first, so a map that is exactly a field
/// reference never lands in `T`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Field<T> {
    /// Reference resolved by the runtime.
    Reference(FieldReference),
    /// Literal value.
    Value(T),
}

impl<T> Field<T> {
    /// The literal value, if this is not a reference.
    pub fn as_value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Reference(_) => None,
        }
    }

    /// The reference, if this is not a literal.
    pub fn as_reference(&self) -> Option<&FieldReference> {
        match self {
            Self::Reference(r) => Some(r),
            Self::Value(_) => None,
        }
    }

    /// Whether the value still has to be resolved by the runtime.
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Reference(_))
    }
}

impl<T> From<T> for Field<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

/// Typed dependency on another resource for whole-instance access.
///
/// `R` is the type of the resolved instance, typically
/// [`Resource<C, O>`](crate::resource::Resource). The resolved value is never
/// serialized.
///
/// ```
/// use pragma_sdk::references::Dependency;
///
/// let dep: Dependency<serde_json::Value> = Dependency::new("postgres", "database", "main");
/// assert_eq!(dep.id(), "resource:postgres_database_main");
/// assert!(dep.resolve().is_err());
/// ```
#[derive(Serialize, Deserialize)]
pub struct Dependency<R> {
    #[serde(rename = "__dependency__", default = "marker_default")]
    dependency_marker: bool,
    /// Provider name.
    pub provider: String,
    /// Resource type name.
    pub resource: String,
    /// Resource instance name.
    pub name: String,
    #[serde(skip, default = "Option::default")]
    resolved: Option<Arc<R>>,
}

fn marker_default() -> bool {
    true
}

impl<R> Dependency<R> {
    /// Create an unresolved dependency.
    pub fn new(
        provider: impl Into<String>,
        resource: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            dependency_marker: true,
            provider: provider.into(),
            resource: resource.into(),
            name: name.into(),
            resolved: None,
        }
    }

    /// ID of the referenced resource.
    pub fn id(&self) -> String {
        format_resource_id(&self.provider, &self.resource, &self.name)
    }

    /// The referenced resource as a plain reference.
    pub fn reference(&self) -> ResourceReference {
        ResourceReference::new(&self.provider, &self.resource, &self.name)
    }

    /// Get the resolved resource instance.
    ///
    /// The runtime injects resolved dependencies before calling lifecycle
    /// handlers. Fails when the dependent resource was not ready yet.
    pub fn resolve(&self) -> Result<&R, ProviderError> {
        self.resolved
            .as_deref()
            .ok_or_else(|| ProviderError::DependencyNotResolved(self.id()))
    }

    /// Whether the runtime has injected the instance.
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    /// Inject the resolved instance.
    pub fn set_resolved(&mut self, instance: R) {
        self.resolved = Some(Arc::new(instance));
    }

    /// Builder form of [`Dependency::set_resolved`].
    pub fn with_resolved(mut self, instance: R) -> Self {
        self.set_resolved(instance);
        self
    }
}

impl<R> Clone for Dependency<R> {
    fn clone(&self) -> Self {
        Self {
            dependency_marker: self.dependency_marker,
            provider: self.provider.clone(),
            resource: self.resource.clone(),
            name: self.name.clone(),
            resolved: self.resolved.clone(),
        }
    }
}

impl<R> fmt::Debug for Dependency<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("id", &self.id())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl<R> PartialEq for Dependency<R> {
    fn eq(&self, other: &Self) -> bool {
        self.provider == other.provider
            && self.resource == other.resource
            && self.name == other.name
    }
}

/// Wire shape of a dependency, used for its schema.
#[derive(JsonSchema)]
#[allow(dead_code)]
struct DependencyMarker {
    #[schemars(rename = "__dependency__")]
    dependency_marker: bool,
    provider: String,
    resource: String,
    name: String,
}

impl<R> JsonSchema for Dependency<R> {
    fn schema_name() -> Cow<'static, str> {
        "Dependency".into()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        DependencyMarker::json_schema(generator)
    }
}

/// Check if a value is a serialized [`Dependency`] marker.
///
/// True for an object carrying `__dependency__: true` plus `provider`,
/// `resource` and `name`, whether or not the runtime added more keys.
pub fn is_dependency_marker(value: &serde_json::Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    let has_keys = ["provider", "resource", "name"]
        .iter()
        .all(|key| obj.contains_key(*key));
    has_keys && obj.get(DEPENDENCY_MARKER) == Some(&serde_json::Value::Bool(true))
}
