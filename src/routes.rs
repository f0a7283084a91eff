//! Paths, query strings and response envelopes shared by both clients.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::ClientError;
use crate::models::format_resource_id;

/// Multipart field carrying the provider tarball.
pub(crate) const PUSH_FIELD: &str = "code";

/// An API path, kept as raw segments so ids are percent-encoded when joined
/// onto the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Route {
    segments: Vec<String>,
}

impl Route {
    fn new(segments: &[&str]) -> Self {
        Self {
            segments: segments.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Append the segments to the path of `base`.
    ///
    /// `base` must come from [`parse_base`].
    pub(crate) fn url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(&self.segments);
        }
        url
    }
}

pub(crate) fn health() -> Route {
    Route::new(&["health"])
}

pub(crate) fn resources() -> Route {
    Route::new(&["resources", ""])
}

pub(crate) fn apply() -> Route {
    Route::new(&["resources", "apply"])
}

pub(crate) fn resource(provider: &str, resource: &str, name: &str) -> Route {
    Route::new(&["resources", &format_resource_id(provider, resource, name)])
}

pub(crate) fn providers() -> Route {
    Route::new(&["providers", ""])
}

pub(crate) fn provider(id: &str) -> Route {
    Route::new(&["providers", id])
}

pub(crate) fn push(id: &str) -> Route {
    Route::new(&["providers", id, "push"])
}

pub(crate) fn builds(id: &str) -> Route {
    Route::new(&["providers", id, "builds"])
}

pub(crate) fn build(id: &str, version: &str) -> Route {
    Route::new(&["providers", id, "builds", version])
}

pub(crate) fn deploy(id: &str) -> Route {
    Route::new(&["providers", id, "deploy"])
}

pub(crate) fn rollback(id: &str) -> Route {
    Route::new(&["providers", id, "rollback"])
}

pub(crate) fn deployment(id: &str) -> Route {
    Route::new(&["providers", id, "deployment"])
}

pub(crate) fn me() -> Route {
    Route::new(&["auth", "me"])
}

pub(crate) fn dead_letter() -> Route {
    Route::new(&["ops", "dead-letter"])
}

pub(crate) fn dead_letter_retry_all() -> Route {
    Route::new(&["ops", "dead-letter", "retry-all"])
}

pub(crate) fn dead_letter_event(id: &str) -> Route {
    Route::new(&["ops", "dead-letter", id])
}

pub(crate) fn dead_letter_retry(id: &str) -> Route {
    Route::new(&["ops", "dead-letter", id, "retry"])
}

/// Parse the configured API base URL.
pub(crate) fn parse_base(base_url: &str) -> Result<Url, ClientError> {
    let url = Url::parse(base_url)?;
    if url.cannot_be_a_base() {
        return Err(ClientError::InvalidArgument(format!(
            "{} cannot be used as an API base URL",
            base_url
        )));
    }
    Ok(url)
}

/// Provider and resource type a resource response belongs to.
///
/// The API leaves `provider` and `resource` out of resource payloads; they are
/// filled in from the request before decoding so typed records get a
/// correct [`id`](crate::resource::Resource::id).
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ResourceScope<'a> {
    pub provider: Option<&'a str>,
    pub resource: Option<&'a str>,
}

impl<'a> ResourceScope<'a> {
    pub(crate) fn new(provider: &'a str, resource: &'a str) -> Self {
        Self {
            provider: Some(provider),
            resource: Some(resource),
        }
    }

    pub(crate) fn of_filter(filter: &'a ResourceFilter) -> Self {
        Self {
            provider: filter.provider.as_deref(),
            resource: filter.resource.as_deref(),
        }
    }

    /// Scope of an outgoing resource body.
    pub(crate) fn of_body(body: &'a Value) -> Self {
        Self {
            provider: body.get("provider").and_then(Value::as_str),
            resource: body.get("resource").and_then(Value::as_str),
        }
    }

    fn fill(&self, value: &mut Value) {
        match value {
            Value::Array(items) => items.iter_mut().for_each(|item| self.fill(item)),
            Value::Object(obj) => {
                for (key, scope) in [("provider", self.provider), ("resource", self.resource)] {
                    if let Some(scope) = scope {
                        obj.entry(key)
                            .or_insert_with(|| Value::String(scope.to_string()));
                    }
                }
            },
            _ => {},
        }
    }

    /// Decode a resource (or list of resources), filling missing scope keys.
    pub(crate) fn decode<T: DeserializeOwned>(&self, body: &[u8]) -> Result<T, ClientError> {
        let mut value: Value = serde_json::from_slice(body)?;
        self.fill(&mut value);
        Ok(serde_json::from_value(value)?)
    }
}

/// Serialize an outgoing resource body.
pub(crate) fn resource_body<B: Serialize + ?Sized>(body: &B) -> Result<Value, ClientError> {
    serde_json::to_value(body).map_err(|e| {
        ClientError::InvalidArgument(format!("resource body cannot be serialized: {}", e))
    })
}

/// Filter for listing resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceFilter {
    /// Only resources of this provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Only resources of this type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

impl ResourceFilter {
    /// Filter by provider.
    pub fn provider(provider: impl Into<String>) -> Self {
        Self {
            provider: Some(provider.into()),
            resource: None,
        }
    }

    /// Also filter by resource type.
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct DeployRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CascadeQuery {
    pub cascade: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProviderQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<&'a str>,
}

/// Query for a bulk dead letter delete.
#[derive(Debug, Serialize)]
pub(crate) struct DeleteDeadLetterQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub all: bool,
}

impl<'a> DeleteDeadLetterQuery<'a> {
    /// A provider filter, or `all`; refuses to build an unscoped delete.
    pub(crate) fn new(provider: Option<&'a str>, all: bool) -> Result<Self, ClientError> {
        if provider.is_none() && !all {
            return Err(ClientError::InvalidArgument(
                "Must specify either provider or all=true".to_string(),
            ));
        }
        Ok(Self { provider, all })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RetriedCount {
    pub retried_count: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeletedCount {
    pub deleted_count: u64,
}

/// Build the error for a non-success response.
///
/// FastAPI-style bodies carry the message in `detail`; anything else is
/// reported verbatim.
pub(crate) fn status_error(status: u16, url: String, body: &str) -> ClientError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| match v.get("detail") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        })
        .unwrap_or_else(|| body.to_string());
    ClientError::Status { status, url, detail }
}

/// Decode a JSON body, mapping failures to [`ClientError::Decode`].
pub(crate) fn decode<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ClientError> {
    Ok(serde_json::from_slice(body)?)
}
