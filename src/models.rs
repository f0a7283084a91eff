//! Records exchanged with the Pragma API.
//!
//! These mirror the server-side contracts. Optional fields default when the
//! server omits them so older API versions keep deserializing.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resource lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Declared but not yet submitted.
    #[default]
    Draft,
    /// Submitted and waiting for the provider.
    Pending,
    /// A lifecycle handler is running.
    Processing,
    /// The last lifecycle event succeeded.
    Ready,
    /// The last lifecycle event failed.
    Failed,
}

impl LifecycleState {
    /// Wire name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// `draft -> pending -> processing -> ready | failed`, and a settled
    /// resource (`ready` or `failed`) may be queued again.
    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Draft, Pending)
                | (Pending, Processing)
                | (Processing, Ready)
                | (Processing, Failed)
                | (Ready, Pending)
                | (Failed, Pending)
        )
    }

    /// Whether no handler is running or queued for the resource.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a provider build job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    /// Queued.
    Pending,
    /// Image build in progress.
    Building,
    /// Image built.
    Success,
    /// Build failed; see [`BuildInfo::error_message`].
    Failed,
}

/// Status of a provider deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    /// Not yet scheduled.
    Pending,
    /// Rolling out.
    Progressing,
    /// Serving.
    Available,
    /// Rollout failed.
    Failed,
}

/// Result of pushing provider code to start a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushResult {
    /// CalVer version of the build (`YYYYMMDD.HHMMSS`).
    pub version: String,
    /// Initial build status, usually `pending`.
    pub status: BuildStatus,
    /// Status message from the API.
    pub message: String,
}

/// Build information for a provider version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    /// Provider identifier.
    pub provider_id: String,
    /// CalVer version string.
    pub version: String,
    /// Current build status.
    pub status: BuildStatus,
    /// Set when the build failed.
    #[serde(default)]
    pub error_message: Option<String>,
    /// When the build was created.
    pub created_at: DateTime<Utc>,
}

/// Result of a deploy or rollback, including internal deployment details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentResult {
    /// Name of the underlying deployment object.
    pub deployment_name: String,
    /// Current deployment status.
    pub status: DeploymentStatus,
    /// Number of available replicas.
    #[serde(default)]
    pub available_replicas: u32,
    /// Number of ready replicas.
    #[serde(default)]
    pub ready_replicas: u32,
    /// Deployed version.
    #[serde(default)]
    pub version: Option<String>,
    /// Container image reference.
    #[serde(default)]
    pub image: Option<String>,
    /// Last update timestamp.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Status message or error details.
    #[serde(default)]
    pub message: Option<String>,
}

/// User-facing provider deployment status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    /// Current deployment status.
    pub status: DeploymentStatus,
    /// Deployed version.
    #[serde(default)]
    pub version: Option<String>,
    /// Last update timestamp.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Available with at least one ready replica.
    #[serde(default)]
    pub healthy: bool,
}

impl From<DeploymentResult> for ProviderStatus {
    fn from(result: DeploymentResult) -> Self {
        let healthy = result.status == DeploymentStatus::Available && result.ready_replicas > 0;
        Self {
            status: result.status,
            version: result.version,
            updated_at: result.updated_at,
            healthy,
        }
    }
}

/// Provider entry from the list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider identifier.
    pub provider_id: String,
    /// Version of the deployed build, if ever deployed.
    #[serde(default)]
    pub current_version: Option<String>,
    /// Deployment status, if deployed.
    #[serde(default)]
    pub deployment_status: Option<DeploymentStatus>,
    /// Last provider update.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Result of deleting a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDeleteResult {
    /// Provider that was deleted.
    pub provider_id: String,
    /// Whether the running deployment was removed.
    #[serde(default)]
    pub deployment_deleted: bool,
    /// Number of resources deleted by a cascading delete.
    #[serde(default)]
    pub resources_deleted: u64,
}

/// The authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// User identifier.
    pub user_id: String,
    /// Primary email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Organization identifier.
    pub organization_id: String,
    /// Organization display name.
    #[serde(default)]
    pub organization_name: Option<String>,
}

/// Resource lifecycle event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    /// Resource creation.
    Create,
    /// Resource update.
    Update,
    /// Resource deletion.
    Delete,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        })
    }
}

/// Outcome reported by a provider for a lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// The handler completed.
    Success,
    /// The handler failed; see [`ProviderResponse::error`].
    Failure,
}

/// A lifecycle event delivered to a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Event identifier, echoed in the response.
    pub event_id: String,
    /// What to do with the resource.
    pub event_type: EventType,
    /// Tenant that owns the resource.
    pub tenant_id: String,
    /// Provider name.
    pub provider: String,
    /// Resource type name.
    pub resource: String,
    /// Resource instance name.
    pub name: String,
    /// Desired configuration.
    pub config: serde_json::Value,
    /// Configuration before an update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_config: Option<serde_json::Value>,
    /// Outputs produced by the previous successful event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_outputs: Option<serde_json::Value>,
}

impl LifecycleEvent {
    /// ID of the resource the event targets.
    pub fn resource_id(&self) -> String {
        format_resource_id(&self.provider, &self.resource, &self.name)
    }
}

/// Provider response reporting the outcome of a lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Event this responds to.
    pub event_id: String,
    /// Type of that event.
    pub event_type: EventType,
    /// Target resource ID.
    pub resource_id: String,
    /// Tenant that owns the resource.
    pub tenant_id: String,
    /// Outcome.
    pub status: ResponseStatus,
    /// Outputs on success (absent for deletes).
    #[serde(default)]
    pub outputs: Option<serde_json::Value>,
    /// Error message on failure.
    #[serde(default)]
    pub error: Option<String>,
    /// When the response was produced.
    pub timestamp: DateTime<Utc>,
}

/// Metadata about a registered resource type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    /// Provider name.
    pub provider: String,
    /// Resource type name.
    pub resource: String,
    /// JSON Schema of the resource config.
    #[serde(rename = "schema", default)]
    pub schema: Option<serde_json::Value>,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Registration time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ResourceDefinition {
    /// Unique definition ID: `resource_definition:{provider}_{resource}`.
    pub fn id(&self) -> String {
        format!("resource_definition:{}_{}", self.provider, self.resource)
    }
}

/// Format a unique resource ID: `resource:{provider}_{resource}_{name}`.
pub fn format_resource_id(provider: &str, resource: &str, name: &str) -> String {
    format!("resource:{}_{}_{}", provider, resource, name)
}
