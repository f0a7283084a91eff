//! Testing utilities for resource handlers.
//!
//! [`ProviderHarness`] runs lifecycle hooks in-process, without the platform
//! runtime or a message broker. Every invocation is recorded so tests can
//! assert on what was sent and what came back.
//!
//! # Example
//!
//! ```ignore
//! use pragma_sdk::testing::{assert_succeeded, ProviderHarness};
//!
//! #[tokio::test]
//! async fn test_create_database() {
//!     let mut provider = Provider::new("postgres");
//!     let database = provider.register("database", DatabaseHandler).unwrap();
//!
//!     let mut harness = ProviderHarness::new();
//!     let result = harness
//!         .invoke_create(&database, "main", DatabaseConfig { size: 10 })
//!         .await;
//!
//!     assert_succeeded(&result);
//!     assert_eq!(result.outputs.unwrap().port, 5432);
//! }
//! ```

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::{with_runtime_context, RuntimeContext};
use crate::error::ProviderError;
use crate::models::{EventType, LifecycleEvent, LifecycleState};
use crate::provider::ResourceType;
use crate::resource::{Resource, ResourceHandler, ResourceOf};
use crate::validation::{validate, Diagnostic, DiagnosticSeverity};

/// Tenant recorded on harness events.
pub const TEST_TENANT: &str = "test-tenant";

/// Outcome of one harness invocation.
#[derive(Debug, Clone)]
pub struct LifecycleResult<C, O> {
    /// The event that was recorded.
    pub event: LifecycleEvent,
    /// The resource as the hook saw it, left in `processing`.
    pub resource: Resource<C, O>,
    /// Outputs of a successful create or update.
    pub outputs: Option<O>,
    /// Error message of a failed hook, or of outputs that could not be
    /// serialized.
    pub error: Option<String>,
}

impl<C, O> LifecycleResult<C, O> {
    /// Whether the hook succeeded.
    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    /// Whether the hook failed.
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Untyped record of a [`LifecycleResult`], kept in the harness history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedResult {
    /// Event ID.
    pub event_id: String,
    /// Resource ID.
    pub resource_id: String,
    /// Event type.
    pub event_type: EventType,
    /// Outputs as JSON.
    pub outputs: Option<Value>,
    /// Error message.
    pub error: Option<String>,
}

impl RecordedResult {
    /// Whether the hook succeeded.
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// Invokes lifecycle hooks locally and records every call.
#[derive(Default)]
pub struct ProviderHarness {
    events: Vec<LifecycleEvent>,
    results: Vec<RecordedResult>,
    context: Option<Arc<dyn RuntimeContext>>,
    next_event: u64,
}

impl ProviderHarness {
    /// Create an empty harness.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a runtime context for the hooks, so handlers calling
    /// [`wait_for_resource_state`](crate::context::wait_for_resource_state)
    /// can be tested.
    pub fn with_context(mut self, context: Arc<dyn RuntimeContext>) -> Self {
        self.context = Some(context);
        self
    }

    /// Events sent so far, oldest first.
    pub fn events(&self) -> &[LifecycleEvent] {
        &self.events
    }

    /// Results so far, oldest first.
    pub fn results(&self) -> &[RecordedResult] {
        &self.results
    }

    /// Forget all recorded events and results.
    pub fn clear(&mut self) {
        self.events.clear();
        self.results.clear();
    }

    /// Run `on_create`.
    pub async fn invoke_create<H: ResourceHandler>(
        &mut self,
        resource_type: &ResourceType<H>,
        name: &str,
        config: H::Config,
    ) -> LifecycleResult<H::Config, H::Outputs> {
        self.invoke(resource_type, EventType::Create, name, config, None, None)
            .await
    }

    /// Run `on_update` with the previous config and current outputs.
    pub async fn invoke_update<H: ResourceHandler>(
        &mut self,
        resource_type: &ResourceType<H>,
        name: &str,
        config: H::Config,
        previous_config: H::Config,
        current_outputs: Option<H::Outputs>,
    ) -> LifecycleResult<H::Config, H::Outputs> {
        self.invoke(
            resource_type,
            EventType::Update,
            name,
            config,
            Some(previous_config),
            current_outputs,
        )
        .await
    }

    /// Run `on_delete`.
    pub async fn invoke_delete<H: ResourceHandler>(
        &mut self,
        resource_type: &ResourceType<H>,
        name: &str,
        config: H::Config,
    ) -> LifecycleResult<H::Config, H::Outputs> {
        self.invoke(resource_type, EventType::Delete, name, config, None, None)
            .await
    }

    /// Validate a raw config against the resource type's schema.
    pub fn validate_config<H: ResourceHandler>(
        &self,
        resource_type: &ResourceType<H>,
        config: &Value,
    ) -> Result<(), TestError> {
        check_diagnostics(validate(&resource_type.schema().config_schema, config))
    }

    async fn invoke<H: ResourceHandler>(
        &mut self,
        resource_type: &ResourceType<H>,
        event_type: EventType,
        name: &str,
        config: H::Config,
        previous_config: Option<H::Config>,
        current_outputs: Option<H::Outputs>,
    ) -> LifecycleResult<H::Config, H::Outputs> {
        self.next_event += 1;
        let mut encode_failure = None;
        let event = LifecycleEvent {
            event_id: format!("test-event-{}", self.next_event),
            event_type,
            tenant_id: TEST_TENANT.to_string(),
            provider: resource_type.provider().to_string(),
            resource: resource_type.resource().to_string(),
            name: name.to_string(),
            config: to_json(&config, &mut encode_failure),
            previous_config: previous_config
                .as_ref()
                .map(|c| to_json(c, &mut encode_failure)),
            current_outputs: current_outputs
                .as_ref()
                .map(|o| to_json(o, &mut encode_failure)),
        };
        debug!(event_id = %event.event_id, %event_type, resource_id = %event.resource_id(), "invoking hook");
        self.events.push(event.clone());

        let mut resource = resource_type.instance(name, config);
        resource.outputs = current_outputs;

        let ready = match encode_failure {
            Some(e) => Err(e),
            None => start_processing(&mut resource),
        };
        let outcome = match ready {
            Ok(()) => {
                let hook = run_hook(
                    resource_type.handler(),
                    event_type,
                    &resource,
                    previous_config.as_ref(),
                );
                match &self.context {
                    Some(ctx) => with_runtime_context(Arc::clone(ctx), hook).await,
                    None => hook.await,
                }
            },
            Err(e) => Err(e),
        };

        let (outputs, mut error) = match outcome {
            Ok(outputs) => (outputs, None),
            Err(e) => {
                warn!(event_id = %event.event_id, error = %e, "hook failed");
                (None, Some(e.to_string()))
            },
        };

        let mut encode_failure = None;
        let recorded_outputs = outputs
            .as_ref()
            .map(|o| to_json(o, &mut encode_failure))
            .filter(|_| encode_failure.is_none());
        if let Some(e) = encode_failure {
            warn!(event_id = %event.event_id, error = %e, "hook outputs cannot be recorded");
            error = Some(e.to_string());
        }

        self.results.push(RecordedResult {
            event_id: event.event_id.clone(),
            resource_id: event.resource_id(),
            event_type,
            outputs: recorded_outputs,
            error: error.clone(),
        });

        LifecycleResult {
            event,
            resource,
            outputs,
            error,
        }
    }
}

/// Serialize `value`, keeping the first failure in `failure`.
fn to_json<T: Serialize>(value: &T, failure: &mut Option<ProviderError>) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        failure.get_or_insert(ProviderError::Serialization(e));
        Value::Null
    })
}

fn start_processing<C, O>(resource: &mut Resource<C, O>) -> Result<(), ProviderError> {
    resource.transition(LifecycleState::Pending)?;
    resource.transition(LifecycleState::Processing)
}

async fn run_hook<H: ResourceHandler>(
    handler: &H,
    event_type: EventType,
    resource: &ResourceOf<H>,
    previous_config: Option<&H::Config>,
) -> Result<Option<H::Outputs>, ProviderError> {
    match (event_type, previous_config) {
        (EventType::Create, _) => handler.on_create(resource).await.map(Some),
        (EventType::Update, Some(previous)) => handler.on_update(resource, previous).await.map(Some),
        (EventType::Update, None) => Err(ProviderError::Validation(
            "update requires previous_config".to_string(),
        )),
        (EventType::Delete, _) => handler.on_delete(resource).await.map(|()| None),
    }
}

/// Error type for harness checks that fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The check failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The check failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Validation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a hook succeeded.
///
/// # Panics
///
/// Panics with the hook's error if it failed.
pub fn assert_succeeded<C, O>(result: &LifecycleResult<C, O>) {
    if let Some(error) = &result.error {
        panic!(
            "Expected {} of {} to succeed, but it failed: {}",
            result.event.event_type,
            result.event.resource_id(),
            error
        );
    }
}

/// Assert that a hook failed with an error containing `needle`.
///
/// # Panics
///
/// Panics if the hook succeeded or failed with another error.
pub fn assert_failed_with<C, O>(result: &LifecycleResult<C, O>, needle: &str) {
    match &result.error {
        None => panic!(
            "Expected {} of {} to fail with '{}', but it succeeded",
            result.event.event_type,
            result.event.resource_id(),
            needle
        ),
        Some(error) => assert!(
            error.contains(needle),
            "Expected error containing '{}', got: {}",
            needle,
            error
        ),
    }
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics.iter().filter(|d| d.is_error()).collect();
    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain an error mentioning `attribute`.
///
/// # Panics
///
/// Panics if no error diagnostic points at the attribute.
pub fn assert_error_at(diagnostics: &[Diagnostic], attribute: &str) {
    let found = diagnostics.iter().any(|d| {
        d.severity == DiagnosticSeverity::Error && d.attribute.as_deref() == Some(attribute)
    });
    assert!(
        found,
        "Expected an error at '{}', got: {:?}",
        attribute,
        diagnostics
            .iter()
            .map(|d| (d.attribute.as_deref(), &d.summary))
            .collect::<Vec<_>>()
    );
}
