//! Runtime context for lifecycle handlers.
//!
//! The runtime that delivers lifecycle events also knows how to watch other
//! resources. It installs itself as the [`RuntimeContext`] for the duration
//! of a handler call, so handlers can wait for a resource they created
//! out-of-band to become ready.
//!
//! ```ignore
//! async fn on_create(&self, resource: &ResourceOf<Self>) -> Result<AppOutputs, ProviderError> {
//!     let db = wait_for_resource_state("resource:postgres_database_main", LifecycleState::Ready, None).await?;
//!     // ...
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::error::ProviderError;
use crate::models::LifecycleState;

/// Timeout of [`wait_for_resource_state`] when none is given.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Operations the runtime offers to handlers.
#[async_trait::async_trait]
pub trait RuntimeContext: Send + Sync {
    /// Wait until `resource_id` reaches `target_state` and return the resource.
    ///
    /// Fails with [`ProviderError::DeadlineExceeded`] after `timeout`, or with
    /// [`ProviderError::FailedPrecondition`] if the resource fails first.
    async fn wait_for_state(
        &self,
        resource_id: &str,
        target_state: LifecycleState,
        timeout: Duration,
    ) -> Result<Value, ProviderError>;
}

tokio::task_local! {
    static CURRENT: Arc<dyn RuntimeContext>;
}

/// Run `fut` with `ctx` installed as the current runtime context.
///
/// The context is scoped to the future; it is gone once the future
/// completes, including when it fails or panics.
pub async fn with_runtime_context<F>(ctx: Arc<dyn RuntimeContext>, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT.scope(ctx, fut).await
}

/// The current runtime context, if called inside [`with_runtime_context`].
pub fn runtime_context() -> Option<Arc<dyn RuntimeContext>> {
    CURRENT.try_with(Arc::clone).ok()
}

/// Wait for another resource to reach a lifecycle state.
///
/// Only works inside a lifecycle handler invoked by the runtime. `timeout`
/// defaults to [`DEFAULT_WAIT_TIMEOUT`].
pub async fn wait_for_resource_state(
    resource_id: &str,
    target_state: LifecycleState,
    timeout: Option<Duration>,
) -> Result<Value, ProviderError> {
    let ctx = runtime_context()
        .ok_or_else(|| ProviderError::NoRuntimeContext("wait_for_resource_state()".to_string()))?;
    let timeout = timeout.unwrap_or(DEFAULT_WAIT_TIMEOUT);
    debug!(resource_id, %target_state, ?timeout, "waiting for resource state");
    ctx.wait_for_state(resource_id, target_state, timeout).await
}
