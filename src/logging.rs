//! Logging setup for provider binaries and SDK tools.
//!
//! All logs go to **stderr**: stdout carries the schema dump that provider
//! builds capture, and a stray log line there would corrupt it.
//!
//! # Quick Start
//!
//! ```ignore
//! use pragma_sdk::{init_logging, schema::print_schemas};
//!
//! fn main() -> Result<(), pragma_sdk::ProviderError> {
//!     init_logging();
//!     tracing::info!("extracting schemas");
//!     print_schemas(&[&my_provider::provider()?])
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: log filter, e.g. `info`, `pragma_sdk=debug`
//!
//! ```bash
//! # Request/response logs of the API clients
//! RUST_LOG=pragma_sdk::client=debug ./deploy-script
//!
//! # Event dispatch and harness details
//! RUST_LOG=pragma_sdk=debug cargo test
//! ```

use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn stderr_layer<S>() -> impl Layer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

/// Initialize the global subscriber at `info`, or whatever `RUST_LOG` says.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default(DEFAULT_LOG_LEVEL);
}

/// Like [`init_logging`], with a custom default level for when `RUST_LOG`
/// is not set.
///
/// ```ignore
/// pragma_sdk::init_logging_with_default("debug");
/// ```
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(stderr_layer())
        .init();
}

/// Try to initialize logging, returning false if already initialized.
///
/// Safe to call from every test or from library code that may run after
/// the application set up its own subscriber.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_LOG_LEVEL))
        .with(stderr_layer())
        .try_init()
        .is_ok()
}
