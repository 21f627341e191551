use taskstore_core::TASKSTORE_LOG_VAR;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-export tracing macros for convenience
pub use ::tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};

/// Initialize the tracing system
///
/// Filter directives come from `RUST_LOG`, then `TASKSTORE_LOG`, then default
/// to `info`. Events go to stderr so they never mix with command output.
/// Hosts that install their own subscriber should skip this; the lock
/// manager and cache only emit through the `tracing` facade.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = env_filter("info");

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Build the filter used by [`init`], falling back to `default_directive`
pub fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env(TASKSTORE_LOG_VAR))
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Check if we're running in a TTY environment
fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Span wrapping one store operation on a resource, for correlating lock and
/// cache events emitted underneath it
pub fn resource_span(operation: &str, resource: &str) -> Span {
    span!(Level::DEBUG, "resource", operation = %operation, resource = %resource)
}
