use std::time::Duration;

use stowage_storage::RequestContext;

/// Build the request context for a save/delete: no deadline when
/// `timeout_secs` is zero.
pub fn request_context(timeout_secs: u64) -> RequestContext {
    let ctx = RequestContext::background();
    if timeout_secs == 0 {
        ctx
    } else {
        ctx.with_timeout(Duration::from_secs(timeout_secs))
    }
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
