/// Initializes the tracing/logging infrastructure for an application embedding actors.
///
/// Uses the `tracing` crate with:
/// - **Environment-based filtering**: Controlled via the `RUST_LOG` environment variable
/// - **Compact formatting**: Spans shown inline, module paths hidden
///
/// # Environment Variables
///
/// - `RUST_LOG=info` - Thread start/stop and degraded teardown
/// - `RUST_LOG=debug` - Mailbox open/close, actor construction and destruction, pause/resume
/// - `RUST_LOG=trace` - Dropped sends and skipped drains (very verbose)
/// - `RUST_LOG=actor_mailbox=debug` - Debug only for this crate
///
/// Libraries should leave subscriber setup to the application; this helper is for binaries
/// and examples.
///
/// # Example
///
/// ```ignore
/// setup_tracing();
/// tracing::info!("Application started");
/// ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
