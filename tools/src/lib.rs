pub mod http;
pub mod observability;
pub mod toml;

use rustls::crypto::ring;

use crate::observability::setup_tracing;

/// Process-wide setup for a service binary: panic logging, the JSON log
/// subscriber and the rustls crypto provider.
///
/// Call once from `main`, before the runtime starts serving requests.
///
/// # Arguments
///
/// * `name` - The name of the application (typically `env!("CARGO_PKG_NAME")`),
///   used as the log target that follows `RUST_LOG`.
///
/// # Errors
///
/// Returns an error if another rustls crypto provider was already installed
/// for the process.
///
/// # Example
///
/// ```rust,no_run
/// tools::setup_application(env!("CARGO_PKG_NAME")).unwrap();
/// ```
pub fn setup_application(name: &'static str) -> anyhow::Result<()> {
    setup_panic_hook();
    setup_tracing(name);
    setup_tls_provider()
}

/// Routes panic messages through `tracing`.
///
/// The process keeps running: a panic inside a request handler unwinds only
/// that handler's task.
pub fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let thread = std::thread::current();
        let thread = thread.name().unwrap_or("<unnamed>");

        if let Some(location) = panic_info.location() {
            tracing::error!(
                message = %panic_info,
                panic.thread = thread,
                panic.file = location.file(),
                panic.line = location.line(),
                panic.column = location.column(),
            );
        } else {
            tracing::error!(message = %panic_info, panic.thread = thread);
        }
    }))
}

/// Selects ring as the process-level rustls provider used by the quote
/// client's HTTPS connections.
///
/// # Errors
///
/// Returns an error if a provider is already installed.
pub fn setup_tls_provider() -> anyhow::Result<()> {
    ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install rustls crypto provider: {e:?}"))
}
