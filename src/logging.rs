use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
///
/// Respects `RUST_LOG`, defaulting to `parley=info`. Embedders with their own
/// subscriber simply skip this; repeated calls are harmless.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("parley=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
