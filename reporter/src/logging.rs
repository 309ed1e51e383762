use tracing_subscriber::EnvFilter;

/// Install the `fmt` subscriber filtered by `RUST_LOG`.
///
/// Safe to call from every test binary; only the first call installs the
/// subscriber. Returns whether this call did.
pub fn init_logging() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .is_ok()
}
