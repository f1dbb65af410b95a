use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global `fmt` subscriber. Panics if one is already set.
pub fn init_tracing() {
    fmt().with_env_filter(env_filter()).with_target(false).init();
}

/// Like [`init_tracing`] but returns `false` instead of panicking when a
/// subscriber is already installed (tests, embedding hosts).
pub fn try_init_tracing() -> bool {
    fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .try_init()
        .is_ok()
}
