use tracing_subscriber::{fmt, EnvFilter};

/// Install the fmt subscriber, filtered by `RUST_LOG` (default `info,sqlx=warn`).
///
/// Returns `false` when a global subscriber is already installed.
pub fn init_tracing() -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
