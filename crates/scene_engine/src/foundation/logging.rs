//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    // A second init (tests, embedding hosts) is not an error worth surfacing
    let _ = env_logger::try_init();
}

/// Initialize the logging system with a default level filter
///
/// `RUST_LOG` still overrides `default_level` when it is set.
pub fn init_with_level(default_level: &str) {
    let env = env_logger::Env::default().default_filter_or(default_level);
    let _ = env_logger::Builder::from_env(env).try_init();
}
