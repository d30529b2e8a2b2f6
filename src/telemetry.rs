//! Tracing subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "lingo_flows=info";

/// Install a fmt subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once: later calls leave the first subscriber in place.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_harmless() {
        init_tracing();
        init_tracing();
        tracing::info!("tracing initialised");
    }
}
