//! Structured logging setup

use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Initialize JSON tracing output filtered by `service.log_level`
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing(config: &Config) -> bool {
    let filter = EnvFilter::try_new(&config.service.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            environment = %config.service.environment,
            "Tracing initialized for service: {}",
            config.service.name
        );
    }
    installed
}

/// Flush point for the process entry point's teardown sequence
pub fn shutdown_tracing() {
    tracing::info!("Tracing shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        let config = Config::default();
        let _ = init_tracing(&config);
        assert!(!init_tracing(&config));
    }
}
