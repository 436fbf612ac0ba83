//! # Structured Logging
//!
//! Logging setup and span helpers built on the tracing ecosystem.

use crate::config::ObservabilityConfig;
use crate::errors::{EdgeplaneError, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Create a tracing span for one reconciliation cycle.
///
/// ```rust,ignore
/// let span = reconcile_span!("public", "default/web");
/// ```
#[macro_export]
macro_rules! reconcile_span {
    ($group:expr, $descriptor:expr) => {
        tracing::info_span!(
            "reconcile",
            group = %$group,
            descriptor = %$descriptor,
            distribution_id = tracing::field::Empty
        )
    };
    ($group:expr, $descriptor:expr, $($field:tt)*) => {
        tracing::info_span!(
            "reconcile",
            group = %$group,
            descriptor = %$descriptor,
            distribution_id = tracing::field::Empty,
            $($field)*
        )
    };
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| {
            EdgeplaneError::config(format!("Invalid log level '{}': {}", config.log_level, e))
        })?;

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json_logging {
        registry.with(fmt::layer().json().with_current_span(true).with_target(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };

    result.map_err(|e| EdgeplaneError::config(format!("Failed to install subscriber: {}", e)))
}

/// Log the effective engine configuration at startup
pub fn log_config_info(config: &crate::config::EngineConfig) {
    tracing::info!(
        tls_enabled = config.tls.enabled,
        ipv6_enabled = config.ipv6_enabled,
        alias_enabled = config.alias.enabled,
        creation_enabled = config.creation_enabled,
        deletion_enabled = config.deletion_enabled,
        access_logging = config.logging.enabled,
        "edgeplane engine configuration"
    );
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_macros_compile() {
        let _span = reconcile_span!("public", "default/web");
        let _span = reconcile_span!("public", "default/web", attempt = 1);
    }
}
