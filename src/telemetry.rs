//! Process-wide tracing setup. Call once from a binary's `main`.

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

const LIBRARY_TARGET: &str = "fraud_ml_pipeline";

/// Filter directives used when `RUST_LOG` is unset: the library and the
/// calling binary at `level`, HTTP tracing at info.
pub fn default_directives(level: &str, binary: &str) -> String {
    if binary.is_empty() || binary == LIBRARY_TARGET {
        format!("{LIBRARY_TARGET}={level},tower_http=info")
    } else {
        format!("{LIBRARY_TARGET}={level},{binary}={level},tower_http=info")
    }
}

/// Install the global subscriber.
///
/// `binary` is the calling crate's target name, usually
/// `env!("CARGO_CRATE_NAME")`. `RUST_LOG` takes precedence over
/// [`default_directives`]. Returns an error if the level is not a valid
/// directive or a subscriber is already installed.
pub fn init_tracing(logging: &LoggingConfig, binary: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(&logging.level, binary)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if logging.format.eq_ignore_ascii_case("json") {
        builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))?;
    } else {
        builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))?;
    }

    Ok(())
}
