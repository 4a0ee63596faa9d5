// Logging module - Logging infrastructure
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use std::io;

/// Initialize logging system.
///
/// `RUST_LOG` takes precedence; otherwise `level` applies to this crate
/// (`debug` when `verbose`). Calling it twice is harmless.
pub fn init_logging(level: &str, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let level = if verbose { "debug" } else { level };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("hexlink={},warn", level)))?;

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .try_init();

    if result.is_ok() {
        tracing::debug!("HexLink logging system initialized");
    }
    Ok(())
}
