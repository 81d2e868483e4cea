//! Tracing subscriber setup for the command-line tools

use anyhow::{Result, anyhow};
use tracing::Level;
use tracing_subscriber::{EnvFilter, prelude::*};

/// Level used when `RUST_LOG` is unset, from the `-v`/`-q` counts
pub fn default_level(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise the `skirmish` target logs at the
/// level picked by [`default_level`]. Logs go to stderr so command output on
/// stdout stays machine readable.
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let level = default_level(verbose, quiet);
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(format!("skirmish={}", level.as_str().to_ascii_lowercase())),
    };

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr),
    );
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("failed to set up tracing subscriber: {e}"))
}
