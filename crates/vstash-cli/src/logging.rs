//! Log setup
//!
//! Library crates log through `tracing`; the binary installs one stderr
//! subscriber. `VSTASH_LOG` takes `EnvFilter` directives and wins over the
//! verbosity flag.

use tracing_subscriber::EnvFilter;

/// Environment variable holding filter directives
pub const ENV_LOG: &str = "VSTASH_LOG";

/// Default directive for a `-v` count
#[must_use]
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "error",
        1 => "info",
        _ => "debug",
    }
}

/// Install the global subscriber; later calls are no-ops
pub fn init(verbosity: u8, json: bool) {
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
    if installed.is_err() {
        tracing::debug!("log subscriber already installed");
    }
}
