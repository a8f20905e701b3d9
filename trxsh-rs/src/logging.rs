use std::env;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding an `EnvFilter` directive, e.g. `trxsh_core=debug`.
pub const LOG_ENV: &str = "TRXSH_LOG";

/// Logs go to stderr so listings on stdout stay pipeable. `-v` flags win
/// over `TRXSH_LOG`, which wins over the `warn` default.
pub fn init(verbosity: u8) {
    let filter = match verbosity {
        0 => env::var(LOG_ENV)
            .ok()
            .and_then(|directive| EnvFilter::try_new(directive).ok())
            .unwrap_or_else(|| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
