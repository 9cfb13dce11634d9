//! Log filter selection for the worker binary.

use tracing_subscriber::EnvFilter;

/// Default filter directives for the configured `debug` flag and `verbosity`.
///
/// Verbosity 0 logs at info, 1 at debug and 2 or more at trace. `debug`
/// raises the level to at least debug and adds HTTP request tracing.
pub fn default_directives(debug: bool, verbosity: i32) -> String {
    let level = match verbosity {
        v if v >= 2 => "trace",
        1 => "debug",
        _ if debug => "debug",
        _ => "info",
    };
    if debug {
        format!("{},tower_http=debug", level)
    } else {
        level.to_string()
    }
}

/// `RUST_LOG` when set, otherwise [`default_directives`].
pub fn env_filter(debug: bool, verbosity: i32) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(debug, verbosity)))
}
