use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize logging with tracing
///
/// Sets up the tracing subscriber with the following configuration:
/// - Reads the filter from the RUST_LOG environment variable if available
/// - Otherwise derives it from the verbosity level: 0 -> warnings only,
///   1 -> info, 2 or more -> debug
/// - Uses a formatted output layer on stderr, keeping stdout free for
///   transcripts
///
/// # Example
///
/// ```no_run
/// use skald::utils::logging::init_logging;
///
/// init_logging(1);
/// ```
pub fn init_logging(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "skald=warn,warn",
        1 => "skald=info,warn",
        _ => "skald=debug,info",
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    tracing::debug!("Logging initialized");
}
