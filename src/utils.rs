use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Log level for a `-v` count: 0 = warn, 1 = info, 2 = debug, 3+ = trace.
pub const fn level_for_verbosity(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the stderr log subscriber used by the command line tools.
///
/// `RUST_LOG` overrides the level picked from `verbosity`.
pub fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(level_for_verbosity(verbosity).as_str().to_lowercase())
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
