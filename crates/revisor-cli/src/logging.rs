// Tracing subscriber setup for the binary

use tracing::Level;

/// Log level for the given verbosity flag
pub fn level(verbose: bool) -> Level {
    if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

/// Install the global fmt subscriber, writing to stderr so stdout stays clean
/// for command output
pub fn init_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_max_level(level(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
