//! Logging setup.

use tracing_subscriber::EnvFilter;

/// Installs a stderr `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `pobieracz=warn`, or `debug` with
/// `verbose`. The quiet default keeps the progress bar readable. Logs go to
/// stderr so stdout stays clean for `--json`.
pub fn init(verbose: bool) {
    let fallback = if verbose {
        "pobieracz=debug"
    } else {
        "pobieracz=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    // A second init (tests) is harmless; keep the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
