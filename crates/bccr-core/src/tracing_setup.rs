use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Install a file-backed subscriber. The terminal belongs to the UI, so
/// without a log file (argument or `BCCR_LOG_FILE`) nothing is installed and
/// tracing is a no-op.
pub fn init_tracing(log_file: Option<&Path>) {
    let path = log_file
        .map(Path::to_path_buf)
        .or_else(|| std::env::var("BCCR_LOG_FILE").ok().map(PathBuf::from));
    let Some(path) = path else {
        return;
    };

    let file = match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("could not open log file {}: {err}", path.display());
            return;
        }
    };

    let file_layer = fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true)
        .with_filter(LevelFilter::DEBUG);

    tracing_subscriber::registry().with(file_layer).init();
}
