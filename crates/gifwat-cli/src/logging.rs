use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// One-shot commands log to stderr.
pub fn init_stderr(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// The full-screen picker owns the terminal, so it logs to a file instead.
/// Falls back to no logging when the file cannot be opened.
pub fn init_file(default_level: &str, dir: &Path) {
    let _ = std::fs::create_dir_all(dir);
    let file = match OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("gifwat.log"))
    {
        Ok(f) => f,
        Err(_) => return,
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}
