// ABOUTME: Shared logging setup for slacker.
// ABOUTME: Stderr logging filtered by crate prefix, plus an optional append-only log file.

use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Crate-filtered logging to stderr: `level` for crates whose target starts
/// with `crate_name`, WARN for everything else. RUST_LOG overrides.
pub fn init_with(crate_name: &str, level: Level) {
    // try_init: a second call in the same process is a no-op.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_for(crate_name, level))
        .with_writer(std::io::stderr)
        .try_init();
}

/// File-based logging. Default: DEBUG for the named crates, RUST_LOG override.
/// Logs to ~/.config/slacker/slacker.log.
/// If setup fails, prints a warning to stderr and continues without logging.
pub fn init_file(crate_name: &str) {
    if let Err(e) = init_file_inner(crate_name) {
        eprintln!("Warning: failed to set up file logging: {e}");
    }
}

fn init_file_inner(crate_name: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let path = log_file_path().ok_or("could not determine config directory")?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(filter_for(crate_name, Level::DEBUG))
        .with_ansi(false)
        .try_init()?;

    Ok(())
}

/// Where [`init_file`] writes.
pub fn log_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("slacker").join("slacker.log"))
}

/// WARN globally, `level` for targets under `crate_name`.
pub fn filter_for(crate_name: &str, level: Level) -> EnvFilter {
    let directive = format!("{crate_name}={}", level.as_str().to_ascii_lowercase());
    EnvFilter::from_default_env()
        .add_directive(Level::WARN.into())
        .add_directive(directive.parse().unwrap_or_else(|_| level.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_init_file() {
        let _ = super::init_file as fn(&str);
    }

    #[test]
    fn exports_init_with() {
        let _ = super::init_with as fn(&str, Level);
    }

    #[test]
    fn filter_names_the_crate() {
        let filter = filter_for("slacker", Level::DEBUG).to_string();
        assert!(filter.contains("slacker=debug"), "{filter}");
    }

    #[test]
    fn log_file_lives_under_slacker() {
        if let Some(path) = log_file_path() {
            assert!(path.ends_with("slacker/slacker.log"));
        }
    }
}
