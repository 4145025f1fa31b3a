//! Logging for the dagpulse binary.
//!
//! The console shows what an operator watching a node cares about: startup,
//! new blocks, clients coming and going. Everything else goes to a per-run
//! file. At trace level that file carries one "Tick complete" line per
//! simulation tick plus every subscriber registration and drop from the hub.
//! HTTP and WebSocket libraries are capped at info on both outputs so their
//! frame-level chatter does not bury the simulation.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// File name of the per-run log, overwritten on every start.
pub const LOG_FILE_NAME: &str = "dagpulse-last-run.log";

/// Targets held at info no matter how verbose the rest is.
const TRANSPORT_TARGETS: &[&str] = &["hyper", "hyper_util", "tungstenite", "tokio_tungstenite"];

/// Filter directives for the console at `level`.
///
/// Levels above info keep transport crates at info.
pub fn console_directives(level: Level) -> String {
    let mut directives = level.to_string().to_lowercase();
    if level > Level::INFO {
        for target in TRANSPORT_TARGETS {
            directives.push_str(&format!(",{target}=info"));
        }
    }
    directives
}

/// Filter directives for the run log: every dagpulse event, transport at info.
pub fn file_directives() -> String {
    console_directives(Level::TRACE)
}

/// Installs the console and file layers as the global subscriber.
///
/// `RUST_LOG`, when set, replaces the console directives. The file always
/// uses [`file_directives`]. Returns the path of the run log, which lives in
/// `logs_dir` (default `./logs`).
///
/// # Errors
///
/// - `Box<dyn std::error::Error>` - Logs directory or file could not be
///   created, or a global subscriber is already installed
pub fn init_tracing(
    console_level: Level,
    logs_dir: Option<&Path>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let logs_path = logs_dir.unwrap_or_else(|| Path::new("logs"));
    create_dir_all(logs_path)?;

    let log_file_path = logs_path.join(LOG_FILE_NAME);
    let log_file = File::create(&log_file_path)?;

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_directives(console_level)));

    let console_layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(log_file)
        .with_filter(EnvFilter::new(file_directives()));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!(
        console = %console_level,
        log_file = %log_file_path.display(),
        "Logging initialized"
    );

    Ok(log_file_path)
}

/// Console verbosity chosen with `--log-level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliLogLevel {
    Error,
    /// Adds stalled subscribers and failed ticks
    Warn,
    /// Adds startup, new blocks and client connects
    Info,
    /// Adds subscriber registry changes and HTTP requests
    Debug,
    /// Adds one line per simulation tick
    Trace,
}

impl CliLogLevel {
    /// # Examples
    /// ```
    /// use dagpulse_core::tracing_setup::CliLogLevel;
    ///
    /// assert_eq!(CliLogLevel::Info.as_tracing_level(), tracing::Level::INFO);
    /// ```
    pub fn as_tracing_level(self) -> Level {
        match self {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_levels_have_no_transport_caps() {
        assert_eq!(console_directives(Level::WARN), "warn");
        assert_eq!(console_directives(Level::INFO), "info");
    }

    #[test]
    fn test_verbose_levels_cap_transport_targets() {
        let debug = console_directives(CliLogLevel::Debug.as_tracing_level());
        assert!(debug.starts_with("debug,"));
        assert!(debug.contains("hyper=info"));
        assert!(debug.contains("tokio_tungstenite=info"));

        assert!(file_directives().starts_with("trace,"));
        for directives in [debug, file_directives()] {
            assert!(directives.parse::<EnvFilter>().is_ok());
        }
    }

    #[test]
    fn test_init_tracing_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let logs_dir = dir.path().join("logs");

        let path = init_tracing(Level::WARN, Some(&logs_dir)).unwrap();

        assert_eq!(path, logs_dir.join(LOG_FILE_NAME));
        assert!(path.exists());
        // a second global subscriber is refused rather than panicking
        assert!(init_tracing(Level::WARN, Some(&logs_dir)).is_err());
    }
}
