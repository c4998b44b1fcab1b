use itertools::Itertools;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{FmtSubscriber, filter::EnvFilter, util::SubscriberInitExt};

use crate::config::{LogFormat, LogLevel};

/// Initialize logging.
///
/// Returns a drop guard responsible for flushing any remaining logs when the program terminates.
/// The guard must be assigned to a binding that is not _, as _ will result in the guard being
/// dropped immediately.
pub fn init(log_level: LogLevel, log_format: LogFormat) -> WorkerGuard {
    let filter = build_tracing_filter(log_level);

    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());

    let builder = FmtSubscriber::builder()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(enable_ansi())
        .with_thread_ids(false);

    match log_format {
        LogFormat::Plaintext => builder.finish().init(),
        LogFormat::Json => builder.json().finish().init(),
    };

    guard
}

/// Check if both stdout and stderr are proper terminal (tty),
/// so that we know whether or not to enable colored output,
/// using ANSI escape codes. If either is not, eg. because
/// stdout is redirected to a file, we don't enable colored output.
pub fn enable_ansi() -> bool {
    use std::io::IsTerminal;
    std::io::stdout().is_terminal() && std::io::stderr().is_terminal()
}

/// Crates whose level follows the configured `log_level`.
const TARGET_CRATES: &[&str] = &[
    "cobalt",
    "cobalt_blob_engine",
    "cobalt_cli",
    "cobalt_execution",
    "cobalt_steps",
    "cobalt_test_support",
    "cobalt_txpool",
    "cobalt_types",
];

/// Build a tracing directive setting the log level for the
/// crates to the given `log_level`.
pub fn default_directive(log_level: LogLevel) -> String {
    TARGET_CRATES.iter().map(|&c| format!("{c}={log_level}")).join(",")
}

/// Everything outside [`TARGET_CRATES`] stays at `info`. `RUST_LOG` is not
/// consulted; malformed directives are skipped.
fn build_tracing_filter(log_level: LogLevel) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(default_directive(log_level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_covers_every_crate() {
        let directive = default_directive(LogLevel::Debug);
        assert!(directive.starts_with("cobalt=debug,"));
        assert!(directive.contains("cobalt_steps=debug"));
        assert_eq!(directive.split(',').count(), TARGET_CRATES.len());
    }

    #[test]
    fn filter_parses_for_every_level() {
        for level in [LogLevel::Trace, LogLevel::Warn, LogLevel::Error] {
            let filter = build_tracing_filter(level).to_string();
            assert!(filter.contains(&format!("cobalt_txpool={level}")), "{filter}");
        }
    }
}
