use colored::{ColoredString, Colorize};
use env_logger::Builder;
use log::Level;
use std::io::Write;

/// Install the logger on first call; every call sets the verbosity.
///
/// Safe to call again once settings are resolved, so warnings raised while loading them
/// are not lost.
pub fn setup_logging(verbose: bool) {
    use log::LevelFilter;

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // try_init: tests and library callers may have installed a logger already.
    let _ = Builder::from_default_env()
        .filter_level(LevelFilter::Warn) // Default: only warnings from dependencies
        .filter_module(env!("CARGO_PKG_NAME"), LevelFilter::Debug) // Our crate: capped below
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME");
            let line = match record.level() {
                Level::Error | Level::Warn => {
                    let level_str = match record.level() {
                        Level::Warn => "WARN".yellow(),
                        _ => "ERROR".red(),
                    };
                    let path = record.target().to_string().white();
                    format!("[{} {} {}] {}", name.cyan(), level_str, path, record.args())
                }
                _ => format!("[{}] {}", name.cyan(), record.args()),
            };
            writeln!(buf, "{}", line)
        })
        .try_init();
    log::set_max_level(level);
}

/// Log prefix for a worker thread, e.g. `[Thread 2] `.
pub fn thread_prefix(worker_id: usize) -> String {
    format!("[Thread {}] ", worker_id)
}

/// Colors for the result summary.
pub struct Colors;

impl Colors {
    pub const PASSED: &'static str = "green";
    pub const FINDING: &'static str = "red";

    pub fn colorize(color: &str, text: &str) -> ColoredString {
        text.color(color).bold()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_can_raise_verbosity_later() {
        setup_logging(false);
        assert!(log::log_enabled!(log::Level::Warn));
        assert!(!log::log_enabled!(log::Level::Debug));
        setup_logging(true);
        assert!(log::log_enabled!(log::Level::Debug));
        setup_logging(false);
        assert_eq!(log::max_level(), log::LevelFilter::Info);
    }
}
