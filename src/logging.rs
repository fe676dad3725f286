use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::{Args, ValueEnum};
use log::{Level, LevelFilter, Log, Metadata, Record};

type SyslogLogger = syslog::Logger<syslog::LoggerBackend, syslog::Formatter3164>;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Args)]
pub struct LogArgs {
    /// Log level (default: warn for one-shot, info for stream)
    #[arg(long = "log-level", value_enum)]
    pub log_level: Option<LogLevel>,

    /// Append log messages to a file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Send log messages to syslog
    #[arg(long)]
    pub syslog: bool,
}

struct FortunaLogger {
    log_file: Option<Mutex<File>>,
    syslog: Option<Mutex<SyslogLogger>>,
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "error",
        Level::Warn => "warning",
        Level::Info => "info",
        Level::Debug => "debug",
        Level::Trace => "trace",
    }
}

/// Message prefix for a log target: `fortuna::accumulator` logs as
/// `[fortuna accumulator]`, the crate root and foreign targets as `[fortuna]`.
fn component_prefix(target: &str) -> String {
    match target.strip_prefix("fortuna::") {
        Some(rest) => {
            let component = rest.split("::").next().unwrap_or(rest);
            format!("fortuna {}", component)
        }
        None => "fortuna".to_string(),
    }
}

/// Our own targets follow the configured level; dependencies only get
/// through with warnings and errors.
fn target_enabled(target: &str, level: Level, max: LevelFilter) -> bool {
    let own = target == "fortuna" || target.starts_with("fortuna::");
    level <= max && (own || level <= Level::Warn)
}

impl Log for FortunaLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        target_enabled(metadata.target(), metadata.level(), log::max_level())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let msg = format!(
            "[{}] {}: {}",
            component_prefix(record.target()),
            level_tag(record.level()),
            record.args()
        );

        // Always write to stderr
        let _ = writeln!(std::io::stderr().lock(), "{}", msg);

        // Optionally write to log file
        if let Some(ref file) = self.log_file {
            if let Ok(mut f) = file.lock() {
                let _ = writeln!(f, "{}", msg);
            }
        }

        // Optionally write to syslog
        if let Some(ref logger) = self.syslog {
            if let Ok(mut l) = logger.lock() {
                let text = format!("{}: {}", component_prefix(record.target()), record.args());
                let _ = match record.level() {
                    Level::Error => l.err(&text),
                    Level::Warn => l.warning(&text),
                    Level::Info => l.info(&text),
                    Level::Debug | Level::Trace => l.debug(&text),
                };
            }
        }
    }

    fn flush(&self) {
        if let Some(ref file) = self.log_file {
            if let Ok(mut f) = file.lock() {
                let _ = f.flush();
            }
        }
    }
}

pub fn init(args: &LogArgs, long_running: bool) {
    let level = args.log_level.unwrap_or(if long_running {
        LogLevel::Info
    } else {
        LogLevel::Warn
    });

    let log_file = args.log_file.as_ref().and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
            .map(Mutex::new)
    });

    let syslog = if args.syslog {
        syslog::unix(syslog::Formatter3164 {
            facility: syslog::Facility::LOG_DAEMON,
            hostname: None,
            process: "fortuna".into(),
            pid: std::process::id(),
        })
        .ok()
        .map(Mutex::new)
    } else {
        None
    };

    let logger = FortunaLogger { log_file, syslog };

    let _ = log::set_boxed_logger(Box::new(logger));
    log::set_max_level(level.to_level_filter());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filters() {
        assert_eq!(LogLevel::Error.to_level_filter(), LevelFilter::Error);
        assert_eq!(LogLevel::Trace.to_level_filter(), LevelFilter::Trace);
    }

    #[test]
    fn test_component_prefix() {
        assert_eq!(component_prefix("fortuna::stream"), "fortuna stream");
        assert_eq!(component_prefix("fortuna::accumulator"), "fortuna accumulator");
        assert_eq!(component_prefix("fortuna::entropy::jitter"), "fortuna entropy");
        assert_eq!(component_prefix("fortuna"), "fortuna");
        assert_eq!(component_prefix("syslog"), "fortuna");
    }

    #[test]
    fn test_foreign_targets_capped_at_warn() {
        let max = LevelFilter::Trace;
        assert!(target_enabled("fortuna::accumulator", Level::Debug, max));
        assert!(target_enabled("fortuna", Level::Trace, max));
        assert!(!target_enabled("syslog", Level::Info, max));
        assert!(target_enabled("syslog", Level::Warn, max));
        // the name alone is not enough
        assert!(!target_enabled("fortunate", Level::Info, max));
    }

    #[test]
    fn test_configured_level_applies() {
        assert!(!target_enabled("fortuna::stream", Level::Info, LevelFilter::Warn));
        assert!(target_enabled("fortuna::stream", Level::Error, LevelFilter::Warn));
        assert!(!target_enabled("syslog", Level::Warn, LevelFilter::Error));
    }

    #[test]
    fn test_level_tags() {
        assert_eq!(level_tag(Level::Warn), "warning");
        assert_eq!(level_tag(Level::Trace), "trace");
    }
}
