//! Logger initialisation for the `cptp` binary and for embedding programs.

use std::{fs::File, io::Write, path::PathBuf};

use env_logger::{fmt::Formatter, Builder, Target};
use log::{Level, LevelFilter};

use crate::error::{Error, Result};

/// Options controlling [`init_logger`].
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Most verbose level that is emitted.
    pub level: LevelFilter,
    /// Prefix each record with a millisecond timestamp.
    pub timestamp: bool,
    /// Write to this file instead of stderr.
    pub output: Option<PathBuf>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            timestamp: false,
            output: None,
        }
    }
}

impl LogOptions {
    /// Info by default, debug with `verbose`.
    pub fn from_verbosity(verbose: bool) -> Self {
        Self {
            level: if verbose {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            },
            ..Self::default()
        }
    }

    pub fn with_output(mut self, path: Option<PathBuf>) -> Self {
        self.output = path;
        self
    }

    pub fn with_timestamp(mut self, timestamp: bool) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Installs the global logger. `RUST_LOG` overrides the configured level.
///
/// Fails if a logger was already installed or the log file cannot be created.
pub fn init_logger(options: &LogOptions) -> Result<()> {
    let timestamp = options.timestamp;

    let mut builder = Builder::new();
    builder
        .filter_level(options.level)
        .write_style(env_logger::WriteStyle::Never)
        .format(move |buf: &mut Formatter, record| {
            if timestamp {
                write!(buf, "{} ", buf.timestamp_millis())?;
            }
            writeln!(buf, "{} {}", level_tag(record.level()), record.args())
        });

    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    if let Some(path) = options.output.as_ref() {
        let file = File::create(path).map_err(|e| {
            Error::other(format!(
                "failed to create log output file {}: {e}",
                path.display()
            ))
        })?;
        builder.target(Target::Pipe(Box::new(file)));
    } else {
        builder.target(Target::Stderr);
    }

    builder
        .try_init()
        .map_err(|e| Error::other(format!("logger init failed: {e}")))
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(LogOptions::from_verbosity(false).level, LevelFilter::Info);
        assert_eq!(LogOptions::from_verbosity(true).level, LevelFilter::Debug);
    }

    #[test]
    fn test_level_tags() {
        assert_eq!(level_tag(Level::Warn), "WARN");
        assert_eq!(level_tag(Level::Trace), "TRACE");
    }
}
