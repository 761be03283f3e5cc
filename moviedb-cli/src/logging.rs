// Log level selection for the CLI

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Default when neither `--log-level` nor `RUST_LOG` is given
const DEFAULT_FILTER: &str = "warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// `--log-level` wins over `RUST_LOG`
fn build_filter(level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    match (level, env) {
        (Some(level), _) => EnvFilter::new(level.as_str()),
        (None, Some(directives)) => {
            EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
        }
        (None, None) => EnvFilter::new(DEFAULT_FILTER),
    }
}

/// Install the global subscriber, writing to stderr so stdout stays JSON
pub fn init(level: Option<LogLevel>) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(level, env.as_deref()))
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_flag_overrides_env() {
        let filter = build_filter(Some(LogLevel::Debug), Some("error"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_env_then_default() {
        assert_eq!(
            build_filter(None, Some("info")).max_level_hint(),
            Some(LevelFilter::INFO)
        );
        assert_eq!(build_filter(None, None).max_level_hint(), Some(LevelFilter::WARN));
        assert_eq!(
            build_filter(None, Some("moviedb=loud")).max_level_hint(),
            Some(LevelFilter::WARN)
        );
    }

    #[test]
    fn test_level_names() {
        assert_eq!(LogLevel::Trace.as_str(), "trace");
        assert_eq!(LogLevel::from_str("warn", true), Ok(LogLevel::Warn));
    }
}
