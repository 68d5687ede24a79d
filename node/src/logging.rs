// dryrun/node/src/logging.rs

//! Structured logging setup.
//!
//! Output format and levels come from the environment:
//! - `RUST_LOG`: filter directives (e.g. "info,dryrun_execution=debug")
//! - `LOG_FORMAT`: pretty, json or compact
//! - `LOG_ANSI`: enable ANSI colors (true/false)

use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format
    Pretty,
    /// JSON format for log aggregation
    Json,
    /// Compact single-line format
    Compact,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level
    pub level: LogLevel,
    /// Output format (json, pretty, compact)
    pub format: LogFormat,
    /// Enable ANSI colors (for terminal output)
    pub ansi_colors: bool,
    /// Enable span events (enter/exit)
    pub span_events: bool,
    /// Module-specific log levels
    pub module_levels: Vec<(String, LogLevel)>,
    /// Include target in logs
    pub include_target: bool,
    /// Include file location in logs
    pub include_location: bool,
    /// Include thread ID in logs
    pub include_thread_id: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
            ansi_colors: true,
            span_events: false,
            module_levels: vec![
                ("hyper".to_string(), LogLevel::Warn),
                ("jsonrpc_http_server".to_string(), LogLevel::Warn),
            ],
            include_target: true,
            include_location: false,
            include_thread_id: false,
        }
    }
}

impl LogConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(rust_log) = lookup("RUST_LOG") {
            // Default level is the first directive
            let level_str = rust_log.split(',').next().unwrap_or("info");
            config.level = LogLevel::parse(level_str);
        }

        if let Some(format) = lookup("LOG_FORMAT") {
            config.format = LogFormat::parse(&format);
            if config.format == LogFormat::Json {
                config.ansi_colors = false;
                config.include_location = true;
                config.include_thread_id = true;
            }
        }

        if let Some(ansi) = lookup("LOG_ANSI") {
            config.ansi_colors = ansi.to_lowercase() == "true";
        }

        config
    }

    /// Build the env filter string
    fn build_filter(&self) -> String {
        let mut filter = self.level.as_str().to_string();

        for (module, level) in &self.module_levels {
            filter.push_str(&format!(",{}={}", module, level.as_str()));
        }

        filter
    }
}

/// Initialize the logging system with the given configuration
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    // RUST_LOG wins over the configured levels
    let filter = match std::env::var("RUST_LOG") {
        Ok(rust_log) => EnvFilter::new(rust_log),
        Err(_) => EnvFilter::new(config.build_filter()),
    };

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_target(config.include_target)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_thread_ids(config.include_thread_id)
        .with_span_events(span_events);

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Json => registry.with(layer.json().with_ansi(false)).try_init(),
        LogFormat::Pretty => registry.with(layer.pretty().with_ansi(config.ansi_colors)).try_init(),
        LogFormat::Compact => registry.with(layer.compact().with_ansi(config.ansi_colors)).try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to init logging: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> LogConfig {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        LogConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_log_config_from_env() {
        let config = config_from(&[("RUST_LOG", "debug,hyper=warn"), ("LOG_FORMAT", "json")]);
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.ansi_colors);

        let config = config_from(&[("LOG_FORMAT", "compact"), ("LOG_ANSI", "false")]);
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Compact);
        assert!(!config.ansi_colors);
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::parse("trace"), LogLevel::Trace);
        assert_eq!(LogLevel::parse("DEBUG"), LogLevel::Debug);
        assert_eq!(LogLevel::parse("WARN"), LogLevel::Warn);
        assert_eq!(LogLevel::parse("error"), LogLevel::Error);
        assert_eq!(LogLevel::parse("invalid"), LogLevel::Info);
    }

    #[test]
    fn test_build_filter() {
        let mut config = LogConfig {
            level: LogLevel::Debug,
            ..LogConfig::default()
        };
        config.module_levels = vec![("dryrun_api".to_string(), LogLevel::Trace)];

        let filter = config.build_filter();
        assert_eq!(filter, "debug,dryrun_api=trace");
    }
}
