use log::LevelFilter;
use simplelog::*;
use std::fs::File;
use std::path::PathBuf;

/// Logging configuration for the Plume client
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Master switch to enable/disable all logging
    pub enabled: bool,
    /// Path to the log file
    pub log_file: PathBuf,
    /// Whether to clear the log file on startup
    pub clear_on_startup: bool,
    /// Feature flags for specific logging categories
    pub features: LogFeatures,
    /// Overall log level
    pub level: LevelFilter,
}

/// Feature flags for specific logging categories
#[derive(Debug, Clone)]
pub struct LogFeatures {
    /// Log gateway calls
    pub api_calls: bool,
    /// Log page loads and merges
    pub pagination: bool,
    /// Log reaction toggles and decoration
    pub reactions: bool,
    /// Log modal and selection changes
    pub selection: bool,
    /// Log general debug messages
    pub general: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_file: PathBuf::from("plume.log"),
            clear_on_startup: true,
            features: LogFeatures::default(),
            level: LevelFilter::Info,
        }
    }
}

impl Default for LogFeatures {
    fn default() -> Self {
        Self {
            api_calls: true,
            pagination: true,
            reactions: true,
            selection: true,
            general: true,
        }
    }
}

impl LogConfig {
    /// Logging switched off; what a store uses until it is given a config
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Everything, down to trace level; used by `plume --verbose`
    pub fn verbose() -> Self {
        Self {
            level: LevelFilter::Trace,
            ..Default::default()
        }
    }

    pub fn with_log_file(mut self, log_file: impl Into<PathBuf>) -> Self {
        self.log_file = log_file.into();
        self
    }
}

/// Initialize the logging system with the given configuration
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    if !config.enabled {
        let _ = WriteLogger::init(LevelFilter::Off, Config::default(), std::io::sink());
        return Ok(());
    }

    if config.clear_on_startup {
        let _ = File::create(&config.log_file)?;
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)?;

    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_time_offset_to_local()
        .unwrap_or_else(|builder| builder)
        .build();

    WriteLogger::init(config.level, log_config, log_file)?;

    log::info!(
        "Logging initialized: file={}, level={:?}",
        config.log_file.display(),
        config.level
    );
    log::debug!("Log features: {:?}", config.features);

    Ok(())
}

/// Macro for logging gateway calls
#[macro_export]
macro_rules! log_api_call {
    ($config:expr, $($arg:tt)*) => {
        if $config.enabled && $config.features.api_calls {
            log::debug!(target: "api_calls", $($arg)*);
        }
    };
}

/// Macro for logging page loads and merges
#[macro_export]
macro_rules! log_pagination {
    ($config:expr, $($arg:tt)*) => {
        if $config.enabled && $config.features.pagination {
            log::debug!(target: "pagination", $($arg)*);
        }
    };
}

/// Macro for logging reaction toggles
#[macro_export]
macro_rules! log_reaction {
    ($config:expr, $($arg:tt)*) => {
        if $config.enabled && $config.features.reactions {
            log::debug!(target: "reactions", $($arg)*);
        }
    };
}

/// Macro for logging modal and selection changes
#[macro_export]
macro_rules! log_selection {
    ($config:expr, $($arg:tt)*) => {
        if $config.enabled && $config.features.selection {
            log::debug!(target: "selection", $($arg)*);
        }
    };
}

/// Macro for general debug logging
#[macro_export]
macro_rules! log_debug {
    ($config:expr, $($arg:tt)*) => {
        if $config.enabled && $config.features.general {
            log::debug!(target: "general", $($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_lowers_level_only() {
        let config = LogConfig::verbose();
        assert!(config.enabled);
        assert_eq!(config.level, LevelFilter::Trace);
        assert!(config.features.reactions);
        assert_eq!(config.log_file, PathBuf::from("plume.log"));
    }

    #[test]
    fn test_disabled_keeps_defaults_otherwise() {
        let config = LogConfig::disabled();
        assert!(!config.enabled);
        assert_eq!(config.log_file, PathBuf::from("plume.log"));
    }

    #[test]
    fn test_macros_respect_feature_flags() {
        // Macros must expand without a logger installed
        let mut config = LogConfig::default();
        config.features.reactions = false;
        log_reaction!(config, "toggle {}", 1);
        log_pagination!(config, "page {}", 2);
        log_selection!(config, "open");
        log_api_call!(config, "call");
        log_debug!(config, "debug");
    }
}
