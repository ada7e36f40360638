//! Application configuration for ifpick.
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! an optional JSON5 configuration file and the command line. This module
//! merges them, validates the result and sets up logging.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use ifpick_shared::errors::{ConfigError, ConfigResult};
use ifpick_shared::{DEFAULT_SAMPLING_WINDOW, parse_sampling_window, validate_sampling_window};

use super::cli::CliConfig;
use crate::detector::exclusion_pattern;
use crate::stats::proc_net_dev::DEFAULT_PROC_NET_DEV;
use crate::stats::sysfs::DEFAULT_SYSFS_NET_ROOT;
use crate::stats::{
    IpLinkProvider, ProcNetDevProvider, StatsSource, SysfsStatsProvider, SystemStatsProvider,
};

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to tracing level filter string
    pub fn to_filter_string(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(ConfigError::InvalidLogLevel {
                level: s.to_string(),
            }),
        }
    }
}

/// How the selection is printed on stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Interface name only
    #[default]
    Plain,
    /// Full selection report as pretty JSON
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Plain => write!(f, "plain"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Contents of a JSON5 configuration file.
///
/// ```json5
/// {
///   window: "2s",
///   source: "sysfs",
///   exclude: ["veth.*", "docker\\d+"],
///   log_level: "info",
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub window: Option<String>,
    pub source: Option<String>,
    pub sysfs_root: Option<String>,
    pub proc_net_dev: Option<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    pub log_level: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json5_str(&content, &path.display().to_string())
    }

    /// Parse JSON5 text; `origin` names the source in error messages
    pub fn from_json5_str(content: &str, origin: &str) -> ConfigResult<Self> {
        json5::from_str(content).map_err(|e| ConfigError::FileParse {
            path: origin.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Application configuration structure
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Explicit log level; `None` defers to `RUST_LOG`, then warn
    pub log_level: Option<LogLevel>,
    pub output: OutputFormat,
    pub window: Duration,
    pub source: StatsSource,
    pub sysfs_root: PathBuf,
    pub proc_net_dev: PathBuf,
    pub exclude: Vec<String>,
}

impl AppConfig {
    /// Create application configuration from CLI config and its config file
    pub fn from_cli(cli_config: &CliConfig) -> Result<Self> {
        cli_config.validate()?;

        let file_config = match &cli_config.config_file {
            Some(path) => Some(
                FileConfig::load(Path::new(path))
                    .with_context(|| format!("Loading configuration from {}", path))?,
            ),
            None => None,
        };

        Self::merge(cli_config, file_config.as_ref())
    }

    /// Layer CLI values over file values over defaults
    pub fn merge(cli_config: &CliConfig, file_config: Option<&FileConfig>) -> Result<Self> {
        let mut builder = AppConfigBuilder::new();

        if let Some(file) = file_config {
            if let Some(window) = &file.window {
                builder = builder.window(parse_sampling_window(window)?);
            }
            if let Some(source) = &file.source {
                builder = builder.source(source.parse()?);
            }
            if let Some(root) = &file.sysfs_root {
                builder = builder.sysfs_root(root);
            }
            if let Some(path) = &file.proc_net_dev {
                builder = builder.proc_net_dev(path);
            }
            if let Some(level) = &file.log_level {
                builder = builder.log_level(level.parse()?);
            }
            builder = builder.exclude(file.exclude.iter().cloned());
        }

        if let Some(window) = &cli_config.window {
            builder = builder.window(parse_sampling_window(window)?);
        }
        if let Some(source) = &cli_config.source {
            builder = builder.source(source.parse()?);
        }
        if let Some(root) = &cli_config.sysfs_root {
            builder = builder.sysfs_root(root);
        }
        if let Some(path) = &cli_config.proc_net_dev {
            builder = builder.proc_net_dev(path);
        }
        if cli_config.verbose {
            builder = builder.log_level(LogLevel::Debug);
        }
        if cli_config.json {
            builder = builder.output(OutputFormat::Json);
        }

        builder.exclude(cli_config.exclude.iter().cloned()).build()
    }

    /// Tracing filter directive for this configuration
    pub fn log_filter(&self) -> String {
        match self.log_level {
            Some(level) => level.to_filter_string().to_string(),
            None => match env::var("RUST_LOG") {
                Ok(existing_log) if !existing_log.trim().is_empty() => existing_log,
                _ => LogLevel::Warn.to_filter_string().to_string(),
            },
        }
    }

    /// Initialize logging based on configuration.
    ///
    /// Logs go to stderr; stdout only carries the selection. An unparsable
    /// filter falls back to warn and is reported once logging is up.
    pub fn init_logging(&self) -> Result<()> {
        let directive = self.log_filter();
        let (filter, rejected) = env_filter_or_warn(&directive);

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

        match rejected {
            Some(reason) => tracing::warn!(
                "Ignoring invalid log filter '{}': {}; using {}",
                directive,
                reason,
                LogLevel::Warn.to_filter_string()
            ),
            None => tracing::debug!("Logging initialized with filter: {}", directive),
        }
        Ok(())
    }

    /// Compile the exclusion patterns into anchored regular expressions
    pub fn exclusion_patterns(&self) -> ConfigResult<Vec<Regex>> {
        self.exclude.iter().map(|p| exclusion_pattern(p)).collect()
    }

    /// Instantiate the stats provider selected by `source`
    pub fn build_provider(&self) -> SystemStatsProvider {
        match self.source {
            StatsSource::Sysfs => {
                SystemStatsProvider::Sysfs(SysfsStatsProvider::with_root(&self.sysfs_root))
            }
            StatsSource::Proc => {
                SystemStatsProvider::ProcNetDev(ProcNetDevProvider::with_path(&self.proc_net_dev))
            }
            StatsSource::IpLink => SystemStatsProvider::IpLink(
                IpLinkProvider::new().with_sysfs_root(&self.sysfs_root),
            ),
        }
    }

    /// Validate application configuration
    pub fn validate(&self) -> Result<()> {
        validate_sampling_window(self.window)
            .map_err(|reason| anyhow::anyhow!("Invalid sampling window: {}", reason))?;

        if self.sysfs_root.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("sysfs root cannot be empty"));
        }

        if self.proc_net_dev.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("/proc/net/dev path cannot be empty"));
        }

        self.exclusion_patterns()?;
        Ok(())
    }
}

/// Parse a filter directive, falling back to warn with the parse error
fn env_filter_or_warn(directive: &str) -> (EnvFilter, Option<String>) {
    match EnvFilter::try_new(directive) {
        Ok(filter) => (filter, None),
        Err(e) => (
            EnvFilter::new(LogLevel::Warn.to_filter_string()),
            Some(e.to_string()),
        ),
    }
}

/// Builder pattern for AppConfig
#[derive(Default)]
pub struct AppConfigBuilder {
    log_level: Option<LogLevel>,
    output: Option<OutputFormat>,
    window: Option<Duration>,
    source: Option<StatsSource>,
    sysfs_root: Option<PathBuf>,
    proc_net_dev: Option<PathBuf>,
    exclude: Vec<String>,
}

impl AppConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set log level
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Set output format
    pub fn output(mut self, output: OutputFormat) -> Self {
        self.output = Some(output);
        self
    }

    /// Set sampling window
    pub fn window(mut self, window: Duration) -> Self {
        self.window = Some(window);
        self
    }

    /// Set stats source
    pub fn source(mut self, source: StatsSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn sysfs_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.sysfs_root = Some(root.into());
        self
    }

    pub fn proc_net_dev<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.proc_net_dev = Some(path.into());
        self
    }

    /// Append exclusion patterns
    pub fn exclude<I: IntoIterator<Item = String>>(mut self, patterns: I) -> Self {
        self.exclude.extend(patterns);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig> {
        let config = AppConfig {
            log_level: self.log_level,
            output: self.output.unwrap_or_default(),
            window: self.window.unwrap_or(DEFAULT_SAMPLING_WINDOW),
            source: self.source.unwrap_or_default(),
            sysfs_root: self
                .sysfs_root
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SYSFS_NET_ROOT)),
            proc_net_dev: self
                .proc_net_dev
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_NET_DEV)),
            exclude: self.exclude,
        };

        config.validate()?;
        Ok(config)
    }
}
