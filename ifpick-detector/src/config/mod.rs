//! Configuration management module for ifpick.
//!
//! This module provides centralized configuration management with support for:
//! - CLI argument parsing
//! - JSON5 configuration files
//! - Environment-driven log filtering
//! - Builder pattern for configuration construction

pub mod app_config;
pub mod cli;

pub use app_config::{AppConfig, AppConfigBuilder, FileConfig, LogLevel, OutputFormat};
pub use cli::CliConfig;

use anyhow::Result;

/// Parses the process arguments and loads the referenced config file
pub fn from_cli_and_env() -> Result<AppConfig> {
    let cli_config = CliConfig::from_args()?;
    AppConfig::from_cli(&cli_config)
}
