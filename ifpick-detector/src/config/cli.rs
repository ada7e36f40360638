//! CLI argument parsing for ifpick.
//!
//! This module handles command line argument parsing using clap and provides
//! a structured representation of CLI configuration that is later merged
//! with the optional configuration file.

use anyhow::Result;
use clap::{Arg, ArgMatches, Command};

use ifpick_shared::parse_sampling_window;

use crate::stats::StatsSource;

/// CLI configuration structure containing all parsed command line arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub verbose: bool,
    pub json: bool,
    pub window: Option<String>,
    pub source: Option<String>,
    pub sysfs_root: Option<String>,
    pub proc_net_dev: Option<String>,
    pub exclude: Vec<String>,
    pub config_file: Option<String>,
}

impl CliConfig {
    /// Parse CLI arguments and create CliConfig
    pub fn from_args() -> Result<Self> {
        let matches = Self::build_cli().get_matches();
        Self::from_matches(&matches)
    }

    /// Create CliConfig from pre-parsed ArgMatches (useful for testing)
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let exclude: Vec<String> = matches
            .get_many::<String>("exclude")
            .map(|vals| vals.cloned().collect())
            .unwrap_or_default();

        Ok(Self {
            verbose: matches.get_flag("verbose"),
            json: matches.get_flag("json"),
            window: matches.get_one::<String>("window").cloned(),
            source: matches.get_one::<String>("source").cloned(),
            sysfs_root: matches.get_one::<String>("sysfs-root").cloned(),
            proc_net_dev: matches.get_one::<String>("proc-net-dev").cloned(),
            exclude,
            config_file: matches.get_one::<String>("config").cloned(),
        })
    }

    /// Build the clap Command structure
    pub fn build_cli() -> Command {
        Command::new("ifpick")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Print the busiest network interface")
            .long_about("Samples the byte counters of every non-loopback network interface twice, \
                       one sampling window apart, and prints the interface that moved the most \
                       traffic. When no interface moved any traffic, the first one is printed.")
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .action(clap::ArgAction::SetTrue)
                    .help("Enable verbose logging")
                    .long_help("Enable debug logging on stderr, including the candidate list, \
                              per-interface counter failures and the computed deltas."),
            )
            .arg(
                Arg::new("json")
                    .long("json")
                    .action(clap::ArgAction::SetTrue)
                    .help("Print the full selection report as JSON"),
            )
            .arg(
                Arg::new("window")
                    .short('w')
                    .long("window")
                    .value_name("DURATION")
                    .help("Sampling window between the two counter reads (default: 1s)")
                    .long_help("Time between the two counter samples, e.g. 500ms, 1s, 2s. \
                              Must be at least 1ms and at most 60s."),
            )
            .arg(
                Arg::new("source")
                    .short('s')
                    .long("source")
                    .value_name("SOURCE")
                    .help("Where to read interface statistics from")
                    .long_help("Interface statistics source. 'sysfs' reads /sys/class/net, \
                              'proc' parses /proc/net/dev and 'ip-link' enumerates with \
                              `ip -o link show` while reading counters from sysfs.")
                    .value_parser(["sysfs", "proc", "ip-link"]),
            )
            .arg(
                Arg::new("sysfs-root")
                    .long("sysfs-root")
                    .value_name("PATH")
                    .help("Alternate sysfs network class directory (default: /sys/class/net)"),
            )
            .arg(
                Arg::new("proc-net-dev")
                    .long("proc-net-dev")
                    .value_name("PATH")
                    .help("Alternate /proc/net/dev file"),
            )
            .arg(
                Arg::new("exclude")
                    .short('x')
                    .long("exclude")
                    .value_name("REGEX")
                    .action(clap::ArgAction::Append)
                    .help("Skip interfaces whose name fully matches REGEX")
                    .long_help("Skip interfaces whose normalized name fully matches the regular \
                              expression, e.g. 'veth.*' or 'docker\\d+'. Can be specified \
                              multiple times; patterns from the config file are kept."),
            )
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("JSON5 configuration file")
                    .long_help("JSON5 file providing defaults for window, source, sysfs_root, \
                              proc_net_dev, exclude and log_level. Command line flags take \
                              precedence over file values."),
            )
    }

    /// Validate CLI configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(window) = &self.window {
            parse_sampling_window(window)?;
        }

        if let Some(source) = &self.source {
            source.parse::<StatsSource>()?;
        }

        if self.exclude.iter().any(|p| p.trim().is_empty()) {
            return Err(anyhow::anyhow!("Exclude patterns cannot be empty"));
        }

        Ok(())
    }
}
