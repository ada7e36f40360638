//! Interface enumeration and byte counter sources.
//!
//! The detector never touches the operating system directly. It goes through
//! an [`InterfaceStatsProvider`], which lists the interfaces present on the
//! host and reads their cumulative byte counters.
//!
//! # Providers
//!
//! * [`SysfsStatsProvider`] - `/sys/class/net`, ordered by ifindex (default)
//! * [`ProcNetDevProvider`] - `/proc/net/dev`, in file order
//! * [`IpLinkProvider`] - `ip -o link show` for names, sysfs for counters

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;

use ifpick_shared::ByteCounters;
use ifpick_shared::errors::{ConfigError, CounterResult, DetectResult};

pub mod ip_link;
pub mod proc_net_dev;
pub mod sysfs;

pub use ip_link::IpLinkProvider;
pub use proc_net_dev::ProcNetDevProvider;
pub use sysfs::SysfsStatsProvider;

/// Source of interface names and byte counters.
///
/// `list_interfaces` failures are fatal to a detection run, while
/// `read_counters` failures only affect the interface concerned.
pub trait InterfaceStatsProvider {
    /// Raw interface names in enumeration order, unnormalized
    fn list_interfaces(&self) -> impl Future<Output = DetectResult<Vec<String>>> + Send;

    /// Current cumulative counters of one interface
    fn read_counters(
        &self,
        interface: &str,
    ) -> impl Future<Output = CounterResult<ByteCounters>> + Send;
}

/// Which host facility to read interface statistics from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatsSource {
    #[default]
    Sysfs,
    Proc,
    IpLink,
}

impl fmt::Display for StatsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsSource::Sysfs => write!(f, "sysfs"),
            StatsSource::Proc => write!(f, "proc"),
            StatsSource::IpLink => write!(f, "ip-link"),
        }
    }
}

impl FromStr for StatsSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sysfs" => Ok(StatsSource::Sysfs),
            "proc" | "proc-net-dev" => Ok(StatsSource::Proc),
            "ip-link" | "ip" => Ok(StatsSource::IpLink),
            _ => Err(ConfigError::UnknownSource {
                name: s.to_string(),
            }),
        }
    }
}

/// Host provider chosen at runtime from configuration
#[derive(Debug, Clone)]
pub enum SystemStatsProvider {
    Sysfs(SysfsStatsProvider),
    ProcNetDev(ProcNetDevProvider),
    IpLink(IpLinkProvider),
}

impl SystemStatsProvider {
    pub fn source(&self) -> StatsSource {
        match self {
            SystemStatsProvider::Sysfs(_) => StatsSource::Sysfs,
            SystemStatsProvider::ProcNetDev(_) => StatsSource::Proc,
            SystemStatsProvider::IpLink(_) => StatsSource::IpLink,
        }
    }
}

impl InterfaceStatsProvider for SystemStatsProvider {
    async fn list_interfaces(&self) -> DetectResult<Vec<String>> {
        match self {
            SystemStatsProvider::Sysfs(p) => p.list_interfaces().await,
            SystemStatsProvider::ProcNetDev(p) => p.list_interfaces().await,
            SystemStatsProvider::IpLink(p) => p.list_interfaces().await,
        }
    }

    async fn read_counters(&self, interface: &str) -> CounterResult<ByteCounters> {
        match self {
            SystemStatsProvider::Sysfs(p) => p.read_counters(interface).await,
            SystemStatsProvider::ProcNetDev(p) => p.read_counters(interface).await,
            SystemStatsProvider::IpLink(p) => p.read_counters(interface).await,
        }
    }
}
