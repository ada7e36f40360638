//! Interface statistics from `/proc/net/dev`.
//!
//! The file starts with two header lines followed by one line per device:
//! `name: rx_bytes rx_packets ... (8 receive fields) tx_bytes tx_packets ...`.
//! The whole file is re-read for every counter query, so each reading is as
//! fresh as the kernel's.

use std::path::{Path, PathBuf};
use tracing::debug;

use ifpick_shared::ByteCounters;
use ifpick_shared::errors::{CounterReadError, CounterResult, DetectError, DetectResult};

use super::InterfaceStatsProvider;

pub const DEFAULT_PROC_NET_DEV: &str = "/proc/net/dev";

/// Index of the transmit byte column among the whitespace-separated fields
const TX_BYTES_FIELD: usize = 8;
/// Receive and transmit sections carry 8 fields each
const MIN_FIELDS: usize = 16;

#[derive(Debug, Clone)]
pub struct ProcNetDevProvider {
    path: PathBuf,
}

impl Default for ProcNetDevProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcNetDevProvider {
    pub fn new() -> Self {
        Self::with_path(DEFAULT_PROC_NET_DEV)
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_table(&self) -> std::io::Result<Vec<(String, Option<ByteCounters>)>> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        Ok(parse_proc_net_dev(&contents))
    }
}

impl InterfaceStatsProvider for ProcNetDevProvider {
    async fn list_interfaces(&self) -> DetectResult<Vec<String>> {
        let table = self
            .read_table()
            .await
            .map_err(|e| DetectError::EnumerationFailed {
                message: format!("cannot read {}: {}", self.path.display(), e),
            })?;

        debug!("Parsed {} devices from {}", table.len(), self.path.display());
        Ok(table.into_iter().map(|(name, _)| name).collect())
    }

    async fn read_counters(&self, interface: &str) -> CounterResult<ByteCounters> {
        let table = self
            .read_table()
            .await
            .map_err(|e| CounterReadError::unavailable(interface, e))?;

        match table.into_iter().find(|(name, _)| name == interface) {
            Some((_, Some(counters))) => Ok(counters),
            Some((_, None)) => Err(CounterReadError::unavailable(
                interface,
                "malformed counter line",
            )),
            None => Err(CounterReadError::unavailable(
                interface,
                format!("not listed in {}", self.path.display()),
            )),
        }
    }
}

/// Parse `/proc/net/dev` contents into (device name, counters) pairs.
///
/// Devices keep file order. A device whose counter fields are missing or not
/// numeric is still listed, with `None` counters.
pub fn parse_proc_net_dev(contents: &str) -> Vec<(String, Option<ByteCounters>)> {
    contents
        .lines()
        .skip(2)
        .filter_map(|line| {
            let (name_part, stats_part) = line.split_once(':')?;
            let name = name_part.trim();
            if name.is_empty() {
                return None;
            }

            let fields: Vec<&str> = stats_part.split_whitespace().collect();
            let counters = if fields.len() >= MIN_FIELDS {
                match (
                    fields[0].parse::<u64>(),
                    fields[TX_BYTES_FIELD].parse::<u64>(),
                ) {
                    (Ok(rx), Ok(tx)) => Some(ByteCounters::new(rx, tx)),
                    _ => None,
                }
            } else {
                None
            };

            Some((name.to_string(), counters))
        })
        .collect()
}
