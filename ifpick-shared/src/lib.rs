//! Shared types for ifpick.
//!
//! This crate holds the plain data exchanged between the stats providers,
//! the busiest-interface detector and whatever consumes its result: interface
//! name normalization, byte counter readings, traffic samples and the final
//! selection report.
//!
//! # Key Components
//!
//! * [`ByteCounters`] - Cumulative RX/TX byte counters of one interface
//! * [`TrafficSample`] - Combined byte counts of every candidate at one instant
//! * [`InterfaceDelta`] - Traffic observed on one interface across a window
//! * [`Selection`] - The chosen interface plus the deltas that justified it
//! * [`errors`] - Detection, counter and configuration error types

use serde::{Deserialize, Serialize};
use std::time::Duration;

use duration_string::DurationString;

pub mod errors;

use errors::{ConfigError, ConfigResult};

/// Name of the loopback device, never a detection candidate
pub const LOOPBACK_INTERFACE: &str = "lo";

/// Default interval between the two counter samples
pub const DEFAULT_SAMPLING_WINDOW: Duration = Duration::from_secs(1);

/// Lower bound accepted for a configured sampling window; reports carry whole milliseconds
pub const MIN_SAMPLING_WINDOW: Duration = Duration::from_millis(1);

/// Upper bound accepted for a configured sampling window
pub const MAX_SAMPLING_WINDOW: Duration = Duration::from_secs(60);

/// Reduce a raw interface name to its base device name.
///
/// `ip link` reports tagged or peer-linked devices as `name@peer`
/// (e.g. `veth0@if5`, `eth0.100@eth0`); only the part before the first `@`
/// identifies the device. Returns `None` when nothing usable remains.
pub fn normalize_interface_name(raw: &str) -> Option<String> {
    let base = raw.split('@').next().unwrap_or(raw).trim();
    if base.is_empty() {
        None
    } else {
        Some(base.to_string())
    }
}

/// Whether the (normalized) interface name designates the loopback device
pub fn is_loopback(name: &str) -> bool {
    name == LOOPBACK_INTERFACE
}

/// Parse a sampling window such as "500ms", "1s" or "2s".
///
/// Uses the `duration-string` crate format. The window must lie between
/// [`MIN_SAMPLING_WINDOW`] and [`MAX_SAMPLING_WINDOW`].
pub fn parse_sampling_window(input: &str) -> ConfigResult<Duration> {
    let parsed: DurationString =
        input
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidWindow {
                input: input.to_string(),
                reason: format!("{}", e),
            })?;

    let window: Duration = parsed.into();
    validate_sampling_window(window).map_err(|reason| ConfigError::InvalidWindow {
        input: input.to_string(),
        reason,
    })?;

    Ok(window)
}

/// Check that a sampling window is usable
pub fn validate_sampling_window(window: Duration) -> Result<(), String> {
    if window < MIN_SAMPLING_WINDOW {
        return Err(format!(
            "sampling window must be at least {}ms",
            MIN_SAMPLING_WINDOW.as_millis()
        ));
    }
    if window > MAX_SAMPLING_WINDOW {
        return Err(format!(
            "sampling window must not exceed {}s",
            MAX_SAMPLING_WINDOW.as_secs()
        ));
    }
    Ok(())
}

/// Cumulative byte counters of a single interface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

impl ByteCounters {
    pub fn new(rx_bytes: u64, tx_bytes: u64) -> Self {
        Self { rx_bytes, tx_bytes }
    }

    /// Received plus transmitted bytes
    pub fn total(&self) -> u64 {
        self.rx_bytes.saturating_add(self.tx_bytes)
    }
}

/// Combined RX+TX byte counts of every candidate interface at one instant.
///
/// Entries keep the order in which they were recorded, which is the
/// enumeration order of the candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficSample {
    counters: Vec<(String, u64)>,
}

impl TrafficSample {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the combined byte count for an interface
    pub fn record(&mut self, interface: impl Into<String>, total_bytes: u64) {
        self.counters.push((interface.into(), total_bytes));
    }

    /// Byte count recorded for `interface`, if any
    pub fn get(&self, interface: &str) -> Option<u64> {
        self.counters
            .iter()
            .find(|(name, _)| name == interface)
            .map(|(_, bytes)| *bytes)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counters
            .iter()
            .map(|(name, bytes)| (name.as_str(), *bytes))
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

/// Traffic seen on one interface between two samples
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDelta {
    pub name: String,
    pub first: u64,
    pub second: u64,
    /// `second - first`, clamped at zero when the counter went backwards
    pub delta: u64,
}

impl InterfaceDelta {
    pub fn between(name: impl Into<String>, first: u64, second: u64) -> Self {
        Self {
            name: name.into(),
            first,
            second,
            delta: second.saturating_sub(first),
        }
    }
}

/// Why an interface was selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    /// Strictly greatest positive delta among the candidates
    Busiest,
    /// No candidate moved any traffic; the first enumerated one was taken
    IdleFallback,
}

/// Result of a busiest-interface detection run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Selected interface name
    pub interface: String,
    pub reason: SelectionReason,
    /// Sampling window in milliseconds
    pub window_ms: u64,
    /// Per-candidate deltas in enumeration order
    pub deltas: Vec<InterfaceDelta>,
}

impl Selection {
    /// Delta observed on the selected interface
    pub fn selected_delta(&self) -> u64 {
        self.deltas
            .iter()
            .find(|d| d.name == self.interface)
            .map(|d| d.delta)
            .unwrap_or(0)
    }
}
