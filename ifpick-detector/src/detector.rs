//! Busiest network interface detection.
//!
//! The detector enumerates candidate interfaces, takes a first sample of
//! their combined RX+TX byte counters, waits one sampling window, takes a
//! second sample and picks the interface whose counters grew the most.
//!
//! # Behavior
//!
//! * **Candidates**: loopback is dropped, `name@peer` is reduced to `name`,
//!   duplicates and user exclusions are removed, enumeration order is kept
//! * **Counter failures**: an unreadable interface reads as zero bytes
//! * **Idle host**: when nothing moved, the first candidate is returned
//! * **Cancellation**: the wait between samples can be aborted by the caller
//!
//! # Examples
//!
//! ```rust,no_run
//! use ifpick_detector::BusiestInterfaceDetector;
//! use ifpick_detector::stats::SysfsStatsProvider;
//!
//! async fn pick() -> anyhow::Result<String> {
//!     let detector = BusiestInterfaceDetector::new(SysfsStatsProvider::new());
//!     let selection = detector.detect().await?;
//!     Ok(selection.interface)
//! }
//! ```

use regex::Regex;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use ifpick_shared::errors::{ConfigError, ConfigResult, DetectError, DetectResult};
use ifpick_shared::{
    DEFAULT_SAMPLING_WINDOW, InterfaceDelta, Selection, SelectionReason, TrafficSample,
    is_loopback, normalize_interface_name,
};

use crate::stats::InterfaceStatsProvider;

/// Picks the interface with the highest throughput over a sampling window.
pub struct BusiestInterfaceDetector<P> {
    provider: P,
    window: Duration,
    exclusions: Vec<Regex>,
}

impl<P: InterfaceStatsProvider> BusiestInterfaceDetector<P> {
    /// Creates a detector with the default one second window and no exclusions.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            window: DEFAULT_SAMPLING_WINDOW,
            exclusions: Vec::new(),
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Interfaces whose normalized name fully matches any pattern are skipped.
    pub fn with_exclusions(mut self, exclusions: Vec<Regex>) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Enumerates the candidate interfaces in provider order.
    pub async fn candidates(&self) -> DetectResult<Vec<String>> {
        let raw = self.provider.list_interfaces().await?;
        let mut candidates: Vec<String> = Vec::with_capacity(raw.len());

        for raw_name in raw {
            let Some(name) = normalize_interface_name(&raw_name) else {
                continue;
            };
            if is_loopback(&name) {
                continue;
            }
            if self.exclusions.iter().any(|re| re.is_match(&name)) {
                debug!("Excluding interface {} by pattern", name);
                continue;
            }
            if !candidates.contains(&name) {
                candidates.push(name);
            }
        }

        if candidates.is_empty() {
            return Err(DetectError::NoInterfacesFound);
        }

        Ok(candidates)
    }

    /// Runs a detection to completion.
    pub async fn detect(&self) -> DetectResult<Selection> {
        self.detect_until(std::future::pending()).await
    }

    /// Runs a detection, aborting with [`DetectError::Cancelled`] if `cancel`
    /// resolves before the sampling window has elapsed.
    #[instrument(skip(self, cancel), fields(window_ms = self.window.as_millis() as u64))]
    pub async fn detect_until<F>(&self, cancel: F) -> DetectResult<Selection>
    where
        F: Future<Output = ()>,
    {
        let candidates = self.candidates().await?;
        info!(
            "Sampling {} interface(s) over {:?}: {}",
            candidates.len(),
            self.window,
            candidates.join(", ")
        );

        let first = self.take_sample(&candidates).await;

        tokio::select! {
            biased;
            _ = cancel => {
                warn!("Sampling cancelled before the window elapsed");
                return Err(DetectError::Cancelled);
            }
            _ = tokio::time::sleep(self.window) => {}
        }

        let second = self.take_sample(&candidates).await;
        let deltas = compute_deltas(&first, &second);

        let (interface, reason) = match select_busiest(&deltas) {
            Some(index) => (deltas[index].name.clone(), SelectionReason::Busiest),
            None => {
                warn!(
                    "No traffic observed on any interface, falling back to {}",
                    candidates[0]
                );
                (candidates[0].clone(), SelectionReason::IdleFallback)
            }
        };

        info!("Selected interface {} ({:?})", interface, reason);

        Ok(Selection {
            interface,
            reason,
            window_ms: self.window.as_millis() as u64,
            deltas,
        })
    }

    async fn take_sample(&self, candidates: &[String]) -> TrafficSample {
        let mut sample = TrafficSample::new();
        for name in candidates {
            let total = match self.provider.read_counters(name).await {
                Ok(counters) => counters.total(),
                // A zero here in the first sample turns the whole lifetime
                // counter into the delta if the second read succeeds, so a
                // transient failure can raise an interface's rank.
                Err(e) => {
                    debug!("{}; counting as zero for this sample", e);
                    0
                }
            };
            sample.record(name.as_str(), total);
        }
        sample
    }
}

/// Pair two samples into per-interface deltas, in first-sample order.
///
/// An interface missing from the second sample reads as zero there.
pub fn compute_deltas(first: &TrafficSample, second: &TrafficSample) -> Vec<InterfaceDelta> {
    first
        .iter()
        .map(|(name, before)| {
            let after = second.get(name).unwrap_or(0);
            InterfaceDelta::between(name, before, after)
        })
        .collect()
}

/// Index of the strictly greatest positive delta; the earliest wins ties.
pub fn select_busiest(deltas: &[InterfaceDelta]) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;
    for (index, delta) in deltas.iter().enumerate() {
        let best_delta = best.map(|(_, d)| d).unwrap_or(0);
        if delta.delta > best_delta {
            best = Some((index, delta.delta));
        }
    }
    best.map(|(index, _)| index)
}

/// Compile an exclusion pattern that must match a whole interface name
pub fn exclusion_pattern(pattern: &str) -> ConfigResult<Regex> {
    Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(entries: &[(&str, u64)]) -> TrafficSample {
        let mut sample = TrafficSample::new();
        for (name, bytes) in entries {
            sample.record(*name, *bytes);
        }
        sample
    }

    #[test]
    fn test_compute_deltas() {
        let first = sample(&[("eth0", 1000), ("eth1", 500)]);
        let second = sample(&[("eth0", 1000), ("eth1", 1500)]);

        let deltas = compute_deltas(&first, &second);
        assert_eq!(deltas[0].delta, 0);
        assert_eq!(deltas[1].delta, 1000);
    }

    #[test]
    fn test_compute_deltas_missing_second_reading() {
        let first = sample(&[("eth0", 1000)]);
        let second = sample(&[]);

        let deltas = compute_deltas(&first, &second);
        assert_eq!(deltas[0].second, 0);
        assert_eq!(deltas[0].delta, 0);
    }

    #[test]
    fn test_select_busiest_picks_maximum() {
        let deltas = vec![
            InterfaceDelta::between("eth0", 0, 10),
            InterfaceDelta::between("eth1", 0, 300),
            InterfaceDelta::between("wlan0", 0, 200),
        ];
        assert_eq!(select_busiest(&deltas), Some(1));
    }

    #[test]
    fn test_select_busiest_tie_keeps_first() {
        let deltas = vec![
            InterfaceDelta::between("eth0", 0, 50),
            InterfaceDelta::between("eth1", 100, 150),
        ];
        assert_eq!(select_busiest(&deltas), Some(0));
    }

    #[test]
    fn test_select_busiest_all_idle() {
        let deltas = vec![
            InterfaceDelta::between("eth0", 10, 10),
            InterfaceDelta::between("eth1", 20, 5),
        ];
        assert_eq!(select_busiest(&deltas), None);
        assert_eq!(select_busiest(&[]), None);
    }

    #[test]
    fn test_exclusion_pattern_is_anchored() {
        let re = exclusion_pattern("veth.*").unwrap();
        assert!(re.is_match("veth0"));
        assert!(!re.is_match("myveth0"));

        let re = exclusion_pattern("docker0|br-.*").unwrap();
        assert!(re.is_match("docker0"));
        assert!(re.is_match("br-1a2b"));
        assert!(!re.is_match("docker01"));
    }

    #[test]
    fn test_exclusion_pattern_rejects_invalid_regex() {
        assert!(matches!(
            exclusion_pattern("eth("),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }
}
