//! Interface statistics from sysfs.
//!
//! Every network device appears as a directory under `/sys/class/net`,
//! exposing `ifindex` and `statistics/{rx,tx}_bytes`. Devices are enumerated
//! in ifindex order so the first candidate matches what `ip link` lists first.

use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use ifpick_shared::ByteCounters;
use ifpick_shared::errors::{CounterReadError, CounterResult, DetectError, DetectResult};

use super::InterfaceStatsProvider;

/// Default sysfs directory holding one entry per network device
pub const DEFAULT_SYSFS_NET_ROOT: &str = "/sys/class/net";

#[derive(Debug, Clone)]
pub struct SysfsStatsProvider {
    root: PathBuf,
}

impl Default for SysfsStatsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SysfsStatsProvider {
    pub fn new() -> Self {
        Self::with_root(DEFAULT_SYSFS_NET_ROOT)
    }

    /// Use an alternate sysfs net root (tests, chroots, bind mounts)
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl InterfaceStatsProvider for SysfsStatsProvider {
    async fn list_interfaces(&self) -> DetectResult<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(|e| {
            DetectError::EnumerationFailed {
                message: format!("cannot read {}: {}", self.root.display(), e),
            }
        })?;

        let mut devices: Vec<(u64, String)> = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DetectError::EnumerationFailed {
                message: format!("cannot list {}: {}", self.root.display(), e),
            })?
        {
            let path = entry.path();
            // Plain files such as bonding_masters live alongside the devices
            let is_device = tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if !is_device {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let ifindex = read_u64(&path.join("ifindex")).await.unwrap_or(u64::MAX);
            devices.push((ifindex, name));
        }

        devices.sort();
        debug!(
            "Found {} devices under {}",
            devices.len(),
            self.root.display()
        );

        Ok(devices.into_iter().map(|(_, name)| name).collect())
    }

    async fn read_counters(&self, interface: &str) -> CounterResult<ByteCounters> {
        read_counters_at(&self.root, interface).await
    }
}

/// Read `statistics/{rx,tx}_bytes` of `interface` below a sysfs net root
pub(crate) async fn read_counters_at(root: &Path, interface: &str) -> CounterResult<ByteCounters> {
    let stats_dir = root.join(interface).join("statistics");

    let rx_bytes = read_u64(&stats_dir.join("rx_bytes"))
        .await
        .map_err(|e| CounterReadError::unavailable(interface, format!("rx_bytes: {}", e)))?;
    let tx_bytes = read_u64(&stats_dir.join("tx_bytes"))
        .await
        .map_err(|e| CounterReadError::unavailable(interface, format!("tx_bytes: {}", e)))?;

    Ok(ByteCounters::new(rx_bytes, tx_bytes))
}

async fn read_u64(path: &Path) -> io::Result<u64> {
    let contents = tokio::fs::read_to_string(path).await?;
    contents
        .trim()
        .parse()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}


#[cfg(test)]
mod tests {
    use super::test_support::write_device;
    use super::*;

    #[tokio::test]
    async fn test_lists_devices_in_ifindex_order() {
        let root = tempfile::tempdir().unwrap();
        write_device(root.path(), "wlan0", 3, 0, 0);
        write_device(root.path(), "lo", 1, 0, 0);
        write_device(root.path(), "eth0", 2, 0, 0);
        std::fs::write(root.path().join("bonding_masters"), "\n").unwrap();

        let provider = SysfsStatsProvider::with_root(root.path());
        let names = provider.list_interfaces().await.unwrap();

        assert_eq!(names, vec!["lo", "eth0", "wlan0"]);
    }

    #[tokio::test]
    async fn test_missing_ifindex_sorts_last() {
        let root = tempfile::tempdir().unwrap();
        write_device(root.path(), "eth0", 2, 0, 0);
        std::fs::create_dir_all(root.path().join("dummy0")).unwrap();

        let provider = SysfsStatsProvider::with_root(root.path());
        let names = provider.list_interfaces().await.unwrap();

        assert_eq!(names, vec!["eth0", "dummy0"]);
    }

    #[tokio::test]
    async fn test_missing_root_fails_enumeration() {
        let root = tempfile::tempdir().unwrap();
        let provider = SysfsStatsProvider::with_root(root.path().join("absent"));

        let result = provider.list_interfaces().await;
        assert!(matches!(result, Err(DetectError::EnumerationFailed { .. })));
    }

    #[tokio::test]
    async fn test_reads_counters() {
        let root = tempfile::tempdir().unwrap();
        write_device(root.path(), "eth0", 2, 1234567, 9876543);

        let provider = SysfsStatsProvider::with_root(root.path());
        let counters = provider.read_counters("eth0").await.unwrap();

        assert_eq!(counters, ByteCounters::new(1234567, 9876543));
    }

    #[tokio::test]
    async fn test_unreadable_counters_are_unavailable() {
        let root = tempfile::tempdir().unwrap();
        write_device(root.path(), "eth0", 2, 1, 1);
        std::fs::write(
            root.path().join("eth0").join("statistics").join("tx_bytes"),
            "garbage",
        )
        .unwrap();

        let provider = SysfsStatsProvider::with_root(root.path());

        let err = provider.read_counters("eth0").await.unwrap_err();
        assert!(matches!(err, CounterReadError::Unavailable { ref interface, .. } if interface == "eth0"));

        let err = provider.read_counters("eth9").await.unwrap_err();
        assert!(matches!(err, CounterReadError::Unavailable { .. }));
    }
}
