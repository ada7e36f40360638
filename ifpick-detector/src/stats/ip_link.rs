//! Interface enumeration through `ip -o link show`.
//!
//! One-line output looks like
//! `5: veth0@if4: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500 ...`; the second
//! `": "`-separated field is the device name, possibly carrying an `@peer`
//! suffix that the detector strips. Counters still come from sysfs.

use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use ifpick_shared::ByteCounters;
use ifpick_shared::errors::{CounterResult, DetectError, DetectResult};

use super::InterfaceStatsProvider;
use super::sysfs::{DEFAULT_SYSFS_NET_ROOT, read_counters_at};

#[derive(Debug, Clone)]
pub struct IpLinkProvider {
    program: String,
    sysfs_root: PathBuf,
}

impl Default for IpLinkProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl IpLinkProvider {
    pub fn new() -> Self {
        Self {
            program: "ip".to_string(),
            sysfs_root: PathBuf::from(DEFAULT_SYSFS_NET_ROOT),
        }
    }

    /// Run a different `ip` binary
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_sysfs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sysfs_root = root.into();
        self
    }

    pub fn sysfs_root(&self) -> &Path {
        &self.sysfs_root
    }
}

impl InterfaceStatsProvider for IpLinkProvider {
    async fn list_interfaces(&self) -> DetectResult<Vec<String>> {
        debug!("Running: {} -o link show", self.program);

        let output = Command::new(&self.program)
            .args(["-o", "link", "show"])
            .output()
            .await
            .map_err(|e| DetectError::EnumerationFailed {
                message: format!("failed to run {}: {}", self.program, e),
            })?;

        if !output.status.success() {
            return Err(DetectError::EnumerationFailed {
                message: format!(
                    "{} -o link show exited with {}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(parse_ip_link_output(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }

    async fn read_counters(&self, interface: &str) -> CounterResult<ByteCounters> {
        read_counters_at(&self.sysfs_root, interface).await
    }
}

/// Extract raw device names from `ip -o link show` output, in output order
pub fn parse_ip_link_output(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut fields = line.splitn(3, ": ");
            let _index = fields.next()?;
            let name = fields.next()?.trim();
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}
