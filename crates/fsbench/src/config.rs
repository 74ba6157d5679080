//! Resolved configuration for a single benchmark invocation.

use crate::mount::MountOptions;
use crate::registry::Filesystem;
use crate::workload::WorkloadSpec;
use std::path::PathBuf;
use std::time::Duration;

/// Default workload generator executable.
pub const DEFAULT_FSOPS: &str = "fsops";

/// Default unmount utility.
pub const DEFAULT_FUSERMOUNT: &str = "fusermount";

/// Default limit on waiting for a FUSE mount to appear.
pub const DEFAULT_MOUNT_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between mount readiness checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// External executables and timing knobs.
#[derive(Debug, Clone)]
pub struct Tools {
    /// Workload generator, invoked as `<fsops> <op> <path> <kiters>`.
    pub fsops: PathBuf,
    /// Unmount utility, invoked as `<fusermount> -u <dir>`.
    pub fusermount: PathBuf,
    pub mount_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            fsops: PathBuf::from(DEFAULT_FSOPS),
            fusermount: PathBuf::from(DEFAULT_FUSERMOUNT),
            mount_timeout: DEFAULT_MOUNT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Everything needed to run one measurement.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub filesystem: &'static Filesystem,
    pub mount_options: MountOptions,
    pub workload: WorkloadSpec,
    /// Run two workload processes concurrently.
    pub parallel: bool,
    pub tools: Tools,
}
