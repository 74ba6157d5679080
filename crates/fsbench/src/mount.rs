//! Launching and tearing down the filesystem under test.
//!
//! FUSE servers are started detached and left running; the harness never
//! waits on them. Teardown goes through `fusermount -u`, either explicitly
//! via [`MountGuard::stop`] or, when an earlier step failed, from the guard's
//! `Drop` impl.

use crate::config::Tools;
use crate::error::{BenchError, Result};
use crate::registry::Filesystem;
use crate::signal;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// GHC runtime flags requesting two capabilities.
///
/// Always passed to GHC-built filesystems, whether or not the workload runs
/// in parallel.
const GHC_RTS_ARGS: &[&str] = &["+RTS", "-N2", "-RTS"];

/// FUSE cache toggles passed through `-o`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct MountOptions {
    /// Entry (name) cache: `entry_timeout`.
    pub name_cache: bool,
    /// Attribute cache: `attr_timeout`.
    pub attr_cache: bool,
    /// Negative name cache: `negative_timeout`.
    pub neg_name_cache: bool,
    /// Kernel page cache: `kernel_cache`.
    pub kernel_cache: bool,
}

fn timeout_if(name: &str, toggle: bool) -> String {
    format!("{name}={}", u8::from(toggle))
}

impl MountOptions {
    /// Render the comma-separated `-o` option string.
    pub fn option_string(&self) -> String {
        let mut opts = [
            "auto_unmount".to_string(),
            timeout_if("entry_timeout", self.name_cache),
            timeout_if("negative_timeout", self.neg_name_cache),
            timeout_if("attr_timeout", self.attr_cache),
        ]
        .join(",");
        if self.kernel_cache {
            opts.push_str(",kernel_cache");
        }
        opts
    }
}

/// Full argument list for launching `fs` with `opts`.
pub fn launch_args(fs: &Filesystem, opts: &MountOptions) -> Vec<String> {
    let mut args: Vec<String> = fs.args.iter().map(ToString::to_string).collect();
    if fs.requires_mount() {
        args.push("-o".to_string());
        args.push(opts.option_string());
    }
    if fs.uses_ghc_runtime() {
        args.extend(GHC_RTS_ARGS.iter().map(ToString::to_string));
    }
    args
}

/// Starts filesystems and hands back guards that unmount them.
#[derive(Debug, Clone)]
pub struct Launcher {
    fusermount: PathBuf,
    mount_timeout: Duration,
    poll_interval: Duration,
    interrupted: fn() -> bool,
}

impl Launcher {
    pub fn new(tools: &Tools) -> Self {
        Self {
            fusermount: tools.fusermount.clone(),
            mount_timeout: tools.mount_timeout,
            poll_interval: tools.poll_interval,
            interrupted: signal::shutdown_requested,
        }
    }

    /// Launch `fs` and wait for its mount to appear.
    ///
    /// Native filesystems get an inert guard and nothing is spawned. For FUSE
    /// servers, a launcher process that exits unsuccessfully before the mount
    /// shows up is fatal; a mount that simply takes longer than the configured
    /// timeout is only logged. An interrupt during the wait unmounts whatever
    /// may have come up and returns [`BenchError::Interrupted`].
    pub fn start(&self, fs: &'static Filesystem, opts: &MountOptions) -> Result<MountGuard> {
        if !fs.requires_mount() {
            tracing::debug!("{fs} needs no mount, skipping launch");
            return Ok(MountGuard::inert(fs, self.fusermount.clone()));
        }

        let args = launch_args(fs, opts);
        tracing::debug!("Launching {} {}", fs.binary, args.join(" "));

        let mut child = Command::new(fs.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| BenchError::spawn(fs.binary, e))?;

        let waited = self.wait_for_mount(fs, &mut child);
        let guard = MountGuard {
            fs,
            fusermount: self.fusermount.clone(),
            child: Some(child),
            mounted: !matches!(waited, Err(BenchError::MountLaunch { .. })),
        };
        // On interrupt the guard drops here and unmounts.
        waited.map(|()| guard)
    }

    /// Poll until `fs.mount_dir()` sits on a different device than its parent.
    fn wait_for_mount(&self, fs: &Filesystem, child: &mut Child) -> Result<()> {
        let mount_dir = fs.mount_dir();
        let deadline = Instant::now() + self.mount_timeout;

        while Instant::now() < deadline {
            if (self.interrupted)() {
                tracing::debug!("Interrupted while waiting for {}", mount_dir.display());
                return Err(BenchError::Interrupted);
            }

            if is_mount_point(mount_dir) {
                tracing::debug!("Mount confirmed active at {}", mount_dir.display());
                return Ok(());
            }

            // Daemonizing servers exit 0 once mounted; anything else means the
            // mount never happened.
            match child.try_wait() {
                Ok(Some(status)) if !status.success() => {
                    return Err(BenchError::MountLaunch {
                        program: fs.binary.to_string(),
                        status,
                    });
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("Could not poll {}: {}", fs.binary, e),
            }

            std::thread::sleep(self.poll_interval);
        }

        tracing::warn!(
            "{} did not appear as a mount within {:?}, continuing anyway",
            mount_dir.display(),
            self.mount_timeout
        );
        Ok(())
    }
}

/// Whether `path` is the root of a mount (device differs from its parent).
#[cfg(unix)]
fn is_mount_point(path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    let parent = path.parent().unwrap_or(Path::new("/"));
    match (std::fs::metadata(path), std::fs::metadata(parent)) {
        (Ok(path_meta), Ok(parent_meta)) => path_meta.dev() != parent_meta.dev(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn is_mount_point(path: &Path) -> bool {
    path.exists()
}

/// A running filesystem. Unmounts on [`stop`](Self::stop) or drop.
#[derive(Debug)]
pub struct MountGuard {
    fs: &'static Filesystem,
    fusermount: PathBuf,
    child: Option<Child>,
    mounted: bool,
}

impl MountGuard {
    fn inert(fs: &'static Filesystem, fusermount: PathBuf) -> Self {
        Self {
            fs,
            fusermount,
            child: None,
            mounted: false,
        }
    }

    /// Unmount the filesystem. A failing unmount is fatal.
    pub fn stop(mut self) -> Result<()> {
        if !self.mounted {
            return Ok(());
        }
        // Never retry from Drop, even if this attempt fails.
        self.mounted = false;

        let dir = self.fs.mount_dir().to_path_buf();
        tracing::info!("Unmounting {} at {}", self.fs, dir.display());
        let status = self.unmount_command(&dir).status().map_err(|e| {
            BenchError::spawn(self.fusermount.display().to_string(), e)
        })?;
        if !status.success() {
            return Err(BenchError::Unmount { dir, status });
        }
        self.reap();
        Ok(())
    }

    fn unmount_command(&self, dir: &Path) -> Command {
        let mut cmd = Command::new(&self.fusermount);
        cmd.arg("-u").arg(dir).stdin(Stdio::null()).stdout(Stdio::null());
        cmd
    }

    fn reap(&mut self) {
        if let Some(mut child) = self.child.take() {
            match child.try_wait() {
                Ok(Some(status)) => tracing::debug!("{} exited: {}", self.fs.binary, status),
                Ok(None) => tracing::debug!("{} still shutting down", self.fs.binary),
                Err(e) => tracing::debug!("Could not poll {}: {}", self.fs.binary, e),
            }
        }
    }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;

        let dir = self.fs.mount_dir().to_path_buf();
        tracing::debug!("Cleaning up mount at {}", dir.display());
        match self.unmount_command(&dir).status() {
            Ok(status) if status.success() => {}
            Ok(status) => tracing::warn!("Failed to unmount {}: {}", dir.display(), status),
            Err(e) => tracing::warn!("Failed to run {}: {}", self.fusermount.display(), e),
        }
        self.reap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;

    #[test]
    fn test_option_string_defaults() {
        assert_eq!(
            MountOptions::default().option_string(),
            "auto_unmount,entry_timeout=0,negative_timeout=0,attr_timeout=0"
        );
    }

    #[test]
    fn test_option_string_attr_and_kernel() {
        let opts = MountOptions {
            name_cache: false,
            neg_name_cache: false,
            attr_cache: true,
            kernel_cache: true,
        };
        assert_eq!(
            opts.option_string(),
            "auto_unmount,entry_timeout=0,negative_timeout=0,attr_timeout=1,kernel_cache"
        );
    }

    #[test]
    fn test_option_string_all_caches() {
        let opts = MountOptions {
            name_cache: true,
            attr_cache: true,
            neg_name_cache: true,
            kernel_cache: false,
        };
        assert_eq!(
            opts.option_string(),
            "auto_unmount,entry_timeout=1,negative_timeout=1,attr_timeout=1"
        );
    }

    #[test]
    fn test_launch_args_ghc() {
        let fs = registry::lookup("fscq").unwrap();
        let args = launch_args(fs, &MountOptions::default());
        assert_eq!(
            args,
            [
                "disk.img",
                "/tmp/fscq",
                "-o",
                "auto_unmount,entry_timeout=0,negative_timeout=0,attr_timeout=0",
                "+RTS",
                "-N2",
                "-RTS",
            ]
        );
    }

    #[test]
    fn test_launch_args_plain_fuse() {
        let fs = registry::lookup("cfuse").unwrap();
        let opts = MountOptions {
            kernel_cache: true,
            ..MountOptions::default()
        };
        let args = launch_args(fs, &opts);
        assert_eq!(args.len(), 3);
        assert_eq!(args[1], "-o");
        assert!(args[2].ends_with(",kernel_cache"));
    }

    #[test]
    fn test_launch_args_native_empty() {
        let fs = registry::lookup("native").unwrap();
        assert!(launch_args(fs, &MountOptions::default()).is_empty());
    }

    #[test]
    fn test_native_start_is_inert() {
        let tools = Tools {
            fusermount: PathBuf::from("/nonexistent/fusermount"),
            ..Tools::default()
        };
        let launcher = Launcher::new(&tools);
        let guard = launcher
            .start(registry::lookup("native").unwrap(), &MountOptions::default())
            .unwrap();
        assert!(!guard.mounted);
        // Would fail if it tried to run the bogus fusermount.
        guard.stop().unwrap();
    }

    #[cfg(unix)]
    fn launcher(timeout: Duration, interrupted: fn() -> bool) -> Launcher {
        Launcher {
            mount_timeout: timeout,
            interrupted,
            ..Launcher::new(&Tools::default())
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_interrupt_stops_mount_wait() {
        let fs = registry::lookup("hello").unwrap();
        let mut child = Command::new("sleep").arg("5").spawn().unwrap();
        let start = Instant::now();
        let result = launcher(Duration::from_secs(10), || true).wait_for_mount(fs, &mut child);
        child.kill().unwrap();
        child.wait().unwrap();
        assert!(matches!(result, Err(BenchError::Interrupted)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_launch_is_fatal() {
        let fs = registry::lookup("hello").unwrap();
        let mut child = Command::new("false").spawn().unwrap();
        let result = launcher(Duration::from_secs(10), || false).wait_for_mount(fs, &mut child);
        assert!(matches!(result, Err(BenchError::MountLaunch { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_root_is_not_reported_as_child_mount() {
        // `/` is its own parent, so the device ids always match.
        assert!(!is_mount_point(Path::new("/")));
        assert!(!is_mount_point(Path::new("/nonexistent/mount/dir")));
    }
}
