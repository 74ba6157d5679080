//! Driving the external workload generator.
//!
//! The generator performs one operation kind in a tight loop and reports
//! nothing; all timing happens here, around the whole process lifetime.

use crate::error::{BenchError, Result};
use crate::registry::Filesystem;
use clap::ValueEnum;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Appended to the representative path to guarantee a miss.
pub const MISSING_SUFFIX: char = 'x';

/// Iterations (in thousands) used for the discarded warmup run.
const WARMUP_KITERS: u32 = 1;

/// Generators run at once in a parallel pass.
const PARALLEL_COPIES: usize = 2;

/// Filesystem operation performed by the workload generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Operation {
    /// `stat(2)` the target path.
    #[default]
    Stat,
    /// `open(2)` and close the target path.
    Open,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stat => "stat",
            Self::Open => "open",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to run against the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadSpec {
    pub operation: Operation,
    /// Target the existing fixture rather than a missing sibling.
    pub exists: bool,
    /// Thousands of iterations per generator invocation.
    pub kiters: u32,
}

impl WorkloadSpec {
    /// Path the generator operates on.
    pub fn target_path(&self, fs: &Filesystem) -> String {
        if self.exists {
            fs.filename.to_string()
        } else {
            format!("{}{MISSING_SUFFIX}", fs.filename)
        }
    }

    /// Generator arguments: `[operation, path, kiters]`.
    pub fn args(&self, fs: &Filesystem) -> [String; 3] {
        [
            self.operation.to_string(),
            self.target_path(fs),
            self.kiters.to_string(),
        ]
    }

    /// Same operation and target with a single thousand iterations.
    #[must_use]
    pub fn warmup(&self) -> Self {
        Self {
            kiters: WARMUP_KITERS,
            ..*self
        }
    }
}

/// Runs the workload generator and times it.
#[derive(Debug, Clone)]
pub struct WorkloadRunner {
    fsops: PathBuf,
}

impl WorkloadRunner {
    pub fn new(fsops: impl Into<PathBuf>) -> Self {
        Self {
            fsops: fsops.into(),
        }
    }

    /// Run the discarded warmup pass. Never parallel.
    pub fn warmup(&self, spec: &WorkloadSpec, fs: &Filesystem) -> Result<()> {
        let elapsed = self.run(&spec.warmup(), fs, false)?;
        tracing::debug!("Warmup finished in {:?}", elapsed);
        Ok(())
    }

    /// Run one generator, or two concurrently when `parallel` is set, and
    /// return the wall-clock time until the last one exits.
    pub fn run(&self, spec: &WorkloadSpec, fs: &Filesystem, parallel: bool) -> Result<Duration> {
        let args = spec.args(fs);
        let copies = if parallel { PARALLEL_COPIES } else { 1 };
        tracing::debug!(
            "Running {} x{} {}",
            self.fsops.display(),
            copies,
            args.join(" ")
        );

        let start = Instant::now();
        if parallel {
            self.run_concurrently(&args, copies)?;
        } else {
            let status = self.spawn(&args)?.wait().map_err(|e| self.spawn_error(e))?;
            self.check(status)?;
        }
        Ok(start.elapsed())
    }

    /// Run `copies` generators at once. The first failure kills the rest.
    fn run_concurrently(&self, args: &[String], copies: usize) -> Result<()> {
        let mut children = Vec::with_capacity(copies);
        for _ in 0..copies {
            match self.spawn(args) {
                Ok(child) => children.push(child),
                Err(e) => {
                    for mut child in children {
                        let _ = child.kill();
                        let _ = child.wait();
                    }
                    return Err(e);
                }
            }
        }

        let pids: Vec<u32> = children.iter().map(Child::id).collect();
        let (tx, rx) = mpsc::channel();
        std::thread::scope(|s| {
            for (idx, mut child) in children.into_iter().enumerate() {
                let tx = tx.clone();
                s.spawn(move || {
                    let _ = tx.send((idx, child.wait()));
                });
            }
            drop(tx);

            let mut running = vec![true; pids.len()];
            let mut first_err = None;
            for (idx, outcome) in rx {
                running[idx] = false;
                let result = outcome
                    .map_err(|e| self.spawn_error(e))
                    .and_then(|status| self.check(status));
                if let Err(e) = result
                    && first_err.is_none()
                {
                    tracing::debug!("Workload copy {idx} failed, stopping the others");
                    for (pid, _) in pids.iter().zip(&running).filter(|(_, r)| **r) {
                        terminate(*pid);
                    }
                    first_err = Some(e);
                }
            }
            first_err.map_or(Ok(()), Err)
        })
    }

    fn spawn(&self, args: &[String]) -> Result<Child> {
        Command::new(&self.fsops)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| self.spawn_error(e))
    }

    fn spawn_error(&self, source: std::io::Error) -> BenchError {
        BenchError::spawn(self.fsops.display().to_string(), source)
    }

    fn check(&self, status: ExitStatus) -> Result<()> {
        if status.success() {
            Ok(())
        } else {
            Err(BenchError::Workload {
                program: self.fsops.display().to_string(),
                status,
            })
        }
    }
}

/// SIGKILL a generator that is still being waited on elsewhere.
#[cfg(unix)]
fn terminate(pid: u32) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    if let Err(e) = kill(Pid::from_raw(raw), Signal::SIGKILL) {
        tracing::debug!("Could not kill workload process {pid}: {e}");
    }
}

#[cfg(not(unix))]
fn terminate(_pid: u32) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;

    fn spec(exists: bool) -> WorkloadSpec {
        WorkloadSpec {
            operation: Operation::Stat,
            exists,
            kiters: 2,
        }
    }

    #[test]
    fn test_existing_target_is_fixture() {
        let fs = registry::lookup("native").unwrap();
        assert_eq!(spec(true).target_path(fs), "/etc/passwd");
    }

    #[test]
    fn test_missing_target_appends_one_char() {
        for fs in registry::all() {
            let path = spec(false).target_path(fs);
            assert_ne!(path, fs.filename);
            assert_eq!(path.len(), fs.filename.len() + 1);
            assert!(path.starts_with(fs.filename));
            assert!(path.ends_with(MISSING_SUFFIX));
        }
    }

    #[test]
    fn test_args_order() {
        let fs = registry::lookup("native").unwrap();
        let spec = WorkloadSpec {
            operation: Operation::Open,
            exists: true,
            kiters: 7,
        };
        assert_eq!(spec.args(fs), ["open", "/etc/passwd", "7"]);
    }

    #[test]
    fn test_warmup_keeps_target() {
        let base = WorkloadSpec {
            operation: Operation::Open,
            exists: false,
            kiters: 50,
        };
        let warm = base.warmup();
        assert_eq!(warm.kiters, 1);
        assert_eq!(warm.operation, Operation::Open);
        assert!(!warm.exists);
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::Stat.to_string(), "stat");
        assert_eq!(Operation::Open.to_string(), "open");
        assert_eq!(Operation::default(), Operation::Stat);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_success_sequential_and_parallel() {
        let fs = registry::lookup("native").unwrap();
        let runner = WorkloadRunner::new("true");
        runner.run(&spec(true), fs, false).unwrap();
        runner.run(&spec(true), fs, true).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_run_failure_is_error() {
        let fs = registry::lookup("native").unwrap();
        let runner = WorkloadRunner::new("false");
        let err = runner.run(&spec(true), fs, true).unwrap_err();
        assert!(matches!(err, BenchError::Workload { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_parallel_failure_kills_sibling() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("fsops");
        // Whichever copy creates the marker fails at once; the other hangs.
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\nif mkdir \"{}\" 2>/dev/null; then exit 1; fi\nexec sleep 5\n",
                dir.path().join("first").display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let fs = registry::lookup("native").unwrap();
        let runner = WorkloadRunner::new(&script);
        let start = Instant::now();
        let err = runner.run(&spec(true), fs, true).unwrap_err();
        assert!(matches!(err, BenchError::Workload { .. }));
        assert!(
            start.elapsed() < Duration::from_secs(3),
            "failed run waited {:?} for its sibling",
            start.elapsed()
        );
    }

    #[test]
    fn test_missing_executable_is_spawn_error() {
        let fs = registry::lookup("native").unwrap();
        let runner = WorkloadRunner::new("/nonexistent/fsops-binary");
        let err = runner.run(&spec(true), fs, false).unwrap_err();
        assert!(matches!(err, BenchError::Spawn { .. }));
        let err = runner.run(&spec(true), fs, true).unwrap_err();
        assert!(matches!(err, BenchError::Spawn { .. }));
    }
}
