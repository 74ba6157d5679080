//! Error taxonomy for the harness.
//!
//! Every failure is terminal. The variants only exist so the driver can tell
//! bad input apart from a misbehaving subprocess when choosing an exit code.

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Exit codes returned by the `fsbench` binary.
pub mod exit_code {
    /// Benchmark completed and row(s) were printed.
    pub const SUCCESS: u8 = 0;
    /// A subprocess failed or another runtime error occurred.
    pub const FAILURE: u8 = 1;
    /// Bad or missing command-line input.
    pub const USAGE: u8 = 2;
    /// Interrupted by SIGINT/SIGTERM (128 + 2).
    pub const INTERRUPTED: u8 = 130;
}

/// Errors raised while setting up or running a benchmark.
#[derive(Debug, Error)]
pub enum BenchError {
    /// No filesystem identifier was given.
    #[error("missing file system choice")]
    MissingFilesystem,

    /// The identifier is not in the registry.
    #[error("unknown filesystem identifier {ident} (expected one of: {known})")]
    UnknownFilesystem { ident: String, known: String },

    /// A subprocess could not be started at all.
    #[error("could not run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The workload generator exited unsuccessfully.
    #[error("could not run {program}: {status}")]
    Workload { program: String, status: ExitStatus },

    /// The filesystem process exited unsuccessfully before the mount came up.
    #[error("filesystem {program} failed to mount: {status}")]
    MountLaunch { program: String, status: ExitStatus },

    /// SIGINT/SIGTERM arrived while waiting on a subprocess.
    #[error("interrupted")]
    Interrupted,

    /// The unmount utility exited unsuccessfully.
    #[error("could not unmount {}: {status}", .dir.display())]
    Unmount { dir: PathBuf, status: ExitStatus },
}

impl BenchError {
    /// True for errors caused by bad command-line input.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::MissingFilesystem | Self::UnknownFilesystem { .. }
        )
    }

    /// Exit code the binary should terminate with for this error.
    pub fn exit_code(&self) -> u8 {
        if self.is_usage() {
            exit_code::USAGE
        } else if matches!(self, Self::Interrupted) {
            exit_code::INTERRUPTED
        } else {
            exit_code::FAILURE
        }
    }

    pub(crate) fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }
}

/// Convenience alias for results carrying a [`BenchError`].
pub type Result<T, E = BenchError> = std::result::Result<T, E>;
