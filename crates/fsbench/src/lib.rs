//! Latency harness for FUSE filesystems.
//!
//! Launches a filesystem, warms it up, times one or two concurrent runs of
//! the external `fsops` workload generator against a fixture file, tears the
//! mount down, and prints the result as a TSV row.
//!
//! # Usage
//!
//! ```text
//! fsbench [OPTIONS] [FS]
//!
//! Arguments:
//!   [FS]  fscq, cfscq, hfuse, cfuse, hello, fusexmp, native
//!
//! Options:
//!       --print-header   Just print the TSV header and exit
//!       --op <OP>        stat | open (default: stat)
//!       --exists         Operate on an existing file
//!       --parallel       Run two copies of the workload concurrently
//!       --kiters <N>     Thousands of iterations (default: 1)
//!       --attr-cache     attr_timeout=1
//!       --name-cache     entry_timeout=1
//!       --neg-cache      negative_timeout=1
//!       --kernel-cache   kernel_cache
//! ```
//!
//! # Protocol
//!
//! 1. Look the filesystem up in the [`registry`].
//! 2. [`mount::Launcher::start`] it with the requested [`MountOptions`].
//! 3. Warm up with one thousand iterations (discarded).
//! 4. Time the workload, sequentially or as two concurrent processes.
//! 5. For parallel runs, time a sequential baseline as well.
//! 6. Unmount, then [`report`] the [`Measurement`].

pub mod bench;
pub mod cli;
pub mod config;
pub mod error;
pub mod measurement;
pub mod mount;
pub mod registry;
pub mod report;
pub mod signal;
pub mod workload;

pub use bench::BenchmarkRunner;
pub use cli::Cli;
pub use config::{BenchConfig, Tools};
pub use error::BenchError;
pub use measurement::Measurement;
pub use mount::{Launcher, MountGuard, MountOptions};
pub use registry::Filesystem;
pub use workload::{Operation, WorkloadRunner, WorkloadSpec};
