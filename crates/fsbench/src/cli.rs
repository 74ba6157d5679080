//! Command-line interface for the harness.

// Every flag is an independent toggle
#![allow(clippy::struct_excessive_bools)]

use crate::config::{
    BenchConfig, DEFAULT_FSOPS, DEFAULT_FUSERMOUNT, DEFAULT_POLL_INTERVAL, Tools,
};
use crate::error::{BenchError, Result};
use crate::mount::MountOptions;
use crate::registry;
use crate::workload::{Operation, WorkloadSpec};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Measure stat/open latency of a FUSE filesystem against a native baseline.
///
/// Mounts the chosen filesystem, runs a warmup and a timed `fsops` workload
/// (optionally two copies at once), unmounts, and prints a TSV row.
#[derive(Parser, Debug)]
#[command(name = "fsbench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Filesystem to benchmark.
    ///
    /// One of: fscq, cfscq, hfuse, cfuse, hello, fusexmp, native.
    #[arg(value_name = "FS")]
    pub filesystem: Option<String>,

    /// Just print the TSV header and exit.
    #[arg(long)]
    pub print_header: bool,

    /// Operation to perform.
    #[arg(long, value_enum, default_value_t = Operation::Stat)]
    pub op: Operation,

    /// Operate on an existing file instead of a missing one.
    #[arg(long)]
    pub exists: bool,

    /// Run two copies of the workload concurrently.
    #[arg(long)]
    pub parallel: bool,

    /// Thousands of iterations per workload run.
    #[arg(long, default_value_t = 1)]
    pub kiters: u32,

    /// Enable the FUSE attribute cache.
    #[arg(long)]
    pub attr_cache: bool,

    /// Enable the FUSE entry (name) cache.
    #[arg(long)]
    pub name_cache: bool,

    /// Enable the FUSE negative (missing) name cache.
    #[arg(long)]
    pub neg_cache: bool,

    /// Enable the kernel page cache.
    #[arg(long)]
    pub kernel_cache: bool,

    /// Workload generator executable.
    #[arg(long, env = "FSBENCH_FSOPS", default_value = DEFAULT_FSOPS)]
    pub fsops: PathBuf,

    /// Unmount utility.
    #[arg(long, env = "FSBENCH_FUSERMOUNT", default_value = DEFAULT_FUSERMOUNT)]
    pub fusermount: PathBuf,

    /// Seconds to wait for a FUSE mount to appear before continuing anyway.
    #[arg(long, value_name = "SECS", env = "FSBENCH_MOUNT_TIMEOUT", default_value_t = 10)]
    pub mount_timeout: u64,

    /// Verbosity level (-v, -vv, -vvv). Logs go to stderr.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Default log filter for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    pub fn mount_options(&self) -> MountOptions {
        MountOptions {
            name_cache: self.name_cache,
            attr_cache: self.attr_cache,
            neg_name_cache: self.neg_cache,
            kernel_cache: self.kernel_cache,
        }
    }

    pub fn workload(&self) -> WorkloadSpec {
        WorkloadSpec {
            operation: self.op,
            exists: self.exists,
            kiters: self.kiters,
        }
    }

    /// Validate input and resolve the filesystem.
    pub fn into_config(self) -> Result<BenchConfig> {
        let ident = self
            .filesystem
            .as_deref()
            .ok_or(BenchError::MissingFilesystem)?;
        let filesystem = registry::lookup(ident)?;

        Ok(BenchConfig {
            filesystem,
            mount_options: self.mount_options(),
            workload: self.workload(),
            parallel: self.parallel,
            tools: Tools {
                fsops: self.fsops,
                fusermount: self.fusermount,
                mount_timeout: Duration::from_secs(self.mount_timeout),
                poll_interval: DEFAULT_POLL_INTERVAL,
            },
        })
    }
}
