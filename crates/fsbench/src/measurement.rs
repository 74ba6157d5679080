//! The single data point produced per invocation.

use crate::mount::MountOptions;
use crate::workload::WorkloadSpec;

/// Timings for one benchmark configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub fs_ident: &'static str,
    pub mount_options: MountOptions,
    pub workload: WorkloadSpec,
    /// Whether `elapsed_secs` covers two concurrent generators.
    pub parallel: bool,
    pub elapsed_secs: f64,
    /// A true sequential run; equal to `elapsed_secs` when not parallel.
    pub seq_secs: f64,
}

impl Measurement {
    /// Throughput of the parallel run relative to the sequential baseline.
    ///
    /// The parallel run performs twice the work, hence the factor of two.
    pub fn speedup(&self) -> f64 {
        2.0 * self.seq_secs / self.elapsed_secs
    }

    /// Microseconds per operation of the measured run.
    pub fn micros_per_op(&self) -> f64 {
        self.elapsed_secs / f64::from(self.workload.kiters) * 1000.0
    }

    /// The same configuration reported as if it had run sequentially.
    #[must_use]
    pub fn sequential_equivalent(&self) -> Self {
        Self {
            parallel: false,
            elapsed_secs: self.seq_secs,
            ..self.clone()
        }
    }
}
