//! The timing protocol: mount, warm up, measure, unmount.

use crate::config::BenchConfig;
use crate::error::Result;
use crate::measurement::Measurement;
use crate::mount::Launcher;
use crate::workload::WorkloadRunner;

/// Runs a single benchmark configuration end to end.
///
/// Order is fixed: warmup completes before the timed run, and a parallel
/// timed run completes before its sequential baseline starts. The mount is
/// torn down before the measurement is returned; on error the guard's drop
/// handles it instead.
pub struct BenchmarkRunner {
    config: BenchConfig,
    launcher: Launcher,
    workload: WorkloadRunner,
}

impl BenchmarkRunner {
    pub fn new(config: BenchConfig) -> Self {
        let launcher = Launcher::new(&config.tools);
        let workload = WorkloadRunner::new(config.tools.fsops.clone());
        Self {
            config,
            launcher,
            workload,
        }
    }

    pub fn run(&self) -> Result<Measurement> {
        let fs = self.config.filesystem;
        let spec = &self.config.workload;
        let parallel = self.config.parallel;

        let mount = self.launcher.start(fs, &self.config.mount_options)?;

        self.workload.warmup(spec, fs)?;

        let elapsed_secs = self.workload.run(spec, fs, parallel)?.as_secs_f64();
        tracing::info!(
            "{fs}: {} kiters of {} ({}) in {elapsed_secs:.3}s",
            spec.kiters,
            spec.operation,
            if parallel { "parallel" } else { "sequential" }
        );

        let seq_secs = if parallel {
            let secs = self.workload.run(spec, fs, false)?.as_secs_f64();
            tracing::info!("{fs}: sequential baseline in {secs:.3}s");
            secs
        } else {
            elapsed_secs
        };

        mount.stop()?;

        Ok(Measurement {
            fs_ident: fs.ident,
            mount_options: self.config.mount_options,
            workload: *spec,
            parallel,
            elapsed_secs,
            seq_secs,
        })
    }
}
