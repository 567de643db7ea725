// DRAIDBENCH POOL LIFECYCLE CONTROLLER
// DRIVES ONE TRIAL THROUGH ABSENT -> CREATING -> FILLING -> DEGRADING ->
// RESILVERING -> MEASURED -> ABSENT. ONLY ONE POOL MAY EXIST SYSTEM-WIDE:
// TEARDOWN RUNS EXACTLY ONCE PER TRIAL, WHATEVER STATE THE TRIAL DIED IN,
// AND EVERY TEARDOWN STEP IS BEST-EFFORT WITH ITS OUTCOME CAPTURED
// INDIVIDUALLY -- A FAILED STEP NEVER BLOCKS THE REMAINING ONES.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::config::{FaultMode, RunConfig};
use crate::error::BenchError;
use crate::fault::{self, DiskTool};
use crate::fill::{plan_fill, LoadGenerator};
use crate::monitor::{Measurement, ResilverMonitor};
use crate::topology::Configuration;
use crate::zpool::PoolManager;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrialState {
    Creating,
    Filling,
    Degrading,
    Resilvering,
}

impl TrialState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Creating => "creating",
            Self::Filling => "filling",
            Self::Degrading => "degrading",
            Self::Resilvering => "resilvering",
        }
    }
}

// FATAL TO THE CURRENT TRIAL ONLY. THE ORCHESTRATING LOOP LOGS IT AND MOVES
// ON -- THE RUN BIASES TOWARD COLLECTING TRIALS, NOT PERFECTING ONE.
#[derive(Error, Debug)]
#[error("trial failed while {}: {source}", state.label())]
pub struct TrialFailed {
    pub state: TrialState,
    #[source]
    pub source: BenchError,
}

pub struct Lifecycle<'a> {
    pub cfg: &'a RunConfig,
    pub pool: &'a dyn PoolManager,
    pub load: &'a dyn LoadGenerator,
    pub disks: &'a dyn DiskTool,
    pub monitor: ResilverMonitor,
    pub shutdown: &'a AtomicBool,
}

impl Lifecycle<'_> {
    // ONE FULL TRIAL. ON ERROR THE POOL HAS ALREADY BEEN TORN DOWN
    // (BEST-EFFORT) BEFORE THE ERROR PROPAGATES.
    pub fn run_trial(
        &self,
        topo: &Configuration,
        fill_level: f64,
        jobs: u32,
    ) -> Result<Measurement, TrialFailed> {
        let outcome = self.drive(topo, fill_level, jobs);
        self.teardown();
        outcome
    }

    fn drive(
        &self,
        topo: &Configuration,
        fill_level: f64,
        jobs: u32,
    ) -> Result<Measurement, TrialFailed> {
        let pool_name = self.cfg.pool.as_str();

        // CREATING
        self.gate(TrialState::Creating)?;
        if self.cfg.mode == FaultMode::Reonline {
            // STALE LABELS FROM EARLIER TRIALS CONFUSE CREATE -f ON REUSED
            // DISKS. BEST-EFFORT WIPE BEFORE BUILDING THE POOL.
            for device in &topo.devices {
                if let Err(e) = self.disks.scrub_labels(device) {
                    println!("[create] pre-wipe of {} skipped: {}", device, e);
                }
            }
        }
        println!("[create] {}", topo.summary());
        self.pool
            .create(&topo.directive)
            .map_err(|e| self.fail(TrialState::Creating, e))?;
        self.pool
            .disable_compression(pool_name)
            .map_err(|e| self.fail(TrialState::Creating, e))?;

        // FILLING
        self.gate(TrialState::Filling)?;
        let available = self
            .pool
            .available_bytes(pool_name)
            .map_err(|e| self.fail(TrialState::Filling, e))?;
        match plan_fill(available, fill_level, jobs, &self.cfg.mount) {
            None => {
                // EXPLICIT NO-OP, NOT AN ERROR
                println!(
                    "[fill] target at {:.0}% rounds to zero, skipping load generator",
                    fill_level * 100.0
                );
            }
            Some(job) => {
                println!(
                    "[fill] {:.0}% of {} GiB available: {} writers x {} GiB",
                    fill_level * 100.0,
                    available >> 30,
                    job.jobs,
                    job.per_file_gib
                );
                self.load
                    .fill(&job, self.shutdown)
                    .map_err(|e| self.fail(TrialState::Filling, e))?;
            }
        }

        // DEGRADING
        self.gate(TrialState::Degrading)?;
        let injection = fault::inject(self.cfg.mode, topo, pool_name, self.pool, self.disks)
            .map_err(|e| self.fail(TrialState::Degrading, e))?;

        // RESILVERING -> MEASURED. THE SNAPSHOT IS CAPTURED HERE, BEFORE
        // TEARDOWN INVALIDATES POOL STATUS.
        println!("[resilver] waiting for {} to settle", injection.failed_device);
        let measurement = self
            .monitor
            .await_completion(self.pool, pool_name, injection.start_ns, self.shutdown)
            .map_err(|e| self.fail(TrialState::Resilvering, e))?;
        println!("[resilver] complete in {:.2}s", measurement.duration_secs);

        Ok(measurement)
    }

    // SIGINT BETWEEN STATES STILL FLOWS THROUGH THE NORMAL FAILURE PATH SO
    // TEARDOWN IS NEVER SKIPPED
    fn gate(&self, state: TrialState) -> Result<(), TrialFailed> {
        if self.shutdown.load(Ordering::Relaxed) {
            Err(self.fail(state, BenchError::Interrupted))
        } else {
            Ok(())
        }
    }

    fn fail(&self, state: TrialState, source: BenchError) -> TrialFailed {
        TrialFailed { state, source }
    }

    // GUARANTEED-CLEANUP PATH. EACH STEP'S OUTCOME IS OBSERVABLE AND LOGGED;
    // NONE IS EVER ESCALATED -- PROPAGATING WOULD SKIP THE REMAINING STEPS
    // AND LEAK PROCESSES, MOUNTS, OR THE POOL INTO THE NEXT TRIAL.
    pub fn teardown(&self) {
        let steps: [(&str, Result<(), BenchError>); 4] = [
            ("terminate load generator", self.load.kill_stragglers()),
            ("remove fill files", remove_fill_files(&self.cfg.mount)),
            ("release mount point", self.disks.release_mount(&self.cfg.mount)),
            ("destroy pool", self.pool.destroy(&self.cfg.pool)),
        ];
        for (step, outcome) in steps {
            match outcome {
                Ok(()) => println!("[teardown] {:<26} ok", step),
                Err(e) => println!("[teardown] {:<26} failed ({})", step, e),
            }
        }
    }
}

// DROP STALE FILL FILES SO A FAILED TRIAL CANNOT SKEW THE NEXT ONE'S TARGET
fn remove_fill_files(mount: &Path) -> Result<(), BenchError> {
    let entries = match std::fs::read_dir(mount) {
        Ok(entries) => entries,
        // MOUNT ALREADY GONE MEANS NOTHING TO REMOVE
        Err(_) => return Ok(()),
    };
    for entry in entries.flatten() {
        if entry
            .file_name()
            .to_string_lossy()
            .starts_with("fillfile_")
        {
            std::fs::remove_file(entry.path()).map_err(|e| {
                BenchError::Cleanup(format!(
                    "could not remove {}: {}",
                    entry.path().display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}
