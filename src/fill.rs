// DRAIDBENCH LOAD GENERATOR
// BUILDS THE SYNTHETIC fio FILL JOB AND SUPERVISES IT AS A SINGLE BLOCKING
// CHILD. STDIO IS INHERITED -- OUTPUT IS ECHOED TO THE OPERATOR, NEVER
// PARSED. THE EXIT CODE IS THE WHOLE CONTRACT.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::{BenchError, Result};

pub const FILL_BLOCK_SIZE: &str = "2M";
pub const FILL_IODEPTH: u32 = 64;
const FILL_JOB_NAME: &str = "filljob";
// CHILD SUPERVISION CADENCE -- FAST ENOUGH THAT SIGINT KILLS fio PROMPTLY
const REAP_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FillJob {
    pub jobs: u32,
    pub per_file_gib: u64,
    pub files: Vec<PathBuf>,
}

// TARGET = AVAILABLE * LEVEL, FLOORED TO WHOLE GiB AND SHARDED ACROSS
// `jobs` WRITERS. None MEANS THE TARGET ROUNDS TO ZERO -- AN EXPLICIT
// NO-OP FOR THE CALLER TO LOG, NOT AN ERROR.
pub fn plan_fill(available_bytes: u64, level: f64, jobs: u32, mount: &Path) -> Option<FillJob> {
    let target_bytes = (available_bytes as f64 * level) as u64;
    let target_gib = target_bytes >> 30;
    if target_gib == 0 {
        return None;
    }
    let per_file_gib = (target_gib / jobs as u64).max(1);
    let files = (0..jobs)
        .map(|i| mount.join(format!("fillfile_{}", i)))
        .collect();
    Some(FillJob {
        jobs,
        per_file_gib,
        files,
    })
}

pub trait LoadGenerator {
    // BLOCKS UNTIL THE WRITE WORKLOAD EXITS OR THE SHUTDOWN FLAG IS RAISED
    fn fill(&self, job: &FillJob, shutdown: &AtomicBool) -> Result<()>;
    // TEARDOWN PATH: FORCE-TERMINATE ANY LINGERING WORKER PROCESSES
    fn kill_stragglers(&self) -> Result<()>;
}

pub struct Fio;

impl Fio {
    fn args(job: &FillJob) -> Vec<String> {
        let filenames: Vec<String> = job
            .files
            .iter()
            .map(|f| f.display().to_string())
            .collect();
        vec![
            format!("--name={}", FILL_JOB_NAME),
            "--rw=write".to_string(),
            format!("--bs={}", FILL_BLOCK_SIZE),
            format!("--numjobs={}", job.jobs),
            format!("--iodepth={}", FILL_IODEPTH),
            format!("--size={}G", job.per_file_gib),
            format!("--filename={}", filenames.join(":")),
            "--ioengine=libaio".to_string(),
            "--group_reporting".to_string(),
        ]
    }
}

impl LoadGenerator for Fio {
    fn fill(&self, job: &FillJob, shutdown: &AtomicBool) -> Result<()> {
        let args = Self::args(job);
        let directive = format!("fio {}", args.join(" "));
        let mut child = Command::new("fio")
            .args(&args)
            .spawn()
            .map_err(|e| BenchError::spawn_failed(&directive, e))?;

        // SINGLE BLOCKING CHILD. THE CONTROLLER MUST NOT PROCEED UNTIL IT
        // EXITS -- BUT SIGINT MID-FILL STILL HAS TO REACH TEARDOWN.
        loop {
            if shutdown.load(Ordering::Relaxed) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(BenchError::Interrupted);
            }
            match child
                .try_wait()
                .map_err(|e| BenchError::spawn_failed(&directive, e))?
            {
                Some(status) if status.success() => return Ok(()),
                Some(status) => {
                    return Err(BenchError::Command {
                        directive,
                        status: status.code().unwrap_or(-1),
                        stderr: "load generator exited with errors".to_string(),
                    });
                }
                None => std::thread::sleep(REAP_INTERVAL),
            }
        }
    }

    fn kill_stragglers(&self) -> Result<()> {
        // NON-ZERO FROM pkill MEANS "NOTHING MATCHED" -- THAT IS SUCCESS HERE
        Command::new("pkill")
            .args(["-9", "fio"])
            .status()
            .map(|_| ())
            .map_err(|e| BenchError::spawn_failed("pkill -9 fio", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_target_is_a_planned_noop() {
        // 100 GiB AVAILABLE AT 0% -> NOTHING TO WRITE
        assert!(plan_fill(100 << 30, 0.0, 4, Path::new("/mnt/b")).is_none());
        // SUB-GiB TARGET ROUNDS DOWN TO ZERO
        assert!(plan_fill(100 << 30, 0.001, 4, Path::new("/mnt/b")).is_none());
    }

    #[test]
    fn fill_shards_across_writers() {
        let job = plan_fill(100 << 30, 0.5, 4, Path::new("/mnt/b")).unwrap();
        assert_eq!(job.jobs, 4);
        assert_eq!(job.per_file_gib, 12); // 50 GiB / 4 WRITERS
        assert_eq!(job.files.len(), 4);
        assert_eq!(job.files[0], PathBuf::from("/mnt/b/fillfile_0"));
        assert_eq!(job.files[3], PathBuf::from("/mnt/b/fillfile_3"));
    }

    #[test]
    fn per_file_size_never_drops_below_one_gib() {
        // 2 GiB TARGET ACROSS 8 WRITERS STILL WRITES 1 GiB PER FILE
        let job = plan_fill(4 << 30, 0.5, 8, Path::new("/mnt/b")).unwrap();
        assert_eq!(job.per_file_gib, 1);
    }

    #[test]
    fn fio_job_arguments() {
        let job = plan_fill(100 << 30, 0.5, 2, Path::new("/mnt/b")).unwrap();
        let args = Fio::args(&job);
        assert!(args.contains(&"--rw=write".to_string()));
        assert!(args.contains(&"--bs=2M".to_string()));
        assert!(args.contains(&"--numjobs=2".to_string()));
        assert!(args.contains(&"--iodepth=64".to_string()));
        assert!(args.contains(&"--size=25G".to_string()));
        assert!(args.contains(&"--filename=/mnt/b/fillfile_0:/mnt/b/fillfile_1".to_string()));
        assert!(args.contains(&"--ioengine=libaio".to_string()));
        assert!(args.contains(&"--group_reporting".to_string()));
    }
}
