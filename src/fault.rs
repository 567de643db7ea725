// DRAIDBENCH FAULT INJECTOR
// SIMULATES ONE DISK FAILURE WHILE THE POOL IS ONLINE AND HEALTHY, THEN
// TRIGGERS THE RECOVERY SHAPE UNDER TEST. CALLER CONTRACT: NEVER INVOKED ON
// AN ABSENT OR ALREADY-DEGRADED POOL.
//
// CLOCK ORIGIN PER MODE:
//   SPARE    -- BEFORE THE OFFLINE. AUTOMATIC ABSORPTION STARTS THE INSTANT
//               THE FAILURE IS DETECTED.
//   REPLACE/ -- IMMEDIATELY BEFORE THE replace/online DIRECTIVE. QUEUEING AND
//   REONLINE    ACKNOWLEDGEMENT ARE PART OF THE MEASURED RECOVERY.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use crate::config::FaultMode;
use crate::error::{BenchError, Result};
use crate::monitor::now_ns;
use crate::topology::Configuration;
use crate::zpool::PoolManager;

// SETTLE DELAYS AFTER EACH DIRECTIVE, MIRRORING OBSERVED ENGINE LATENCY
const SETTLE_AFTER_OFFLINE: Duration = Duration::from_millis(500);
const SETTLE_BEFORE_BLANK: Duration = Duration::from_secs(1);
const SETTLE_AFTER_REPLACE: Duration = Duration::from_secs(2);

// LEADING SPAN ZEROED TO SIMULATE A FACTORY-BLANK REPLACEMENT DISK
const ZERO_LEAD_MIB: u32 = 10;

#[derive(Clone, Debug)]
pub struct Injection {
    // RESILVER CLOCK ORIGIN, CLOCK_MONOTONIC
    pub start_ns: u64,
    pub failed_device: String,
}

// DESTRUCTIVE DISK UTILITIES AND MOUNT RELEASE. EVERYTHING HERE IS
// BEST-EFFORT IN THE CALLERS -- FAILURES ARE LOGGED, NEVER ESCALATED.
pub trait DiskTool {
    fn scrub_labels(&self, device: &str) -> Result<()>;
    fn zero_leading(&self, device: &str) -> Result<()>;
    fn release_mount(&self, mount: &Path) -> Result<()>;
}

pub struct DiskCli;

fn run(tool: &str, args: &[&str]) -> Result<()> {
    let directive = format!("{} {}", tool, args.join(" "));
    let output = Command::new(tool)
        .args(args)
        .output()
        .map_err(|e| BenchError::spawn_failed(&directive, e))?;
    if !output.status.success() {
        return Err(BenchError::from_output(&directive, &output));
    }
    Ok(())
}

impl DiskTool for DiskCli {
    fn scrub_labels(&self, device: &str) -> Result<()> {
        run("wipefs", &["-a", device])
    }

    fn zero_leading(&self, device: &str) -> Result<()> {
        let of = format!("of={}", device);
        let count = format!("count={}", ZERO_LEAD_MIB);
        run("dd", &["if=/dev/zero", &of, "bs=1M", &count])
    }

    fn release_mount(&self, mount: &Path) -> Result<()> {
        let m = mount.display().to_string();
        // FIRST EVICT USERS, THEN FORCE THE UNMOUNT. fuser EXITS NON-ZERO
        // WHEN NOBODY HOLDS THE MOUNT, SO ONLY THE UMOUNT VERDICT COUNTS.
        let _ = run("fuser", &["-k", &m]);
        run("umount", &["-f", &m])
    }
}

// TAKE THE FIRST IN-POOL DEVICE DOWN AND KICK OFF RECOVERY. RETURNS THE
// CLOCK ORIGIN THE RESILVER MONITOR MEASURES FROM.
pub fn inject(
    mode: FaultMode,
    topo: &Configuration,
    pool_name: &str,
    pool: &dyn PoolManager,
    disks: &dyn DiskTool,
) -> Result<Injection> {
    let victim = topo.victim().to_string();

    match mode {
        FaultMode::Spare => {
            println!("[fault] offlining {} (hot spare absorbs)", victim);
            let start_ns = now_ns();
            pool.offline(pool_name, &victim)?;
            std::thread::sleep(SETTLE_AFTER_OFFLINE);
            Ok(Injection {
                start_ns,
                failed_device: victim,
            })
        }
        FaultMode::Replace => {
            let replacement = topo
                .spare_device
                .as_deref()
                .expect("multi layout reserves a replacement disk")
                .to_string();
            println!("[fault] offlining {}", victim);
            pool.offline(pool_name, &victim)?;
            std::thread::sleep(SETTLE_AFTER_OFFLINE);
            println!("[fault] replacing with {}", replacement);
            let start_ns = now_ns();
            pool.replace(pool_name, &victim, &replacement)?;
            std::thread::sleep(SETTLE_AFTER_REPLACE);
            Ok(Injection {
                start_ns,
                failed_device: victim,
            })
        }
        FaultMode::Reonline => {
            println!("[fault] offlining {}", victim);
            pool.offline(pool_name, &victim)?;
            std::thread::sleep(SETTLE_BEFORE_BLANK);
            // BLANK THE DISK SO THE ENGINE SEES A FRESH REPLACEMENT IN THE
            // SAME SLOT. BEST-EFFORT: A DIRTY LABEL ONLY WEAKENS THE
            // SIMULATION, IT DOESN'T INVALIDATE THE MEASUREMENT.
            if let Err(e) = disks.scrub_labels(&victim) {
                println!("[fault] label scrub skipped: {}", e);
            }
            if let Err(e) = disks.zero_leading(&victim) {
                println!("[fault] zero pass skipped: {}", e);
            }
            println!("[fault] onlining {} in place", victim);
            let start_ns = now_ns();
            pool.online(pool_name, &victim)?;
            Ok(Injection {
                start_ns,
                failed_device: victim,
            })
        }
    }
}
