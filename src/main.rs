// DRAIDBENCH v0.6 -- ZFS DRAID RESILVER BENCHMARK
// ENUMERATES DRAID TOPOLOGIES, FILLS EACH POOL WITH SYNTHETIC LOAD, INJECTS
// A SIMULATED DISK FAILURE, AND MEASURES RESILVER WALL TIME
//
// THE STORAGE ENGINE DOES THE REBUILDING. RUST USERSPACE HANDLES:
// CONFIGURATION, ORCHESTRATION, MEASUREMENT, REPORTING.

mod cli;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use draidbench::config::{FaultMode, Layout, RunConfig};
use draidbench::discover;
use draidbench::fault::DiskCli;
use draidbench::fill::Fio;
use draidbench::monitor::ResilverMonitor;
use draidbench::report::RunLog;
use draidbench::topology;
use draidbench::trial::Lifecycle;
use draidbench::tuning::CacheTuning;
use draidbench::zpool::ZpoolCli;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

#[derive(Parser)]
#[command(name = "draidbench")]
#[command(about = "DRAIDBENCH -- ZFS DRAID RESILVER BENCHMARK")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    // VERIFY EXTERNAL TOOLS AND THE ZFS MODULE ARE PRESENT
    Check,
    // RUN DEVICE DISCOVERY AND PRINT THE ELIGIBLE LIST
    Devices,
}

#[derive(clap::Args)]
struct RunArgs {
    // POOL NAME. AT MOST ONE POOL EXISTS SYSTEM-WIDE AT ANY TIME
    #[arg(long, default_value = "benchpool")]
    pool: String,

    // MOUNT POINT FOR THE POOL UNDER TEST
    #[arg(long, default_value = "/mnt/draidbench")]
    mount: PathBuf,

    // FRACTION(S) OF USABLE CAPACITY PRE-FILLED BEFORE EACH FAULT
    #[arg(long, value_delimiter = ',', default_value = "0")]
    fill_levels: Vec<f64>,

    // PARALLEL WRITER COUNT(S) FOR THE FILL WORKLOAD
    #[arg(long, value_delimiter = ',', default_value = "4")]
    jobs: Vec<u32>,

    // PARITY DISKS PER REDUNDANCY GROUP (DRAID SUPPORTS 1-3)
    #[arg(long, default_value_t = 2)]
    parity: u32,

    // DISTRIBUTED SPARES PER VDEV
    #[arg(long, default_value_t = 1)]
    spares: u32,

    // SMALLEST VDEV WORTH TESTING IN MULTI LAYOUT
    #[arg(long, default_value_t = 4)]
    min_children: usize,

    #[arg(long, value_enum, default_value = "single")]
    layout: Layout,

    #[arg(long, value_enum, default_value = "spare")]
    mode: FaultMode,

    // STATUS POLL CADENCE. COARSE ENOUGH NOT TO FLOOD THE ENGINE, FINE
    // ENOUGH NOT TO BIAS SHORT RESILVERS
    #[arg(long, default_value_t = 2)]
    poll_secs: u64,

    #[arg(long, default_value = ".")]
    log_dir: PathBuf,

    // LEAVE vm.dirty_* WRITEBACK SETTINGS ALONE
    #[arg(long)]
    skip_tuning: bool,

    // PRINT THE GENERATED CONFIGURATION MATRIX AND EXIT WITHOUT TOUCHING
    // ANY DEVICE
    #[arg(long)]
    dry_run: bool,
}

impl RunArgs {
    fn into_config(self) -> Result<RunConfig> {
        if self.mode == FaultMode::Spare && self.spares == 0 {
            bail!("--mode spare needs at least one distributed spare (--spares)");
        }
        if self.mode == FaultMode::Replace && self.layout == Layout::Single {
            bail!("--mode replace needs --layout multi (it reserves a replacement disk)");
        }
        if !(1..=3).contains(&self.parity) {
            bail!("--parity must be 1, 2, or 3");
        }
        if self.fill_levels.is_empty() || self.fill_levels.iter().any(|l| !(0.0..=1.0).contains(l)) {
            bail!("--fill-levels must be fractions in [0, 1]");
        }
        if self.jobs.is_empty() || self.jobs.contains(&0) {
            bail!("--jobs must be positive writer counts");
        }
        if self.poll_secs == 0 {
            bail!("--poll-secs must be at least 1");
        }
        Ok(RunConfig {
            pool: self.pool,
            mount: self.mount,
            fill_levels: self.fill_levels,
            jobs: self.jobs,
            parity: self.parity,
            spares: self.spares,
            min_children: self.min_children,
            layout: self.layout,
            mode: self.mode,
            poll_interval: Duration::from_secs(self.poll_secs),
            log_dir: self.log_dir,
            skip_tuning: self.skip_tuning,
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Check) => return cli::check::run_check(),
        Some(Commands::Devices) => return cli::devices::run_devices(),
        None => {}
    }

    let dry_run = cli.run.dry_run;
    let cfg = cli.run.into_config()?;

    ctrlc::set_handler(move || {
        SHUTDOWN.store(true, Ordering::Relaxed);
    })?;

    println!("DRAIDBENCH v{}", env!("CARGO_PKG_VERSION"));
    println!("POOL:        {} (mount {})", cfg.pool, cfg.mount.display());
    println!("LAYOUT:      {} / mode {}", cfg.layout.label(), cfg.mode.label());
    println!(
        "REDUNDANCY:  parity={} spares={} min_children={}",
        cfg.parity, cfg.spares, cfg.min_children
    );
    println!("FILL LEVELS: {:?}", cfg.fill_levels);
    println!("JOBS:        {:?}", cfg.jobs);
    println!("POLL:        {}s", cfg.poll_interval.as_secs());
    println!();

    let devices = discover::probe()?;
    println!("[discover] {} eligible devices", devices.len());

    let configs = topology::generate(&devices, &cfg)?;
    println!("[topology] {} candidate configurations", configs.len());

    if dry_run {
        for (i, topo) in configs.iter().enumerate() {
            println!("[{}/{}] {}", i + 1, configs.len(), topo.summary());
            println!("    zpool {}", topo.directive.join(" "));
        }
        return Ok(());
    }

    // RESTORED ON DROP, INTERRUPT PATH INCLUDED
    let _tuning = if cfg.skip_tuning {
        None
    } else {
        Some(CacheTuning::apply())
    };

    let mut log = RunLog::create(&cfg.log_dir, cfg.mode.label())?;
    println!("[report] {}", log.path().display());

    let pool = ZpoolCli;
    let load = Fio;
    let disks = DiskCli;
    let lifecycle = Lifecycle {
        cfg: &cfg,
        pool: &pool,
        load: &load,
        disks: &disks,
        monitor: ResilverMonitor::new(cfg.poll_interval),
        shutdown: &SHUTDOWN,
    };

    println!("DRAIDBENCH IS ACTIVE (CTRL+C TO EXIT)");

    'run: for (i, topo) in configs.iter().enumerate() {
        println!("\n[CONFIG {}/{}] {}", i + 1, configs.len(), topo.draid_syntax());
        for &fill_level in &cfg.fill_levels {
            for &jobs in &cfg.jobs {
                if SHUTDOWN.load(Ordering::Relaxed) {
                    break 'run;
                }
                println!(
                    "\n[TRIAL] fill {:.0}% | jobs {}",
                    fill_level * 100.0,
                    jobs
                );
                // TRIAL FAILURES NEVER ABORT THE RUN -- LOG AND MOVE ON
                match lifecycle.run_trial(topo, fill_level, jobs) {
                    Ok(measurement) => {
                        log.record_success(topo, fill_level, jobs, &measurement)?;
                    }
                    Err(e) => {
                        println!("[trial] FAILED: {}", e);
                        log.record_failure(topo, fill_level, jobs, &e.to_string())?;
                    }
                }
            }
        }
    }

    if SHUTDOWN.load(Ordering::Relaxed) {
        // TEARDOWN ALREADY RAN INSIDE THE ABORTED TRIAL; THIS FINAL SWEEP
        // COVERS AN INTERRUPT LANDING BETWEEN TRIALS
        println!("\nDRAIDBENCH IS SHUTTING DOWN");
        lifecycle.teardown();
    }

    log.dump();
    log.summary();

    println!("DRAIDBENCH OUT.");
    Ok(())
}
