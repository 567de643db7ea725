// DRAIDBENCH RUN CONFIGURATION
// ONE IMMUTABLE STRUCT HANDED INTO EVERY COMPONENT. NO PROCESS-WIDE MUTABLE
// STATE -- THE CLI LOWERS INTO THIS ONCE AND NOTHING CHANGES IT AFTERWARDS.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

// HOW THE INJECTED FAILURE IS RECOVERED
#[derive(Clone, Copy, PartialEq, Eq, Debug, ValueEnum)]
pub enum FaultMode {
    // OFFLINE A DEVICE, LET THE IN-POOL HOT SPARE ABSORB IT AUTOMATICALLY
    Spare,
    // OFFLINE A DEVICE, ISSUE AN EXPLICIT replace NAMING THE RESERVED DISK
    Replace,
    // OFFLINE A DEVICE, BLANK IT, BRING THE SAME DEVICE BACK ONLINE
    Reonline,
}

impl FaultMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Spare => "spare",
            Self::Replace => "replace",
            Self::Reonline => "reonline",
        }
    }
}

// HOW DEVICES ARE GROUPED INTO VDEVS
#[derive(Clone, Copy, PartialEq, Eq, Debug, ValueEnum)]
pub enum Layout {
    // ONE DRAID VDEV SPANNING EVERY DISCOVERED DEVICE
    Single,
    // EVERY EVEN PARTITION OF THE DEVICE LIST, ONE DEVICE RESERVED AS
    // REPLACEMENT DISK OUTSIDE THE POOL
    Multi,
}

impl Layout {
    pub fn label(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Multi => "multi",
        }
    }
}

#[derive(Clone, Debug)]
pub struct RunConfig {
    pub pool: String,
    pub mount: PathBuf,
    pub fill_levels: Vec<f64>,
    pub jobs: Vec<u32>,
    pub parity: u32,
    pub spares: u32,
    pub min_children: usize,
    pub layout: Layout,
    pub mode: FaultMode,
    pub poll_interval: Duration,
    pub log_dir: PathBuf,
    pub skip_tuning: bool,
}
