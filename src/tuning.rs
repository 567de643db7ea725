// DRAIDBENCH CACHE TUNING
// AGGRESSIVE WRITEBACK SETTINGS KEEP THE PAGE CACHE FROM MASKING DEVICE
// SPEED DURING FILL AND RESILVER. APPLIED FOR THE WHOLE RUN, RESTORED ON
// DROP -- INCLUDING THE INTERRUPT PATH.
//
// BEST-EFFORT THROUGHOUT: A BOX WITHOUT ROOT OR WITHOUT THESE KNOBS STILL
// RUNS THE BENCHMARK, JUST WITH STOCK WRITEBACK BEHAVIOR.

use std::process::Command;

pub struct Knob {
    pub key: &'static str,
    // VALUE DURING THE BENCHMARK
    pub bench: &'static str,
    // KERNEL DEFAULT PUT BACK AFTERWARDS
    pub restore: &'static str,
}

pub const KNOBS: [Knob; 4] = [
    Knob {
        key: "vm.dirty_ratio",
        bench: "2",
        restore: "20",
    },
    Knob {
        key: "vm.dirty_background_ratio",
        bench: "1",
        restore: "10",
    },
    Knob {
        key: "vm.dirty_expire_centisecs",
        bench: "100",
        restore: "3000",
    },
    Knob {
        key: "vm.dirty_writeback_centisecs",
        bench: "100",
        restore: "500",
    },
];

fn sysctl(key: &str, value: &str) {
    let assignment = format!("{}={}", key, value);
    match Command::new("sysctl").args(["-w", &assignment]).status() {
        Ok(status) if status.success() => {}
        Ok(_) => println!("[tuning] sysctl {} refused", assignment),
        Err(e) => println!("[tuning] sysctl unavailable: {}", e),
    }
}

pub struct CacheTuning;

impl CacheTuning {
    pub fn apply() -> Self {
        println!("[tuning] applying benchmark writeback settings");
        for knob in &KNOBS {
            sysctl(knob.key, knob.bench);
        }
        Self
    }
}

impl Drop for CacheTuning {
    fn drop(&mut self) {
        println!("[tuning] restoring writeback settings");
        for knob in &KNOBS {
            sysctl(knob.key, knob.restore);
        }
    }
}
