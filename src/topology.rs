// DRAIDBENCH TOPOLOGY GENERATOR
// PURE MODULE: MAPS (DEVICE LIST, PARITY, SPARES, LAYOUT) TO THE ORDERED SET
// OF CANDIDATE POOL CONFIGURATIONS. ZERO PROCESS SPAWNING. TESTABLE OFFLINE.
//
// THE ENGINE REQUIRES THE DATA-DISK COUNT TO EVENLY PARTITION THE NON-PARITY,
// NON-SPARE CAPACITY OF A GROUP. COUNTS THAT DON'T DIVIDE ARE SKIPPED, NOT
// ERRORS. OUTPUT IS ASCENDING BY DATA COUNT -- DOWNSTREAM REPORTING DEPENDS
// ON INCREASING-CAPACITY ORDER.

use crate::config::{Layout, RunConfig};
use crate::error::{BenchError, Result};

// BELOW THIS THE MATRIX DEGENERATES; REFUSE TO GENERATE AT ALL
pub const MIN_DEVICES: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Configuration {
    pub vdev_count: usize,
    pub children_per_vdev: usize,
    pub parity: u32,
    pub spares: u32,
    pub data: usize,
    // DEVICES ACTUALLY PLACED IN THE POOL, PARTITIONED CONTIGUOUSLY:
    // VDEV i OWNS devices[i*children .. (i+1)*children]
    pub devices: Vec<String>,
    // RESERVED REPLACEMENT DISK, KEPT OUTSIDE THE POOL (MULTI LAYOUT ONLY)
    pub spare_device: Option<String>,
    // OPAQUE `zpool` ARGUMENT VECTOR CONSUMED BY THE POOL MANAGER
    pub directive: Vec<String>,
}

impl Configuration {
    // ENGINE TOPOLOGY SYNTAX FOR ONE VDEV, E.G. "draid2:3d:1s:6c"
    pub fn draid_syntax(&self) -> String {
        format!(
            "draid{}:{}d:{}s:{}c",
            self.parity, self.data, self.spares, self.children_per_vdev
        )
    }

    pub fn summary(&self) -> String {
        format!(
            "{} x{} ({} devices)",
            self.draid_syntax(),
            self.vdev_count,
            self.devices.len()
        )
    }

    // FIRST IN-POOL DEVICE -- THE ONE THE FAULT INJECTOR TAKES OFFLINE
    pub fn victim(&self) -> &str {
        &self.devices[0]
    }
}

pub fn generate(devices: &[String], cfg: &RunConfig) -> Result<Vec<Configuration>> {
    if devices.len() < MIN_DEVICES {
        return Err(BenchError::InsufficientResources {
            needed: MIN_DEVICES,
            found: devices.len(),
        });
    }

    let mut configs = match cfg.layout {
        Layout::Single => single_vdev(devices, cfg),
        Layout::Multi => multi_vdev(devices, cfg),
    };

    // ASCENDING CAPACITY ORDER. STABLE SORT -- data IS UNIQUE PER LAYOUT
    // BUT THE GUARANTEE IS NON-DECREASING EITHER WAY.
    configs.sort_by_key(|c| c.data);
    Ok(configs)
}

// ONE VDEV SPANNING EVERY DEVICE; SPARES LIVE INSIDE THE DRAID GROUP
fn single_vdev(devices: &[String], cfg: &RunConfig) -> Vec<Configuration> {
    let children = devices.len();
    let usable = match children.checked_sub((cfg.parity + cfg.spares) as usize) {
        Some(u) if u >= 1 => u,
        _ => return Vec::new(),
    };

    let mut configs = Vec::new();
    for data in 1..=usable {
        if usable % data != 0 {
            continue;
        }
        configs.push(assemble(cfg, 1, children, data, devices.to_vec(), None));
    }
    configs
}

// EVERY EVEN PARTITION OF devices[..n-1]; devices[n-1] IS RESERVED AS THE
// EXPLICIT REPLACEMENT DISK AND NEVER ENTERS THE POOL
fn multi_vdev(devices: &[String], cfg: &RunConfig) -> Vec<Configuration> {
    let total = devices.len() - 1;
    let reserved = devices[total].clone();

    let mut configs = Vec::new();
    for vdev_count in 1..=total {
        if total % vdev_count != 0 {
            continue;
        }
        let children = total / vdev_count;
        if children < cfg.min_children {
            continue;
        }
        let data = match children.checked_sub((cfg.parity + cfg.spares) as usize) {
            Some(d) if d >= 1 => d,
            _ => continue,
        };
        configs.push(assemble(
            cfg,
            vdev_count,
            children,
            data,
            devices[..total].to_vec(),
            Some(reserved.clone()),
        ));
    }
    configs
}

fn assemble(
    cfg: &RunConfig,
    vdev_count: usize,
    children: usize,
    data: usize,
    devices: Vec<String>,
    spare_device: Option<String>,
) -> Configuration {
    let mut c = Configuration {
        vdev_count,
        children_per_vdev: children,
        parity: cfg.parity,
        spares: cfg.spares,
        data,
        devices,
        spare_device,
        directive: Vec::new(),
    };
    c.directive = directive(&c, cfg);
    c
}

// FULL `zpool create` ARGUMENT VECTOR. ashift=12 PINS THE SECTOR SIZE SO
// TIMING IS COMPARABLE ACROSS CONFIGURATIONS.
fn directive(c: &Configuration, cfg: &RunConfig) -> Vec<String> {
    let mut args = vec![
        "create".to_string(),
        "-f".to_string(),
        "-m".to_string(),
        cfg.mount.display().to_string(),
        "-o".to_string(),
        "ashift=12".to_string(),
        cfg.pool.clone(),
    ];
    for group in c.devices.chunks(c.children_per_vdev) {
        args.push(c.draid_syntax());
        args.extend(group.iter().cloned());
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FaultMode;
    use std::path::PathBuf;
    use std::time::Duration;

    fn devs(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("/dev/disk/by-id/wwn-0x{:016x}", i)).collect()
    }

    fn cfg(layout: Layout, parity: u32, spares: u32) -> RunConfig {
        RunConfig {
            pool: "benchpool".to_string(),
            mount: PathBuf::from("/mnt/draidbench"),
            fill_levels: vec![0.0],
            jobs: vec![1],
            parity,
            spares,
            min_children: 4,
            layout,
            mode: FaultMode::Spare,
            poll_interval: Duration::from_secs(2),
            log_dir: PathBuf::from("."),
            skip_tuning: true,
        }
    }

    #[test]
    fn single_vdev_data_counts_divide_evenly() {
        // 10 DEVICES, PARITY 2, SPARE 1: USABLE = 7 -> DATA IN {1, 7}
        let configs = generate(&devs(10), &cfg(Layout::Single, 2, 1)).unwrap();
        let data: Vec<usize> = configs.iter().map(|c| c.data).collect();
        assert_eq!(data, vec![1, 7]);
        for c in &configs {
            assert_eq!(c.vdev_count, 1);
            assert_eq!(c.children_per_vdev, 10);
            assert_eq!(7 % c.data, 0);
        }
    }

    #[test]
    fn single_vdev_invariants_hold() {
        for n in 5..=24 {
            let configs = generate(&devs(n), &cfg(Layout::Single, 2, 1)).unwrap();
            for c in &configs {
                let usable = c.children_per_vdev - (c.parity + c.spares) as usize;
                assert!(c.data >= 1 && c.data <= usable);
                assert_eq!(usable % c.data, 0);
                assert!(c.vdev_count * c.children_per_vdev <= n);
            }
        }
    }

    #[test]
    fn output_ascends_by_data_count() {
        for layout in [Layout::Single, Layout::Multi] {
            let configs = generate(&devs(13), &cfg(layout, 2, 1)).unwrap();
            for pair in configs.windows(2) {
                assert!(pair[0].data <= pair[1].data);
            }
        }
    }

    #[test]
    fn generate_is_pure() {
        let d = devs(17);
        let c = cfg(Layout::Multi, 2, 1);
        assert_eq!(generate(&d, &c).unwrap(), generate(&d, &c).unwrap());
    }

    #[test]
    fn too_few_devices_is_an_error() {
        let err = generate(&devs(4), &cfg(Layout::Single, 2, 1)).unwrap_err();
        match err {
            BenchError::InsufficientResources { needed, found } => {
                assert_eq!(needed, MIN_DEVICES);
                assert_eq!(found, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn multi_vdev_reserves_last_device() {
        let d = devs(13);
        let configs = generate(&d, &cfg(Layout::Multi, 2, 1)).unwrap();
        assert!(!configs.is_empty());
        for c in &configs {
            assert_eq!(c.spare_device.as_deref(), Some(d[12].as_str()));
            assert!(!c.devices.contains(&d[12]));
            assert_eq!(c.devices.len(), 12);
        }
    }

    #[test]
    fn multi_vdev_partitions_are_disjoint_and_complete() {
        let d = devs(13);
        let configs = generate(&d, &cfg(Layout::Multi, 2, 1)).unwrap();
        for c in &configs {
            assert_eq!(c.devices.len(), c.vdev_count * c.children_per_vdev);
            // CONTIGUOUS CHUNKS OF THE RESERVED SUBLIST, EACH DEVICE ONCE
            assert_eq!(c.devices, d[..12].to_vec());
            let mut seen = std::collections::HashSet::new();
            for group in c.devices.chunks(c.children_per_vdev) {
                assert_eq!(group.len(), c.children_per_vdev);
                for dev in group {
                    assert!(seen.insert(dev.clone()));
                }
            }
        }
    }

    #[test]
    fn multi_vdev_honors_min_children() {
        // 13 DEVICES -> 12 IN POOL. DIVISORS 1,2,3,4,6,12 -> CHILDREN
        // 12,6,4,3,2,1. MIN_CHILDREN 4 KEEPS 12, 6, 4.
        let configs = generate(&devs(13), &cfg(Layout::Multi, 2, 1)).unwrap();
        let children: Vec<usize> = configs.iter().map(|c| c.children_per_vdev).collect();
        assert_eq!(children, vec![4, 6, 12]); // ASCENDING data = 1, 3, 9
        for c in &configs {
            assert!(c.children_per_vdev >= 4);
            assert!(c.data >= 1);
        }
    }

    #[test]
    fn directive_carries_one_group_per_vdev() {
        let d = devs(13);
        let configs = generate(&d, &cfg(Layout::Multi, 2, 1)).unwrap();
        let c = configs.iter().find(|c| c.vdev_count == 2).unwrap();
        let syntax = c.draid_syntax();
        let groups = c.directive.iter().filter(|a| **a == syntax).count();
        assert_eq!(groups, 2);
        assert_eq!(c.directive[0], "create");
        assert!(c.directive.contains(&"ashift=12".to_string()));
        assert!(c.directive.contains(&"benchpool".to_string()));
        // RESERVED DISK NEVER APPEARS IN THE CREATE DIRECTIVE
        assert!(!c.directive.contains(&d[12]));
    }

    #[test]
    fn degenerate_parity_yields_no_configs() {
        // PARITY + SPARES SWALLOW EVERY CHILD -> NOTHING TO EMIT, NOT AN ERROR
        let configs = generate(&devs(5), &cfg(Layout::Single, 3, 2)).unwrap();
        assert!(configs.is_empty());
    }

    #[test]
    fn draid_syntax_matches_engine_format() {
        let configs = generate(&devs(10), &cfg(Layout::Single, 2, 1)).unwrap();
        assert_eq!(configs[0].draid_syntax(), "draid2:1d:1s:10c");
    }
}
