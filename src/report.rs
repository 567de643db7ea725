// DRAIDBENCH RUN LOG
// ONE RECORD PER (CONFIGURATION x FILL x JOBS) TRIAL: AN APPEND-ONLY LOG
// FILE FOR THE RAW EVIDENCE PLUS AN IN-MEMORY TABLE FOR THE END-OF-RUN
// SUMMARY. EXISTING FILE CONTENT IS NEVER REWRITTEN OR TRUNCATED; THE FILE
// NAME CARRIES THE RUN TIMESTAMP SO RUNS NEVER COLLIDE.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::monitor::Measurement;
use crate::topology::Configuration;

#[derive(Clone, Debug)]
pub struct TrialRecord {
    pub syntax: String,
    pub vdevs: usize,
    pub data: usize,
    pub children: usize,
    pub fill_level: f64,
    pub jobs: u32,
    // None = TRIAL FAILED; note CARRIES THE ERROR TEXT
    pub duration_secs: Option<f64>,
    pub note: String,
}

pub struct RunLog {
    path: PathBuf,
    records: Vec<TrialRecord>,
}

impl RunLog {
    pub fn create(dir: &Path, mode_label: &str) -> io::Result<Self> {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("resilver_{}_{}.log", mode_label, stamp));
        // TOUCH EARLY SO AN UNWRITABLE LOG DIRECTORY FAILS THE RUN BEFORE
        // ANY POOL IS CREATED
        OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            records: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record_success(
        &mut self,
        topo: &Configuration,
        fill_level: f64,
        jobs: u32,
        measurement: &Measurement,
    ) -> io::Result<()> {
        self.records.push(TrialRecord {
            syntax: topo.draid_syntax(),
            vdevs: topo.vdev_count,
            data: topo.data,
            children: topo.children_per_vdev,
            fill_level,
            jobs,
            duration_secs: Some(measurement.duration_secs),
            note: String::new(),
        });
        self.append(&format!(
            "--- config: {} | fill: {:.0}% | jobs: {} ---\n\
             vdevs: {}, data: {}, children: {}\n\
             resilver: {:.2} s\n\
             {}\n\n",
            topo.draid_syntax(),
            fill_level * 100.0,
            jobs,
            topo.vdev_count,
            topo.data,
            topo.children_per_vdev,
            measurement.duration_secs,
            measurement.final_status
        ))
    }

    pub fn record_failure(
        &mut self,
        topo: &Configuration,
        fill_level: f64,
        jobs: u32,
        error: &str,
    ) -> io::Result<()> {
        self.records.push(TrialRecord {
            syntax: topo.draid_syntax(),
            vdevs: topo.vdev_count,
            data: topo.data,
            children: topo.children_per_vdev,
            fill_level,
            jobs,
            duration_secs: None,
            note: error.to_string(),
        });
        self.append(&format!(
            "--- config: {} | fill: {:.0}% | jobs: {} ---\n\
             vdevs: {}, data: {}, children: {}\n\
             FAILED: {}\n\n",
            topo.draid_syntax(),
            fill_level * 100.0,
            jobs,
            topo.vdev_count,
            topo.data,
            topo.children_per_vdev,
            error
        ))
    }

    // APPEND-ONLY, FLUSHED PER BLOCK -- A CRASH MID-RUN KEEPS EVERY
    // COMPLETED TRIAL ON DISK
    fn append(&self, block: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(block.as_bytes())?;
        file.flush()
    }

    // FULL TABLE AFTER THE RUN
    pub fn dump(&self) {
        if self.records.is_empty() {
            return;
        }
        println!(
            "\n{:<20} {:<6} {:<6} {:<6} {:<6} {:<12} RESULT",
            "CONFIG", "VDEVS", "DATA", "FILL%", "JOBS", "RESILVER_S"
        );
        println!("{}", "-".repeat(72));
        for r in &self.records {
            match r.duration_secs {
                Some(d) => println!(
                    "{:<20} {:<6} {:<6} {:<6.0} {:<6} {:<12.2} ok",
                    r.syntax,
                    r.vdevs,
                    r.data,
                    r.fill_level * 100.0,
                    r.jobs,
                    d
                ),
                None => println!(
                    "{:<20} {:<6} {:<6} {:<6.0} {:<6} {:<12} failed: {}",
                    r.syntax,
                    r.vdevs,
                    r.data,
                    r.fill_level * 100.0,
                    r.jobs,
                    "-",
                    r.note
                ),
            }
        }
        println!("TOTAL TRIALS: {}", self.records.len());
    }

    // AGGREGATE STATISTICS
    pub fn summary(&self) {
        if self.records.is_empty() {
            return;
        }
        let measured: Vec<(&TrialRecord, f64)> = self
            .records
            .iter()
            .filter_map(|r| r.duration_secs.map(|d| (r, d)))
            .collect();
        let failed = self.records.len() - measured.len();

        println!("\n{}", "=".repeat(50));
        println!("DRAIDBENCH SUMMARY");
        println!("{}", "=".repeat(50));
        println!("  TRIALS:    {} ({} failed)", self.records.len(), failed);
        if let Some((r, d)) = measured
            .iter()
            .min_by(|a, b| a.1.total_cmp(&b.1))
        {
            println!("  FASTEST:   {:.2}s  {}", d, r.syntax);
        }
        if let Some((r, d)) = measured
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
        {
            println!("  SLOWEST:   {:.2}s  {}", d, r.syntax);
        }
        if !measured.is_empty() {
            let mean: f64 =
                measured.iter().map(|(_, d)| d).sum::<f64>() / measured.len() as f64;
            println!("  MEAN:      {:.2}s", mean);
        }
        println!("  RUN LOG:   {}", self.path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::Measurement;

    fn topo() -> Configuration {
        Configuration {
            vdev_count: 1,
            children_per_vdev: 10,
            parity: 2,
            spares: 1,
            data: 7,
            devices: (0..10).map(|i| format!("/dev/disk/by-id/wwn-{}", i)).collect(),
            spare_device: None,
            directive: vec!["create".to_string()],
        }
    }

    #[test]
    fn blocks_append_without_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = RunLog::create(dir.path(), "spare").unwrap();
        let m = Measurement {
            duration_secs: 12.34,
            final_status: "scan: resilvered 9.8G in 00:00:12".to_string(),
        };
        log.record_success(&topo(), 0.2, 4, &m).unwrap();
        log.record_failure(&topo(), 0.4, 8, "fio exited with errors").unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        // BOTH BLOCKS PRESENT, IN ORDER, SEPARATED BY A BLANK LINE
        let first = text.find("resilver: 12.34 s").unwrap();
        let second = text.find("FAILED: fio exited with errors").unwrap();
        assert!(first < second);
        assert!(text.contains("--- config: draid2:7d:1s:10c | fill: 20% | jobs: 4 ---"));
        assert!(text.contains("scan: resilvered"));
        assert_eq!(text.matches("\n\n").count(), 2);
    }

    #[test]
    fn file_name_carries_mode_and_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::create(dir.path(), "reonline").unwrap();
        let name = log.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("resilver_reonline_"));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn dump_and_summary_tolerate_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::create(dir.path(), "spare").unwrap();
        log.dump();
        log.summary();
    }

    #[test]
    fn records_keep_arrival_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = RunLog::create(dir.path(), "spare").unwrap();
        for jobs in [1u32, 4, 8] {
            let m = Measurement {
                duration_secs: jobs as f64,
                final_status: String::new(),
            };
            log.record_success(&topo(), 0.0, jobs, &m).unwrap();
        }
        let order: Vec<u32> = log.records.iter().map(|r| r.jobs).collect();
        assert_eq!(order, vec![1, 4, 8]);
    }
}
