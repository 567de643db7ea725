// DRAIDBENCH POOL MANAGER
// NARROW SHELL BOUNDARY AROUND `zpool`/`zfs`. DISCRETE DIRECTIVES ONLY --
// STATUS IS AN OPAQUE TEXT BLOB THE CORE SUBSTRING-SEARCHES, NEVER PARSES.

use std::process::Command;

use crate::error::{BenchError, Result};

pub trait PoolManager {
    fn create(&self, directive: &[String]) -> Result<()>;
    fn disable_compression(&self, pool: &str) -> Result<()>;
    fn available_bytes(&self, pool: &str) -> Result<u64>;
    fn offline(&self, pool: &str, device: &str) -> Result<()>;
    fn online(&self, pool: &str, device: &str) -> Result<()>;
    fn replace(&self, pool: &str, failed: &str, replacement: &str) -> Result<()>;
    // BEST-EFFORT: RETURNS WHATEVER TEXT THE ENGINE PRODUCES, EMPTY ON FAILURE
    fn status(&self, pool: &str) -> String;
    fn destroy(&self, pool: &str) -> Result<()>;
}

// SHELLS OUT TO THE REAL TOOLS
pub struct ZpoolCli;

fn run(tool: &str, args: &[&str]) -> Result<String> {
    let directive = format!("{} {}", tool, args.join(" "));
    let output = Command::new(tool)
        .args(args)
        .output()
        .map_err(|e| BenchError::spawn_failed(&directive, e))?;
    if !output.status.success() {
        return Err(BenchError::from_output(&directive, &output));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

impl PoolManager for ZpoolCli {
    fn create(&self, directive: &[String]) -> Result<()> {
        let args: Vec<&str> = directive.iter().map(String::as_str).collect();
        run("zpool", &args).map(|_| ())
    }

    // COMPRESSION WOULD SHRINK THE SYNTHETIC FILL AND DISTORT TIMING
    fn disable_compression(&self, pool: &str) -> Result<()> {
        run("zfs", &["set", "compression=off", pool]).map(|_| ())
    }

    fn available_bytes(&self, pool: &str) -> Result<u64> {
        let directive = format!("zfs list -Hp -o available {}", pool);
        let out = run("zfs", &["list", "-Hp", "-o", "available", pool])?;
        out.trim().parse().map_err(|_| BenchError::Command {
            directive,
            status: 0,
            stderr: format!("unparseable capacity: {:?}", out),
        })
    }

    fn offline(&self, pool: &str, device: &str) -> Result<()> {
        run("zpool", &["offline", pool, device]).map(|_| ())
    }

    fn online(&self, pool: &str, device: &str) -> Result<()> {
        run("zpool", &["online", pool, device]).map(|_| ())
    }

    fn replace(&self, pool: &str, failed: &str, replacement: &str) -> Result<()> {
        run("zpool", &["replace", pool, failed, replacement]).map(|_| ())
    }

    fn status(&self, pool: &str) -> String {
        Command::new("zpool")
            .args(["status", pool])
            .output()
            .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
            .unwrap_or_default()
    }

    fn destroy(&self, pool: &str) -> Result<()> {
        run("zpool", &["destroy", pool]).map(|_| ())
    }
}
