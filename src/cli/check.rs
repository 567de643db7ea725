use std::path::Path;
use std::process::Command;

use anyhow::Result;

fn check_tool(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

pub fn run_check() -> Result<()> {
    println!("DRAIDBENCH DEPENDENCY CHECK");
    println!();

    let mut ok = true;
    let tools = [
        "bash", "zpool", "zfs", "fio", "smartctl", "wipefs", "fuser", "sysctl",
    ];
    for tool in &tools {
        if check_tool(tool) {
            println!("  {:<24}OK", tool);
        } else {
            println!("  {:<24}MISSING", tool);
            ok = false;
        }
    }
    println!();

    // THE MODULE MUST BE LOADED BEFORE zpool create CAN WORK
    let zfs_module = Path::new("/sys/module/zfs");
    if zfs_module.exists() {
        let version = std::fs::read_to_string("/sys/module/zfs/version").unwrap_or_default();
        let version = version.trim();
        if version.is_empty() {
            println!("  zfs module            LOADED");
        } else {
            println!("  zfs module            LOADED ({})", version);
        }
    } else {
        println!("  zfs module            NOT LOADED (modprobe zfs first)");
        ok = false;
    }
    println!();

    if ok {
        println!("ALL CHECKS PASSED");
    } else {
        println!("SOME CHECKS FAILED");
        if !check_tool("fio") {
            println!("  Install fio: https://github.com/axboe/fio");
        }
        if !check_tool("zpool") {
            println!("  Install OpenZFS: https://openzfs.github.io/openzfs-docs");
        }
        std::process::exit(1);
    }

    Ok(())
}
