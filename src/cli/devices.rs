// DEVICE LISTING -- RUNS THE DISCOVERY PIPELINE AND PRINTS WHAT IT FOUND,
// THEN THE ELIGIBILITY VERDICT THE BENCHMARK ITSELF WOULD APPLY

use anyhow::Result;

use draidbench::discover;

pub fn run_devices() -> Result<()> {
    let devices = discover::probe_raw()?;

    if devices.is_empty() {
        println!("no devices discovered");
    }
    for device in &devices {
        println!("{}", device);
    }
    println!();

    match discover::validate(&devices) {
        Ok(()) => println!("{} devices, eligible for a benchmark run", devices.len()),
        Err(e) => {
            println!("not eligible: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
