// DRAIDBENCH DEVICE DISCOVERY
// THE smartctl / by-id SHELL PIPELINE DOES THE ACTUAL PROBING; THIS MODULE
// TREATS ITS OUTPUT AS OPAQUE IDENTIFIERS AND ONLY VALIDATES COUNT,
// UNIQUENESS, AND SHAPE. ORDER IS PRESERVED EXACTLY AS PROBED -- THE
// TOPOLOGY GENERATOR PARTITIONS THE LIST POSITIONALLY.

use std::collections::HashSet;
use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{BenchError, Result};
use crate::topology::MIN_DEVICES;

// WHOLE UNPARTITIONED LUNS ONLY: /dev/sdX WITHOUT A TRAILING DIGIT, MAPPED
// BACK TO THEIR STABLE by-id LINK VIA THE 18-CHARACTER LOGICAL UNIT ID
const PROBE_PIPELINE: &str = r#"
for dev in /dev/sd*; do
    [[ "$dev" =~ [0-9] ]] && continue
    id=$(smartctl -i "$dev" 2>/dev/null | grep 'Logical Unit id' | awk '{print $4}')
    if [[ ${#id} -eq 18 ]]; then
        for prefix in /dev/disk/by-id/wwn-* /dev/disk/by-id/scsi-*; do
            if [[ -e "$prefix" ]] && [[ "$(readlink -f "$prefix")" == "$(readlink -f "$dev")" ]]; then
                echo "$prefix"
                break
            fi
        done
    fi
done
"#;

static STABLE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/dev/disk/by-id/(wwn|scsi)-[^\s/]+$").unwrap());
static PARTITION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-part[0-9]+$").unwrap());

// RAW PIPELINE OUTPUT, ONE IDENTIFIER PER LINE, NO VALIDATION
pub fn probe_raw() -> Result<Vec<String>> {
    let output = Command::new("bash")
        .arg("-c")
        .arg(PROBE_PIPELINE)
        .output()
        .map_err(|e| BenchError::Discovery(e.to_string()))?;
    if !output.status.success() {
        return Err(BenchError::Discovery(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}

// IDENTIFIERS MUST BE STABLE by-id LINKS TO WHOLE DISKS, UNIQUE WITHIN THE
// RUN, AND NUMEROUS ENOUGH FOR THE GENERATOR TO WORK WITH
pub fn validate(devices: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for device in devices {
        if !STABLE_ID.is_match(device) || PARTITION_SUFFIX.is_match(device) {
            return Err(BenchError::Discovery(format!(
                "unexpected device identifier: {}",
                device
            )));
        }
        if !seen.insert(device.as_str()) {
            return Err(BenchError::Discovery(format!(
                "duplicate device identifier: {}",
                device
            )));
        }
    }
    if devices.len() < MIN_DEVICES {
        return Err(BenchError::InsufficientResources {
            needed: MIN_DEVICES,
            found: devices.len(),
        });
    }
    Ok(())
}

pub fn probe() -> Result<Vec<String>> {
    let devices = probe_raw()?;
    validate(&devices)?;
    Ok(devices)
}
