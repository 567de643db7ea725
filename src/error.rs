// DRAIDBENCH ERROR TAXONOMY
// DISCOVERY AND RESOURCE ERRORS ABORT THE RUN. COMMAND ERRORS ABORT ONE TRIAL.
// CLEANUP FAILURES ARE LOGGED AT THE TEARDOWN SITE AND NEVER REACH THIS TYPE.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    // DEVICE ENUMERATION PIPELINE FAILED OR RETURNED GARBAGE
    #[error("device discovery failed: {0}")]
    Discovery(String),

    // FEWER USABLE DEVICES THAN THE TOPOLOGY GENERATOR CAN WORK WITH
    #[error("need at least {needed} eligible devices, found {found}")]
    InsufficientResources { needed: usize, found: usize },

    // AN EXTERNAL DIRECTIVE RETURNED NON-ZERO WHERE SUCCESS WAS REQUIRED
    #[error("`{directive}` exited with status {status}: {stderr}")]
    Command {
        directive: String,
        status: i32,
        stderr: String,
    },

    // A TEARDOWN STEP MISFIRED. CAPTURED PER STEP, LOGGED, NEVER ESCALATED
    #[error("{0}")]
    Cleanup(String),

    // SIGINT OBSERVED INSIDE A BLOCKING LOOP
    #[error("interrupted")]
    Interrupted,
}

impl BenchError {
    // BUILD A Command ERROR FROM A FINISHED PROCESS
    pub fn from_output(directive: &str, output: &std::process::Output) -> Self {
        BenchError::Command {
            directive: directive.to_string(),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    // BUILD A Command ERROR FOR A PROCESS THAT COULD NOT BE SPAWNED
    pub fn spawn_failed(directive: &str, err: std::io::Error) -> Self {
        BenchError::Command {
            directive: directive.to_string(),
            status: -1,
            stderr: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
