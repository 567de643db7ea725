// DRAIDBENCH CORE
// ORCHESTRATES AND MEASURES AN EXTERNAL STORAGE ENGINE -- NEVER IMPLEMENTS
// REDUNDANCY, REBUILD, OR I/O ITSELF. PURE LOGIC (TOPOLOGY, PLANNING,
// PREDICATES) IS SEPARATED FROM THE SHELL BOUNDARY SO THE WHOLE STATE
// MACHINE TESTS OFFLINE AGAINST FAKE COLLABORATORS.

pub mod config;
pub mod discover;
pub mod error;
pub mod fault;
pub mod fill;
pub mod monitor;
pub mod report;
pub mod topology;
pub mod trial;
pub mod tuning;
pub mod zpool;
