//! Library crate for ox9 exposing the scan core and the tool layer.
pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod install;
pub mod logging;
pub mod pool;
pub mod ports;
pub mod probe;
pub mod scanner;
pub mod tools;
pub mod types;

pub use config::{ScanConfig, Target};
pub use error::{ScanError, ScanResult};
pub use ports::PortRange;
pub use scanner::{scan, scan_with_cancel};
pub use types::{PortStatus, ProbeOutcome, ScanReport};
