// src/lib.rs
pub mod error;
pub mod extractor;
pub mod hexdump;
pub mod monitor;
pub mod registry;
pub mod serial;

pub use error::MonitorError;
pub use extractor::{FieldExtractor, ParseOutcome};
pub use hexdump::HexDumper;
pub use monitor::{MonitorConfig, MonitorStats, StreamMonitor};
pub use registry::FieldRegistry;
