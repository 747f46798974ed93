pub mod config;
pub mod error;
pub mod housekeeping;
pub mod scoring;
pub mod telemetry;
