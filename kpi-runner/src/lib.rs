pub mod config;
pub mod ingest;
pub mod report;
pub mod runner;
