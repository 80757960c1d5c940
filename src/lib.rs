pub mod config;
pub mod constants;
pub mod helpers;
pub mod ingest;
pub mod sheet;

pub use config::Config;
