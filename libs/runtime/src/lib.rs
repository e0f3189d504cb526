//! Process-level runtime support shared by the server binary: layered
//! configuration and logging setup.

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, CliArgs, DatabaseConfig, LogFormat, LoggingConfig, ServerConfig,
};
