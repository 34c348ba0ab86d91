//! # Datamorph
//!
//! The command line application around `datamorph-core`: configuration
//! loading, JSON table I/O and the CLI commands. The binary in `main.rs`
//! only sets up logging and dispatches here.

pub mod cli;
pub mod config;
pub mod error;

pub use config::AppConfig;
pub use error::AppError;
