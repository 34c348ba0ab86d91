//! # Datamorph CLI Module
//!
//! This module implements the CLI interface for Datamorph.
//!
//! ## Available Commands
//!
//! - `lower` - Lower a conceptual table into a physical table
//! - `lift` - Lift a physical table into a conceptual table
//! - `validate` - Run the validation passes over a table
//! - `analyze` - Report inheritance and linkage of a conceptual table
//! - `config` - Print the effective configuration

mod commands;

use crate::config::AppConfig;
use crate::error::AppError;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Datamorph - data-model compiler
///
/// Lowers conceptual models (concepts, properties, inheritance) into
/// physical storage models (views, containers, connections) and back.
#[derive(Parser, Debug)]
#[command(name = "datamorph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file (defaults to ./datamorph.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Fail when any error issue is reported
    #[arg(long, global = true)]
    pub strict: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Which model shape a table holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelKind {
    Conceptual,
    Physical,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Lower a conceptual table into a physical table
    Lower {
        /// Conceptual table (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the physical table (JSON)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Lift a physical table into a conceptual table
    Lift {
        /// Physical table (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the conceptual table (JSON)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Run the validation passes over a table
    Validate {
        /// Table to validate (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Shape of the table
        #[arg(short, long, value_enum, default_value = "conceptual")]
        model: ModelKind,
    },

    /// Report inheritance and linkage of a conceptual table
    Analyze {
        /// Conceptual table (JSON)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

/// Options shared by every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub json_mode: bool,
    pub strict: bool,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), AppError> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let options = RunOptions {
        json_mode: cli.json_mode,
        strict: cli.strict,
    };

    match cli.command {
        Some(Commands::Lower { input, output }) => cmd_lower(&config, options, &input, &output),
        Some(Commands::Lift { input, output }) => cmd_lift(options, &input, &output),
        Some(Commands::Validate { input, model }) => cmd_validate(options, &input, model),
        Some(Commands::Analyze { input }) => cmd_analyze(&config, options, &input),
        Some(Commands::Config) | None => {
            // No subcommand - show the configuration by default
            cmd_config(&config, options)
        }
    }
}
