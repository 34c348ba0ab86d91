//! # Datamorph - Data-Model Compiler
//!
//! The main binary for the Datamorph compiler.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │           apps/datamorph (THE BINARY)         │
//! │                                               │
//! │   ┌─────────────┐        ┌────────────────┐   │
//! │   │    CLI      │        │  TOML config   │   │
//! │   │   (clap)    │        │    (toml)      │   │
//! │   └──────┬──────┘        └───────┬────────┘   │
//! │          └───────────┬───────────┘            │
//! │                      ▼                        │
//! │             ┌────────────────┐                │
//! │             │ datamorph-core │                │
//! │             │  (THE LOGIC)   │                │
//! │             └────────────────┘                │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! datamorph lower -i conceptual.json -o physical.json
//! datamorph lift -i physical.json -o conceptual.json
//! datamorph validate -i physical.json --model physical --strict
//! datamorph analyze -i conceptual.json --json-mode
//! ```

use clap::Parser;
use datamorph::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Initialize tracing: DATAMORPH_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("DATAMORPH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "datamorph=info,datamorph_core=info".into());

    // Logs go to stderr so table and JSON output on stdout stay clean.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Datamorph startup banner.
fn print_banner() {
    println!(
        r#"
  ╺┳┓┏━┓╺┳╸┏━┓┏┳┓┏━┓┏━┓┏━┓╻ ╻
   ┃┃┣━┫ ┃ ┣━┫┃┃┃┃ ┃┣┳┛┣━┛┣━┫
  ╺┻┛╹ ╹ ╹ ╹ ╹╹ ╹┗━┛╹┗╸╹  ╹ ╹

  Data-Model Compiler v{}

  Conceptual • Physical • Linked
"#,
        env!("CARGO_PKG_VERSION")
    );
}
