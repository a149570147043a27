//! CLI module for graphflow
//!
//! Provides command-line interface parsing for the graphflow-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// graphflow - config-driven agent orchestration server
#[derive(Parser, Debug)]
#[command(
    name = "graphflow-server",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "graphflow - config-driven agent orchestration server",
    long_about = "Compiles a declarative agent workflow, routes each query through it and\n\
                  recovers tool calls from model output.\n\n\
                  Run without arguments to start the server.",
    after_help = "EXAMPLES:\n    \
                  graphflow-server                          # Start the server (reads graphflow.toml)\n    \
                  graphflow-server --config my.toml serve   # Use a custom config file\n    \
                  graphflow-server check                    # Compile the workflow and print the route table\n    \
                  graphflow-server ask \"What is asthma?\"    # Run a single turn from the terminal\n    \
                  graphflow-server ingest ./data            # Chunk ./data into the vector store"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "graphflow.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server (the default)
    Serve,

    /// Compile the workflow and print the resulting graph
    Check,

    /// Run one conversation turn and print the answer
    Ask {
        /// The user query
        query: String,

        /// Print every executed step
        #[arg(short, long)]
        trace: bool,
    },

    /// Chunk the documents in a directory into the vector store collection
    Ingest {
        /// Directory to read (defaults to `[ingest] data_dir`)
        dir: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Subcommand to run; no subcommand means serve.
    pub fn subcommand(&self) -> &Commands {
        self.command.as_ref().unwrap_or(&Commands::Serve)
    }
}
