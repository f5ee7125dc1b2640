//! CLI argument definitions using clap
//!
//! Commands:
//! - resourcekit schemas [--config <path>]
//! - resourcekit validate --resource <name> [--config <path>] <file>
//! - resourcekit query --resource <name> [--config <path>] [--param k=v ...]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// resourcekit - schema-driven document resources
#[derive(Parser, Debug)]
#[command(name = "resourcekit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load the schema directory and print every schema as JSON
    Schemas {
        /// Path to a TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate a JSON document against a resource schema
    Validate {
        /// Resource name
        #[arg(long)]
        resource: String,

        /// Path to a TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSON document file
        file: PathBuf,
    },

    /// Print the query built for the given request parameters
    Query {
        /// Resource name
        #[arg(long)]
        resource: String,

        /// Path to a TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Request parameter as key=value; `key[]=v` adds to a list
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
