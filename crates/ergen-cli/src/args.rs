//! Command-line argument definitions for the ergen CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Global flags select the configuration file and logging
//! verbosity; each subcommand carries its own inputs and outputs.

use std::fmt;

use clap::{Parser, Subcommand};

use ergen::model::ModelId;

/// Command-line arguments for the ergen diagram generator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a diagram from a description of a data domain
    Generate(GenerateArgs),

    /// Validate an erDiagram file without calling a model
    Check(CheckArgs),

    /// List the available models
    Models,
}

#[derive(clap::Args)]
pub struct GenerateArgs {
    /// Description of the data domain
    pub description: Option<String>,

    /// Read the description from a file
    #[arg(short, long, conflicts_with = "description")]
    pub input: Option<String>,

    /// Model to generate with
    #[arg(short, long)]
    pub model: Option<ModelId>,

    /// API key for the generation service
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Path to the output diagram file
    #[arg(short, long, default_value = "diagram.mmd")]
    pub output: String,

    /// Also export the SQL schema to this file
    #[arg(long)]
    pub sql: Option<String>,

    /// Also write the audit report to this file
    #[arg(long)]
    pub audit: Option<String>,

    /// Audit the diagram and rewrite it with the suggested fixes
    #[arg(long)]
    pub apply_fixes: bool,
}

impl fmt::Debug for GenerateArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerateArgs")
            .field("description", &self.description)
            .field("input", &self.input)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("output", &self.output)
            .field("sql", &self.sql)
            .field("audit", &self.audit)
            .field("apply_fixes", &self.apply_fixes)
            .finish()
    }
}

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Path to the erDiagram file
    pub input: String,

    /// Treat the file as raw model output and sanitize it first
    #[arg(long)]
    pub raw: bool,
}
