//! CLI module
//!
//! - `serve`: HTTP server exposing health probes and cache administration
//! - `status`: print the cache capability status as JSON
//! - `clear`: clear the cache and print what was reached

pub mod cache;
pub mod serve;

use clap::{Parser, Subcommand};

/// Tiered cache service for dependency graphs and AI narration
#[derive(Parser)]
#[command(name = "depviz-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve,

    /// Print the cache status
    Status,

    /// Clear the cache
    Clear(cache::ClearArgs),
}
