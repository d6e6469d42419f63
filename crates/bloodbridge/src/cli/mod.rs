//! Command-line interface for bloodbridge.
//!
//! This module provides the CLI structure for the `bloodbridge` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::Verbosity;

pub use commands::{
    parse_field, ConfigCommand, EmergencyCommand, ExportCommand, FieldArgs, HospitalsCommand,
    RecordCommand, StatsCommand,
};

/// bloodbridge - Blood donor records and nearby hospitals
///
/// Keeps donor applications, hospital staff applications and emergency blood
/// requests in a local store, and finds hospitals near a position.
#[derive(Debug, Parser)]
#[command(name = "bloodbridge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage blood donor applications
    #[command(subcommand)]
    Donor(RecordCommand),

    /// Manage hospital staff applications
    #[command(subcommand)]
    Staff(RecordCommand),

    /// Manage emergency blood requests
    #[command(subcommand)]
    Emergency(EmergencyCommand),

    /// Show record counts
    Stats(StatsCommand),

    /// Export every collection as JSON
    Export(ExportCommand),

    /// Find hospitals near a position
    Hospitals(HospitalsCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::Trace,
            }
        }
    }
}
