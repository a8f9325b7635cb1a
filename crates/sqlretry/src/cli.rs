//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use sqlretry_core::config::RetrySection;

/// sqlretry - inspect and exercise database retry settings
#[derive(Parser, Debug)]
#[command(name = "sqlretry")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version(VersionArgs),

    /// Validate a retry settings file
    Validate(ValidateArgs),

    /// Show the resolved retry settings
    Show(ShowArgs),

    /// Preview the waits between retries
    Schedule(ScheduleArgs),

    /// Run a failing operation under a section's retry policy
    Simulate(SimulateArgs),
}

/// Settings section selector
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SectionArg {
    /// Policy for opening connections
    Connection,
    /// Policy for executing commands
    Command,
}

impl From<SectionArg> for RetrySection {
    fn from(arg: SectionArg) -> Self {
        match arg {
            SectionArg::Connection => RetrySection::Connection,
            SectionArg::Command => RetrySection::Command,
        }
    }
}

// Version command
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Retry settings file
    pub file: Utf8PathBuf,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Retry settings file
    pub file: Utf8PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Retry settings file
    pub file: Utf8PathBuf,

    /// Section whose policy is previewed
    #[arg(short, long, value_enum, default_value = "connection")]
    pub section: SectionArg,

    /// Disable the random offset of exponential waits
    #[arg(long)]
    pub no_jitter: bool,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Retry settings file
    pub file: Utf8PathBuf,

    /// Section whose policy is applied
    #[arg(short, long, value_enum, default_value = "command")]
    pub section: SectionArg,

    /// Number of failing attempts before the operation succeeds
    #[arg(short, long, default_value_t = 2)]
    pub failures: u32,

    /// Server error number raised by each failing attempt
    #[arg(short, long, default_value_t = 1205, allow_negative_numbers = true)]
    pub error_number: i32,

    /// Command text checked against the authorized SQL condition
    #[arg(long, default_value = "SELECT 1")]
    pub command_text: String,
}
