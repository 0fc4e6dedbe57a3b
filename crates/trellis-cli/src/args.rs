//! Command-line argument definitions for the Trellis CLI.
//!
//! Besides input/output paths, configuration file selection and logging
//! verbosity, a few flags override values from the configuration file for a
//! single run.

use clap::{Parser, ValueEnum};

use trellis::diagram::Direction;

/// Command-line arguments for the Trellis layout tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input diagram document (JSON)
    #[arg(help = "Path to the input file")]
    pub input: String,

    /// Path to the laid out JSON document
    #[arg(short, long, default_value = "out.json")]
    pub output: String,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Override the flow direction named in the document
    #[arg(short, long, value_enum)]
    pub direction: Option<FlowDirection>,

    /// Keep engine routes exactly as returned
    #[arg(long)]
    pub no_simplify: bool,

    /// Give up on the layout after this many milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

/// Flow direction accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FlowDirection {
    Down,
    Up,
    Right,
    Left,
}

impl From<FlowDirection> for Direction {
    fn from(direction: FlowDirection) -> Self {
        match direction {
            FlowDirection::Down => Direction::Down,
            FlowDirection::Up => Direction::Up,
            FlowDirection::Right => Direction::Right,
            FlowDirection::Left => Direction::Left,
        }
    }
}
