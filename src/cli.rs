//! Command-line interface built on clap.
//!
//! [`Cli`] carries the global flags (`--config`, `--verbose`) and a
//! [`Command`]: `fetch` runs the full workflow, `extract` only prints the
//! fields. [`exit_code`] and [`Interrupts`] hold the exit-status and Ctrl-C
//! policy the `fetch` loop follows.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;
use crate::workflow::WorkflowEvent;

/// Exit status for a failed run or a rejected input.
pub const EXIT_FAILED: u8 = 1;
/// Exit status for a cancelled or aborted run (128 + SIGINT).
pub const EXIT_CANCELLED: u8 = 130;

/// Pull title, author and image URL out of a JSON snippet and download the image.
#[derive(Debug, Parser)]
#[command(name = "pobieracz", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract the fields and download the image, with a progress bar.
    Fetch {
        #[command(flatten)]
        input: InputArgs,

        /// Directory to save the image into (overrides config).
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print the run report as JSON on success.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Only extract and print the fields. No network, no files.
    Extract {
        #[command(flatten)]
        input: InputArgs,
    },
}

/// Where the JSON snippet comes from.
#[derive(Debug, Args)]
pub struct InputArgs {
    /// The JSON snippet itself.
    #[arg(conflicts_with = "file")]
    pub text: Option<String>,

    /// Read the snippet from a file, or `-` for stdin.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl InputArgs {
    /// Resolves the snippet: positional text, then `--file`, then stdin.
    pub fn read(&self) -> Result<String> {
        if let Some(text) = &self.text {
            return Ok(text.clone());
        }
        match &self.file {
            Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display())),
            _ => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("failed to read stdin")?;
                Ok(buf)
            }
        }
    }
}

/// Exit status for a terminal event; `None` while the run is still going.
pub fn exit_code(event: &WorkflowEvent) -> Option<u8> {
    match event {
        WorkflowEvent::Completed(_) => Some(0),
        WorkflowEvent::Cancelled(_) => Some(EXIT_CANCELLED),
        WorkflowEvent::Failed(_) => Some(EXIT_FAILED),
        WorkflowEvent::Progress(_) | WorkflowEvent::FieldsExtracted { .. } => None,
    }
}

/// What a Ctrl-C should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Ask the workflow to stop at its next step or chunk boundary.
    Cancel,
    /// Abandon all outstanding work now. A stalled download never reaches a
    /// chunk boundary, so cooperative cancel alone cannot end it.
    Abort,
}

/// Counts Ctrl-C presses: the first cancels, every later one aborts.
#[derive(Debug, Default)]
pub struct Interrupts {
    // Presses seen so far.
    count: u32,
}

impl Interrupts {
    pub fn record(&mut self) -> Interrupt {
        self.count = self.count.saturating_add(1);
        if self.count == 1 {
            Interrupt::Cancel
        } else {
            Interrupt::Abort
        }
    }
}
