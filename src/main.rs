//! blktrace2paraver: convert a binary blktrace trace into a Paraver trace.
//!
//! Expects the output of `blkparse -d <file> -i <trace>`, which merges the
//! per-CPU blktrace files into one time-sorted binary stream.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use blkparaver::utils::init_tracing;
use blkparaver::{convert, Config};

#[derive(Debug, Parser)]
#[command(name = "blktrace2paraver")]
#[command(about = "Convert a binary blktrace trace to a Paraver trace")]
#[command(version)]
struct Command {
    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Binary trace produced by `blkparse -d`
    #[arg(short, long)]
    input: PathBuf,
    /// Base name of the generated .prv, .row and .pcf files
    #[arg(short, long, default_value = "trace")]
    output: PathBuf,
    /// Include communication records between processes and the disk
    #[arg(short, long)]
    comms: bool,
    /// Energy telemetry file (`timestamp sample1 sample2` per line)
    #[arg(short, long)]
    energy: Option<PathBuf>,
}

impl From<Command> for Config {
    fn from(cmd: Command) -> Self {
        Config {
            verbosity: cmd.verbose,
            input: cmd.input,
            output: cmd.output,
            comms: cmd.comms,
            energy: cmd.energy,
        }
    }
}

fn main() -> Result<()> {
    let config = Config::from(Command::parse());
    init_tracing(config.verbosity);

    let summary = convert(&config)?;
    eprintln!(
        "Wrote {} ({} threads, {} states, {} communications)",
        summary.files.prv.display(),
        summary.threads,
        summary.stats.states,
        summary.stats.comms
    );
    Ok(())
}
