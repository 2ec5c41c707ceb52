//! blktrace2stats: per-process I/O statistics from a binary blktrace trace.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use blkparaver::stats::{render, RenderOptions, StatsCollector, StatsFormat};
use blkparaver::utils::init_tracing;

#[derive(Debug, Parser)]
#[command(name = "blktrace2stats")]
#[command(about = "Extract per-process I/O statistics from a binary blktrace trace")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Binary trace produced by `blkparse -d`
    #[arg(short, long)]
    input: PathBuf,
    /// Emit a MediaWiki table
    #[arg(short, long, conflicts_with = "json")]
    wiki: bool,
    /// Emit JSON
    #[arg(long)]
    json: bool,
    /// Merge insert/dispatch/complete counters into single columns
    #[arg(short, long)]
    compact: bool,
    /// Column width of the table output
    #[arg(short = 'W', long, default_value = "5")]
    width: usize,
}

impl Cli {
    fn render_options(&self) -> RenderOptions {
        let format = if self.wiki {
            StatsFormat::Wiki
        } else if self.json {
            StatsFormat::Json
        } else {
            StatsFormat::Table
        };
        RenderOptions {
            format,
            compact: self.compact,
            width: self.width,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let input = File::open(&cli.input)
        .with_context(|| format!("Failed to open input trace {}", cli.input.display()))?;
    let collector = StatsCollector::from_reader(input)
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;

    let rows = collector.rows();
    tracing::info!("Collected statistics for {} processes", rows.len());

    let text = render(&rows, &cli.render_options())?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
