//! blktrace to Paraver conversion.
//!
//! [`convert`] runs the whole batch: it reads the binary trace once, feeds
//! every record through a [`ConversionContext`], appends the optional energy
//! telemetry and finally writes the `.prv`, `.row` and `.pcf` files.

mod context;

pub use context::{ConversionContext, ConversionStats};

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::blktrace::TraceReader;
use crate::output::{legend, Legend, ParaverFiles, ParaverWriter, TraceOutput};
use crate::telemetry;

/// Configuration for a conversion.
#[derive(Debug, Clone)]
pub struct Config {
    /// Verbosity level (0 = warn, 1 = info, 2 = debug, 3+ = trace)
    pub verbosity: u8,
    /// Binary trace produced by `blkparse -d`
    pub input: PathBuf,
    /// Base name of the output files (`.prv`, `.row` and `.pcf` are appended)
    pub output: PathBuf,
    /// Emit communication records for insert→dispatch and completion
    pub comms: bool,
    /// Energy telemetry file to append to the trace
    pub energy: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            verbosity: 0,
            input: PathBuf::new(),
            output: PathBuf::from("trace"),
            comms: false,
            energy: None,
        }
    }
}

/// Outcome of a finished conversion.
#[derive(Debug, Clone)]
pub struct ConversionSummary {
    pub files: ParaverFiles,
    pub stats: ConversionStats,
    pub threads: u32,
    pub end_time: u64,
}

/// Feed every record of `input` into `ctx`.
///
/// A truncated trace ends the pass cleanly; decoding errors abort it.
pub fn run_pass<R: Read, O: TraceOutput>(input: R, ctx: &mut ConversionContext<O>) -> Result<()> {
    let mut reader = TraceReader::new(input);
    for record in reader.by_ref() {
        let record = record.with_context(|| {
            format!("Malformed trace record after {} records", ctx.stats().records)
        })?;
        ctx.process(&record)?;
    }
    tracing::debug!("Read {} records", reader.records_read());
    Ok(())
}

/// Convert a blktrace binary trace into a Paraver trace.
pub fn convert(config: &Config) -> Result<ConversionSummary> {
    legend::validate().context("Event code table is inconsistent")?;

    let input = File::open(&config.input)
        .with_context(|| format!("Failed to open input trace {}", config.input.display()))?;

    // Read the telemetry up front so a bad path fails before any output is
    // produced.
    let samples = match &config.energy {
        Some(path) => Some(telemetry::read_samples(path)?),
        None => None,
    };

    let writer = ParaverWriter::create(&config.output)?;
    let mut ctx = ConversionContext::new(writer, config.comms, samples.is_some());

    run_pass(input, &mut ctx)
        .with_context(|| format!("Failed to convert {}", config.input.display()))?;

    if let Some(samples) = &samples {
        tracing::info!("Appending {} telemetry samples", samples.len());
        ctx.emit_telemetry(samples)?;
    }
    ctx.flush()?;

    let header = ctx.header();
    let stats = ctx.stats();
    let (writer, registry) = ctx.into_parts();
    let files = writer.finish(&header, &registry.names(), &Legend::new(samples.is_some()))?;

    tracing::info!(
        "Converted {} records into {} states and {} communications ({} threads)",
        stats.records,
        stats.states,
        stats.comms,
        header.threads
    );

    Ok(ConversionSummary {
        files,
        stats,
        threads: header.threads,
        end_time: header.end_time,
    })
}
