//! Auxiliary energy telemetry.
//!
//! The telemetry file holds one sample per line: a timestamp in seconds
//! followed by two channel readings, separated by whitespace. Samples are
//! placed on their own synthetic threads, with time measured from the first
//! sample.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};

use crate::classify::EventClass;
use crate::output::StateRecord;

/// Paraver resource the telemetry records are attributed to.
pub const TELEMETRY_RESOURCE: u32 = 1;

/// Thread names of the two telemetry channels.
pub const CHANNEL_NAMES: [&str; 2] = ["Energy channel 1", "Energy channel 2"];

const NANOS_PER_SECOND: f64 = 1e9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    /// Seconds, as read from the file.
    pub time: f64,
    pub channels: [f64; 2],
}

/// Parse one line. Returns `None` unless it holds three numbers.
pub fn parse_line(line: &str) -> Option<TelemetrySample> {
    let mut fields = line.split_whitespace().map(str::parse::<f64>);
    let time = fields.next()?.ok()?;
    let first = fields.next()?.ok()?;
    let second = fields.next()?.ok()?;
    Some(TelemetrySample {
        time,
        channels: [first, second],
    })
}

/// Read every sample of a telemetry file. Blank lines are ignored and
/// malformed lines are skipped with a warning.
pub fn read_samples(path: &Path) -> Result<Vec<TelemetrySample>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open telemetry file {}", path.display()))?;

    let mut samples = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line =
            line.with_context(|| format!("Failed to read telemetry file {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line) {
            Some(sample) => samples.push(sample),
            None => tracing::warn!(
                "Skipping malformed telemetry line {} in {}: {:?}",
                lineno + 1,
                path.display(),
                line
            ),
        }
    }
    Ok(samples)
}

/// Convert samples into state records for the two channel threads.
///
/// Each sample yields one record per channel, channel 1 first. Readings are
/// rounded to the nearest integer, negative readings clamp to zero.
pub fn to_records(samples: &[TelemetrySample], threads: [u32; 2]) -> Vec<StateRecord> {
    let Some(first) = samples.first() else {
        return Vec::new();
    };

    let mut records = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        let offset = (sample.time - first.time).max(0.0);
        let time = (offset * NANOS_PER_SECOND).round() as u64;
        for (idx, class) in EventClass::ENERGY.iter().enumerate() {
            records.push(StateRecord {
                resource: TELEMETRY_RESOURCE,
                thread: threads[idx],
                time,
                type_code: class.type_code(),
                value: sample.channels[idx].max(0.0).round() as u64,
            });
        }
    }
    records
}
