use anyhow::Result;

use super::types::{CommRecord, OutputRecord, StateRecord};
use super::TraceOutput;

/// Collects records in memory, in the order they were written.
///
/// Handy for inspecting a conversion without touching the filesystem.
#[derive(Debug, Default)]
pub struct InMemoryOutput {
    pub records: Vec<OutputRecord>,
}

impl InMemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn states(&self) -> impl Iterator<Item = &StateRecord> {
        self.records.iter().filter_map(|r| match r {
            OutputRecord::State(s) => Some(s),
            OutputRecord::Comm(_) => None,
        })
    }

    pub fn comms(&self) -> impl Iterator<Item = &CommRecord> {
        self.records.iter().filter_map(|r| match r {
            OutputRecord::Comm(c) => Some(c),
            OutputRecord::State(_) => None,
        })
    }

    /// The records rendered as `.prv` body lines.
    pub fn lines(&self) -> Vec<String> {
        self.records.iter().map(ToString::to_string).collect()
    }
}

impl TraceOutput for InMemoryOutput {
    fn write_state(&mut self, record: &StateRecord) -> Result<()> {
        self.records.push(OutputRecord::State(*record));
        Ok(())
    }

    fn write_comm(&mut self, record: &CommRecord) -> Result<()> {
        self.records.push(OutputRecord::Comm(*record));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
