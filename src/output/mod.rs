//! Output layer for converted traces.
//!
//! The conversion pass writes records through the [`TraceOutput`] trait and
//! never looks at what was written. [`ParaverWriter`] produces the
//! `.prv`/`.row`/`.pcf` files; [`InMemoryOutput`] keeps records in a vector
//! for inspection.

pub mod legend;
mod memory;
mod paraver;
mod types;

pub use legend::Legend;
pub use memory::InMemoryOutput;
pub use paraver::{ParaverFiles, ParaverWriter};
pub use types::*;

use anyhow::Result;

/// Sink for trace body records.
///
/// Records must be written in the order they are produced; implementations
/// do not reorder them.
pub trait TraceOutput {
    /// Write a thread state change.
    fn write_state(&mut self, record: &StateRecord) -> Result<()>;

    /// Write a communication between two threads.
    fn write_comm(&mut self, record: &CommRecord) -> Result<()>;

    /// Flush any buffered data to the output.
    fn flush(&mut self) -> Result<()>;
}
