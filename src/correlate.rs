//! Insert-to-dispatch correlation for Paraver communication records.

use std::collections::HashMap;

/// An inserted request waiting for its dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSend {
    pub time: u64,
    pub sector: u64,
    pub bytes: u32,
}

/// Per-process queues of inserted requests.
///
/// Unmatched entries are kept for the whole conversion.
#[derive(Debug, Default)]
pub struct SendCorrelator {
    queues: HashMap<u32, Vec<PendingSend>>,
}

impl SendCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_insert(&mut self, pid: u32, send: PendingSend) {
        self.queues.entry(pid).or_default().push(send);
    }

    /// Start time of the communication ending at a dispatch.
    ///
    /// Consumes the most recently inserted request of `pid` with the same
    /// sector and length. Without one the edge starts at the dispatch
    /// itself.
    pub fn match_dispatch(&mut self, pid: u32, sector: u64, bytes: u32, time: u64) -> u64 {
        let Some(queue) = self.queues.get_mut(&pid) else {
            return time;
        };
        match queue
            .iter()
            .rposition(|send| send.sector == sector && send.bytes == bytes)
        {
            Some(idx) => queue.remove(idx).time,
            None => time,
        }
    }

    /// Number of inserts still waiting for `pid`.
    pub fn pending(&self, pid: u32) -> usize {
        self.queues.get(&pid).map_or(0, Vec::len)
    }
}
