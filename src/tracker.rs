//! In-flight request bookkeeping and completion matching.
//!
//! blktrace records carry no request identifier. A request is known only by
//! its class, the process that queued it and the sector range it covers.
//! Completions are matched by range containment: the block layer may merge
//! several queued requests into one before completing it, so a single
//! completion can retire many pending ranges.

use std::collections::{BTreeMap, HashMap};

use crate::classify::EventClass;

/// Holder of a pending range.
///
/// Inserted requests belong to the submitting process. Once dispatched they
/// belong to the device queue, represented by `Disk`. `Disk` orders before
/// every process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Owner {
    Disk,
    Process(u32),
}

/// A pending sector range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRange {
    pub start: u64,
    pub len: u64,
}

impl PendingRange {
    pub fn new(start: u64, len: u64) -> Self {
        PendingRange { start, len }
    }

    fn end(&self) -> u64 {
        self.start.saturating_add(self.len)
    }

    /// Whether `self` lies entirely within `outer`.
    pub fn is_within(&self, outer: &PendingRange) -> bool {
        self.start >= outer.start && self.end() <= outer.end()
    }
}

/// Ranges retired from one owner by a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retired {
    pub owner: Owner,
    pub count: usize,
}

/// Pending ranges keyed by class, then by owner.
#[derive(Debug, Default)]
pub struct InFlightTracker {
    pending: HashMap<EventClass, BTreeMap<Owner, Vec<PendingRange>>>,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a range as pending for `owner`.
    pub fn push(&mut self, class: EventClass, owner: Owner, range: PendingRange) {
        self.pending
            .entry(class)
            .or_default()
            .entry(owner)
            .or_default()
            .push(range);
    }

    /// Retire every pending range of `class` contained in `completed`.
    ///
    /// All owners are scanned in ascending order and every contained range
    /// is removed, not only the first. Owners that lose no range are left
    /// out of the result.
    pub fn complete(&mut self, class: EventClass, completed: PendingRange) -> Vec<Retired> {
        let Some(owners) = self.pending.get_mut(&class) else {
            return Vec::new();
        };

        let mut retired = Vec::new();
        for (owner, ranges) in owners.iter_mut() {
            let before = ranges.len();
            ranges.retain(|range| !range.is_within(&completed));
            let count = before - ranges.len();
            if count > 0 {
                retired.push(Retired {
                    owner: *owner,
                    count,
                });
            }
        }
        retired
    }

    /// Ranges still pending for `owner`, in insertion order.
    pub fn pending(&self, class: EventClass, owner: Owner) -> &[PendingRange] {
        self.pending
            .get(&class)
            .and_then(|owners| owners.get(&owner))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of ranges still pending.
    pub fn len(&self) -> usize {
        self.pending
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
