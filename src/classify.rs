//! Mapping from blktrace action words to Paraver event types and values.
//!
//! Everything here is pure: the same action word always classifies the same
//! way, and the numeric codes written to the trace come only from the enums
//! below.

use crate::blktrace::constants::*;

/// Paraver event values. The discriminants are the codes written to the
/// trace and listed in the legend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum EventValue {
    Completed = 0,
    Issue = 1,
    Dispatch = 2,
    Flush = 3,
    ReadMeta = 4,
    WriteMeta = 5,
    ReadSync = 6,
    WriteSync = 7,
    Read = 8,
    Write = 9,
    DRead = 10,
    DWrite = 11,
    CRead = 12,
    CWrite = 13,
    DReadSync = 14,
    DWriteSync = 15,
    CReadSync = 16,
    CWriteSync = 17,
    Merge = 18,
    ReadAhead = 19,
    FrontMerge = 20,
    BackMerge = 21,
    LastElement = 22,
}

impl EventValue {
    pub const ALL: [EventValue; 23] = [
        EventValue::Completed,
        EventValue::Issue,
        EventValue::Dispatch,
        EventValue::Flush,
        EventValue::ReadMeta,
        EventValue::WriteMeta,
        EventValue::ReadSync,
        EventValue::WriteSync,
        EventValue::Read,
        EventValue::Write,
        EventValue::DRead,
        EventValue::DWrite,
        EventValue::CRead,
        EventValue::CWrite,
        EventValue::DReadSync,
        EventValue::DWriteSync,
        EventValue::CReadSync,
        EventValue::CWriteSync,
        EventValue::Merge,
        EventValue::ReadAhead,
        EventValue::FrontMerge,
        EventValue::BackMerge,
        EventValue::LastElement,
    ];

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            EventValue::Completed => "Completed",
            EventValue::Issue => "ISSUE",
            EventValue::Dispatch => "DISPATCH",
            EventValue::Flush => "FLUSH",
            EventValue::ReadMeta => "READMETA",
            EventValue::WriteMeta => "WRITEMETA",
            EventValue::ReadSync => "READSYNC",
            EventValue::WriteSync => "WRITESYNC",
            EventValue::Read => "READ",
            EventValue::Write => "WRITE",
            EventValue::DRead => "DREAD",
            EventValue::DWrite => "DWRITE",
            EventValue::CRead => "CREAD",
            EventValue::CWrite => "CWRITE",
            EventValue::DReadSync => "DREADSYNC",
            EventValue::DWriteSync => "DWRITESYNC",
            EventValue::CReadSync => "CREADSYNC",
            EventValue::CWriteSync => "CWRITESYNC",
            EventValue::Merge => "MERGE",
            EventValue::ReadAhead => "READAHEAD",
            EventValue::FrontMerge => "FRONTMERGE",
            EventValue::BackMerge => "BACKMERGE",
            EventValue::LastElement => "LAST_ELEMENT",
        }
    }
}

/// Paraver event types. Each request class gets its own type so that the
/// visualizer can stack reads and writes separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum EventClass {
    Read = 100_000,
    Write = 100_001,
    ReadSync = 100_002,
    WriteSync = 100_003,
    ReadMeta = 100_004,
    WriteMeta = 100_005,
    Merge = 100_006,
    ReadAhead = 100_007,
    EnergyChannel1 = 100_008,
    EnergyChannel2 = 100_009,
}

impl EventClass {
    /// Classes that describe block I/O, in legend order.
    pub const IO: [EventClass; 8] = [
        EventClass::Read,
        EventClass::Write,
        EventClass::ReadSync,
        EventClass::WriteSync,
        EventClass::ReadMeta,
        EventClass::WriteMeta,
        EventClass::Merge,
        EventClass::ReadAhead,
    ];

    pub const ENERGY: [EventClass; 2] = [EventClass::EnergyChannel1, EventClass::EnergyChannel2];

    pub fn type_code(self) -> u32 {
        self as u32
    }

    /// Value recorded when a request of this class enters a new stage.
    /// Energy channels carry raw samples instead.
    pub fn value(self) -> Option<EventValue> {
        match self {
            EventClass::Read => Some(EventValue::Read),
            EventClass::Write => Some(EventValue::Write),
            EventClass::ReadSync => Some(EventValue::ReadSync),
            EventClass::WriteSync => Some(EventValue::WriteSync),
            EventClass::ReadMeta => Some(EventValue::ReadMeta),
            EventClass::WriteMeta => Some(EventValue::WriteMeta),
            EventClass::Merge => Some(EventValue::Merge),
            EventClass::ReadAhead => Some(EventValue::ReadAhead),
            EventClass::EnergyChannel1 | EventClass::EnergyChannel2 => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EventClass::Read => "READ",
            EventClass::Write => "WRITE",
            EventClass::ReadSync => "READSYNC",
            EventClass::WriteSync => "WRITESYNC",
            EventClass::ReadMeta => "READMETA",
            EventClass::WriteMeta => "WRITEMETA",
            EventClass::Merge => "MERGE",
            EventClass::ReadAhead => "READAHEAD",
            EventClass::EnergyChannel1 => "ENERGY_CHANNEL_1",
            EventClass::EnergyChannel2 => "ENERGY_CHANNEL_2",
        }
    }
}

/// Request attribute bits of an action word. They are not mutually
/// exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestFlags {
    pub write: bool,
    pub sync: bool,
    pub meta: bool,
    pub ahead: bool,
}

impl RequestFlags {
    pub fn from_action(action: u32) -> Self {
        RequestFlags {
            write: action & blk_tc_act(BLK_TC_WRITE) != 0,
            sync: action & blk_tc_act(BLK_TC_SYNC) != 0,
            meta: action & blk_tc_act(BLK_TC_META) != 0,
            ahead: action & blk_tc_act(BLK_TC_AHEAD) != 0,
        }
    }

    /// Request class with precedence meta > sync > write/read.
    pub fn class(self) -> EventClass {
        match (self.meta, self.sync, self.write) {
            (true, _, true) => EventClass::WriteMeta,
            (true, _, false) => EventClass::ReadMeta,
            (false, true, true) => EventClass::WriteSync,
            (false, true, false) => EventClass::ReadSync,
            (false, false, true) => EventClass::Write,
            (false, false, false) => EventClass::Read,
        }
    }
}

/// Lifecycle stage of a request, derived from the action opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Admitted to the request queue (`__BLK_TA_INSERT`).
    Insert,
    /// Handed to the driver (`__BLK_TA_ISSUE`).
    Dispatch,
    Complete,
    /// Front or back merge into an already queued request.
    Merge,
    /// A queued read-ahead request.
    ReadAhead,
}

impl Stage {
    pub fn from_action(action: u32) -> Option<Stage> {
        match blk_ta_opcode(action) {
            BLK_TA_INSERT => Some(Stage::Insert),
            BLK_TA_ISSUE => Some(Stage::Dispatch),
            BLK_TA_COMPLETE => Some(Stage::Complete),
            BLK_TA_FRONTMERGE | BLK_TA_BACKMERGE => Some(Stage::Merge),
            BLK_TA_QUEUE if RequestFlags::from_action(action).ahead => Some(Stage::ReadAhead),
            _ => None,
        }
    }
}

/// Classify an action word. Returns `None` for opcodes that produce no
/// output.
pub fn classify(action: u32) -> Option<(Stage, EventClass)> {
    let stage = Stage::from_action(action)?;
    let class = match stage {
        Stage::Insert | Stage::Dispatch | Stage::Complete => {
            RequestFlags::from_action(action).class()
        }
        Stage::Merge => EventClass::Merge,
        Stage::ReadAhead => EventClass::ReadAhead,
    };
    Some((stage, class))
}
