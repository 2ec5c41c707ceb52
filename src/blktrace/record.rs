use std::mem;

use plain::Plain;

use super::constants::*;

/// On-disk layout of `struct blk_io_trace`, as written by `blkparse -d`.
///
/// Fields are stored in the byte order of the machine that captured the
/// trace; we decode them natively.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BlkIoTrace {
    pub magic: u32,
    pub sequence: u32,
    pub time: u64,
    pub sector: u64,
    pub bytes: u32,
    pub action: u32,
    pub pid: u32,
    pub device: u32,
    pub cpu: u32,
    pub error: u16,
    pub pdu_len: u16,
}

unsafe impl Plain for BlkIoTrace {}

/// Size of the fixed record header.
pub const BLK_IO_TRACE_SIZE: usize = mem::size_of::<BlkIoTrace>();

impl BlkIoTrace {
    /// Serialize the header in native byte order.
    ///
    /// Mostly useful for building fixture traces.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(BLK_IO_TRACE_SIZE);
        buf.extend_from_slice(&self.magic.to_ne_bytes());
        buf.extend_from_slice(&self.sequence.to_ne_bytes());
        buf.extend_from_slice(&self.time.to_ne_bytes());
        buf.extend_from_slice(&self.sector.to_ne_bytes());
        buf.extend_from_slice(&self.bytes.to_ne_bytes());
        buf.extend_from_slice(&self.action.to_ne_bytes());
        buf.extend_from_slice(&self.pid.to_ne_bytes());
        buf.extend_from_slice(&self.device.to_ne_bytes());
        buf.extend_from_slice(&self.cpu.to_ne_bytes());
        buf.extend_from_slice(&self.error.to_ne_bytes());
        buf.extend_from_slice(&self.pdu_len.to_ne_bytes());
        buf
    }

    pub fn has_valid_magic(&self) -> bool {
        self.magic & BLK_IO_TRACE_MAGIC_MASK == BLK_IO_TRACE_MAGIC
    }
}

/// Decoded payload following a record header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    None,
    /// Command name of the process the record's pid belongs to. `None` when
    /// the tracer emitted an empty name.
    ProcessName(Option<String>),
    /// Remap data, notify messages and anything else we do not interpret.
    Opaque(usize),
}

/// One decoded trace record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub time: u64,
    pub sequence: u32,
    pub sector: u64,
    pub bytes: u32,
    pub action: u32,
    pub pid: u32,
    pub device: u32,
    pub cpu: u32,
    pub error: u16,
    pub payload: Payload,
}

impl TraceRecord {
    pub fn from_parts(header: &BlkIoTrace, pdu: &[u8]) -> Self {
        TraceRecord {
            time: header.time,
            sequence: header.sequence,
            sector: header.sector,
            bytes: header.bytes,
            action: header.action,
            pid: header.pid,
            device: header.device,
            cpu: header.cpu,
            error: header.error,
            payload: decode_payload(header.action, pdu),
        }
    }

    pub fn has_category(&self, category: u32) -> bool {
        self.action & blk_tc_act(category) != 0
    }

    pub fn is_notify(&self) -> bool {
        self.has_category(BLK_TC_NOTIFY)
    }

    /// Whether this record describes a step in a request's life. Notify
    /// records and records carrying a payload (other than a bare cgroup id)
    /// do not.
    pub fn is_lifecycle(&self) -> bool {
        !self.is_notify() && self.payload == Payload::None
    }

    /// Paraver resource (CPU) the record is attributed to. Paraver counts
    /// from one.
    pub fn resource(&self) -> u32 {
        self.cpu + 1
    }
}

fn decode_payload(action: u32, pdu: &[u8]) -> Payload {
    let pdu = if action & BLK_TA_CGROUP != 0 && pdu.len() >= CGROUP_ID_LEN {
        &pdu[CGROUP_ID_LEN..]
    } else {
        pdu
    };

    if action & !BLK_TA_CGROUP == BLK_TN_PROCESS {
        return Payload::ProcessName(decode_name(pdu));
    }

    if pdu.is_empty() {
        Payload::None
    } else {
        Payload::Opaque(pdu.len())
    }
}

fn decode_name(pdu: &[u8]) -> Option<String> {
    let end = pdu.iter().position(|&b| b == 0).unwrap_or(pdu.len());
    let name = String::from_utf8_lossy(&pdu[..end]).trim().to_string();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
