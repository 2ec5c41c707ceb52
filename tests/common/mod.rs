//! Common test utilities for blkparaver integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use blkparaver::blktrace::constants::*;
use blkparaver::blktrace::BlkIoTrace;

/// Builds a binary trace the way `blkparse -d` lays it out.
#[derive(Default)]
pub struct TraceBuilder {
    bytes: Vec<u8>,
    sequence: u32,
}

impl TraceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, mut header: BlkIoTrace, pdu: &[u8]) -> &mut Self {
        self.sequence += 1;
        header.magic = BLK_IO_TRACE_MAGIC | 7;
        header.sequence = self.sequence;
        header.pdu_len = pdu.len() as u16;
        self.bytes.extend(header.to_bytes());
        self.bytes.extend_from_slice(pdu);
        self
    }

    pub fn name(&mut self, pid: u32, name: &str) -> &mut Self {
        let mut pdu = name.as_bytes().to_vec();
        pdu.push(0);
        self.push(
            BlkIoTrace {
                action: BLK_TN_PROCESS,
                pid,
                ..Default::default()
            },
            &pdu,
        )
    }

    pub fn event(
        &mut self,
        time: u64,
        action: u32,
        pid: u32,
        sector: u64,
        bytes: u32,
    ) -> &mut Self {
        self.push(
            BlkIoTrace {
                time,
                action,
                pid,
                sector,
                bytes,
                ..Default::default()
            },
            &[],
        )
    }

    pub fn insert(&mut self, time: u64, pid: u32, sector: u64, bytes: u32) -> &mut Self {
        self.event(time, BLK_TA_INSERT, pid, sector, bytes)
    }

    pub fn issue(&mut self, time: u64, pid: u32, sector: u64, bytes: u32) -> &mut Self {
        self.event(time, BLK_TA_ISSUE, pid, sector, bytes)
    }

    pub fn complete(&mut self, time: u64, pid: u32, sector: u64, bytes: u32) -> &mut Self {
        self.event(time, BLK_TA_COMPLETE, pid, sector, bytes)
    }

    pub fn remap(&mut self, time: u64, pid: u32) -> &mut Self {
        self.push(
            BlkIoTrace {
                time,
                action: BLK_TA_REMAP,
                pid,
                ..Default::default()
            },
            &[0u8; 16],
        )
    }

    /// Append raw bytes, e.g. a torn record at the end of the file.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn write_to(&self, path: &Path) -> PathBuf {
        std::fs::write(path, &self.bytes).expect("Failed to write trace fixture");
        path.to_path_buf()
    }
}

/// Body lines of a `.prv` file, header excluded.
pub fn prv_body(prv: &str) -> Vec<&str> {
    prv.lines().skip(1).collect()
}
