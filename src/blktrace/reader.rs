//! Streaming decoder for `blkparse -d` output.

use std::io::{self, BufReader, ErrorKind, Read};

use thiserror::Error;

use super::constants::MAX_PDU_LEN;
use super::record::{BlkIoTrace, TraceRecord, BLK_IO_TRACE_SIZE};

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("record {sequence} declares a {len} byte payload (limit {max})", max = MAX_PDU_LEN)]
    OversizedPayload { sequence: u32, len: usize },

    #[error("failed to decode record header: {0:?}")]
    Header(plain::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Iterator over the records of a binary trace.
///
/// The sequence ends at the first short read, so a trace truncated in the
/// middle of a record yields every complete record before it. Any error is
/// yielded once and ends the sequence.
pub struct TraceReader<R: Read> {
    inner: BufReader<R>,
    header: [u8; BLK_IO_TRACE_SIZE],
    pdu: Vec<u8>,
    done: bool,
    records: u64,
    bad_magic_reported: bool,
}

impl<R: Read> TraceReader<R> {
    pub fn new(inner: R) -> Self {
        TraceReader {
            inner: BufReader::new(inner),
            header: [0; BLK_IO_TRACE_SIZE],
            pdu: Vec::new(),
            done: false,
            records: 0,
            bad_magic_reported: false,
        }
    }

    /// Number of complete records yielded so far.
    pub fn records_read(&self) -> u64 {
        self.records
    }

    fn read_record(&mut self) -> Result<Option<TraceRecord>, TraceError> {
        if !fill(&mut self.inner, &mut self.header)? {
            return Ok(None);
        }

        let mut trace = BlkIoTrace::default();
        plain::copy_from_bytes(&mut trace, &self.header).map_err(TraceError::Header)?;

        if !trace.has_valid_magic() && !self.bad_magic_reported {
            self.bad_magic_reported = true;
            tracing::warn!(
                "Record {} has magic {:#010x}, input may not be blkparse binary output",
                trace.sequence,
                trace.magic
            );
        }

        let pdu_len = trace.pdu_len as usize;
        if pdu_len > MAX_PDU_LEN {
            return Err(TraceError::OversizedPayload {
                sequence: trace.sequence,
                len: pdu_len,
            });
        }

        self.pdu.resize(pdu_len, 0);
        if !fill(&mut self.inner, &mut self.pdu)? {
            tracing::debug!("Trace ends inside the payload of record {}", trace.sequence);
            return Ok(None);
        }

        self.records += 1;
        Ok(Some(TraceRecord::from_parts(&trace, &self.pdu)))
    }
}

/// Fill `buf` completely. Returns `false` when the stream ends first.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

impl<R: Read> Iterator for TraceReader<R> {
    type Item = Result<TraceRecord, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
