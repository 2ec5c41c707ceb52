//! Kernel blktrace binary format.
//!
//! - [`constants`]: action opcodes and category bits
//! - [`record`]: the fixed `blk_io_trace` header and decoded records
//! - [`reader`]: lazy record iterator over a byte stream

pub mod constants;
pub mod reader;
pub mod record;

pub use reader::{TraceError, TraceReader};
pub use record::{BlkIoTrace, Payload, TraceRecord, BLK_IO_TRACE_SIZE};
