//! blkparaver - blktrace to Paraver conversion and per-process I/O statistics.
//!
//! This library backs the `blktrace2paraver` and `blktrace2stats` binaries.
//!
//! # Modules
//!
//! - [`blktrace`] - binary `blk_io_trace` decoding
//! - [`classify`] - action words to Paraver event types and values
//! - [`registry`] - Paraver thread indices for traced processes
//! - [`tracker`] - in-flight requests and completion matching
//! - [`correlate`] - insert/dispatch pairing for communication records
//! - [`output`] - Paraver `.prv`/`.row`/`.pcf` writer
//! - [`telemetry`] - auxiliary energy samples
//! - [`convert`] - the conversion pass
//! - [`stats`] - per-process counters and their renderings
//!
//! # Example
//!
//! ```no_run
//! use blkparaver::convert::{convert, Config};
//! use std::path::PathBuf;
//!
//! let summary = convert(&Config {
//!     input: PathBuf::from("sda.blktrace.bin"),
//!     output: PathBuf::from("sda"),
//!     comms: true,
//!     ..Config::default()
//! })
//! .expect("conversion failed");
//! println!("wrote {}", summary.files.prv.display());
//! ```

pub mod blktrace;
pub mod classify;
pub mod convert;
pub mod correlate;
pub mod output;
pub mod registry;
pub mod stats;
pub mod telemetry;
pub mod tracker;
pub mod utils;

pub use convert::{convert, Config, ConversionSummary};
