//! Paraver trace writer.
//!
//! A Paraver trace is three files sharing a base name:
//!
//! - `.prv`: header line plus one line per record
//! - `.row`: thread names, indexed by thread number
//! - `.pcf`: names of event types and values
//!
//! The `.prv` header carries the trace end time, which is only known once
//! every record has been seen. Records are therefore spooled to a temporary
//! file next to the output and copied behind the header in [`ParaverWriter::finish`].

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use super::legend::Legend;
use super::types::{CommRecord, ParaverHeader, StateRecord};
use super::TraceOutput;

/// Paths of a finished Paraver trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParaverFiles {
    pub prv: PathBuf,
    pub row: PathBuf,
    pub pcf: PathBuf,
}

impl ParaverFiles {
    pub fn for_base(base: &Path) -> Self {
        ParaverFiles {
            prv: with_extension_appended(base, "prv"),
            row: with_extension_appended(base, "row"),
            pcf: with_extension_appended(base, "pcf"),
        }
    }
}

/// Append `.ext` to `base` without replacing an existing extension, so a
/// base of `run.2024` yields `run.2024.prv`.
fn with_extension_appended(base: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Streams records into a spool file and assembles the trace on finish.
pub struct ParaverWriter {
    files: ParaverFiles,
    body: BufWriter<NamedTempFile>,
    records: u64,
}

impl ParaverWriter {
    /// Prepare a writer for `<base>.prv`, `<base>.row` and `<base>.pcf`.
    pub fn create(base: &Path) -> Result<Self> {
        let dir = match base.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let spool = tempfile::Builder::new()
            .prefix(".blkparaver-")
            .suffix(".prv.tmp")
            .tempfile_in(&dir)
            .with_context(|| format!("Failed to create spool file in {}", dir.display()))?;

        Ok(ParaverWriter {
            files: ParaverFiles::for_base(base),
            body: BufWriter::new(spool),
            records: 0,
        })
    }

    /// Number of records written to the body so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Write the three trace files. The spool file is removed afterwards.
    pub fn finish(
        self,
        header: &ParaverHeader,
        thread_names: &[String],
        legend: &Legend,
    ) -> Result<ParaverFiles> {
        let ParaverWriter { files, body, .. } = self;

        let mut spool = body
            .into_inner()
            .map_err(|e| e.into_error())
            .context("Failed to flush trace body")?;
        spool
            .as_file_mut()
            .seek(SeekFrom::Start(0))
            .context("Failed to rewind trace body")?;

        let prv = File::create(&files.prv)
            .with_context(|| format!("Failed to create {}", files.prv.display()))?;
        let mut prv = BufWriter::new(prv);
        writeln!(prv, "{header}")?;
        io::copy(spool.as_file_mut(), &mut prv)
            .with_context(|| format!("Failed to write {}", files.prv.display()))?;
        prv.flush()?;

        write_row(&files.row, thread_names)?;

        std::fs::write(&files.pcf, legend.render())
            .with_context(|| format!("Failed to write {}", files.pcf.display()))?;

        Ok(files)
    }
}

fn write_row(path: &Path, thread_names: &[String]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut row = BufWriter::new(file);
    writeln!(row, "LEVEL THREAD SIZE {}", thread_names.len())?;
    for name in thread_names {
        writeln!(row, "{name}")?;
    }
    row.flush()
        .with_context(|| format!("Failed to write {}", path.display()))
}

impl TraceOutput for ParaverWriter {
    fn write_state(&mut self, record: &StateRecord) -> Result<()> {
        writeln!(self.body, "{record}")?;
        self.records += 1;
        Ok(())
    }

    fn write_comm(&mut self, record: &CommRecord) -> Result<()> {
        writeln!(self.body, "{record}")?;
        self.records += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.body.flush().context("Failed to flush trace body")
    }
}
