//! Per-process I/O statistics.
//!
//! Counts how many requests every process inserted, had dispatched and saw
//! completed, split by request kind. Unlike the Paraver conversion this does
//! no request matching at all.

use std::collections::BTreeMap;
use std::io::Read;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::blktrace::{Payload, TraceReader, TraceRecord};
use crate::classify::{RequestFlags, Stage};

/// Event counters of one process.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IoCounts {
    pub inserted: u64,
    pub dispatched: u64,
    pub completed: u64,
    pub read_meta: u64,
    pub write_meta: u64,
    pub insert_read: u64,
    pub insert_read_sync: u64,
    pub insert_write: u64,
    pub insert_write_sync: u64,
    pub dispatch_read: u64,
    pub dispatch_read_sync: u64,
    pub dispatch_write: u64,
    pub dispatch_write_sync: u64,
    pub complete_read: u64,
    pub complete_read_sync: u64,
    pub complete_write: u64,
    pub complete_write_sync: u64,
    pub merges: u64,
    pub read_ahead: u64,
}

impl IoCounts {
    /// Account one lifecycle record.
    pub fn count(&mut self, action: u32) {
        let Some(stage) = Stage::from_action(action) else {
            return;
        };
        let flags = RequestFlags::from_action(action);

        match stage {
            Stage::Insert => {
                self.inserted += 1;
                *pick(
                    flags,
                    [
                        &mut self.insert_write_sync,
                        &mut self.insert_read_sync,
                        &mut self.insert_write,
                        &mut self.insert_read,
                    ],
                ) += 1;
            }
            Stage::Dispatch => {
                self.dispatched += 1;
                if flags.meta {
                    if flags.write {
                        self.write_meta += 1;
                    } else {
                        self.read_meta += 1;
                    }
                } else {
                    *pick(
                        flags,
                        [
                            &mut self.dispatch_write_sync,
                            &mut self.dispatch_read_sync,
                            &mut self.dispatch_write,
                            &mut self.dispatch_read,
                        ],
                    ) += 1;
                }
            }
            Stage::Complete => {
                self.completed += 1;
                *pick(
                    flags,
                    [
                        &mut self.complete_write_sync,
                        &mut self.complete_read_sync,
                        &mut self.complete_write,
                        &mut self.complete_read,
                    ],
                ) += 1;
            }
            Stage::Merge => self.merges += 1,
            Stage::ReadAhead => self.read_ahead += 1,
        }
    }
}

/// Select among `[write sync, read sync, write, read]` counters, sync taking
/// precedence over direction.
fn pick(flags: RequestFlags, counters: [&mut u64; 4]) -> &mut u64 {
    let [write_sync, read_sync, write, read] = counters;
    match (flags.sync, flags.write) {
        (true, true) => write_sync,
        (true, false) => read_sync,
        (false, true) => write,
        (false, false) => read,
    }
}

/// Statistics row of one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessStats {
    pub pid: u32,
    pub name: String,
    #[serde(flatten)]
    pub counts: IoCounts,
}

/// Per-process counters, ordered by pid.
#[derive(Debug, Default)]
pub struct StatsCollector {
    counts: BTreeMap<u32, IoCounts>,
    names: BTreeMap<u32, String>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account one record. Every record gives its pid a row; only records
    /// without payload are counted.
    pub fn add(&mut self, record: &TraceRecord) {
        let counts = self.counts.entry(record.pid).or_default();
        match &record.payload {
            Payload::ProcessName(Some(name)) => {
                self.names.insert(record.pid, name.clone());
            }
            Payload::None if !record.is_notify() => counts.count(record.action),
            _ => {}
        }
    }

    /// Read and count every record of a trace.
    pub fn from_reader<R: Read>(input: R) -> Result<Self> {
        let mut collector = StatsCollector::new();
        for record in TraceReader::new(input) {
            let record = record.context("Malformed trace record")?;
            collector.add(&record);
        }
        Ok(collector)
    }

    pub fn rows(&self) -> Vec<ProcessStats> {
        self.counts
            .iter()
            .map(|(&pid, &counts)| ProcessStats {
                pid,
                name: self.names.get(&pid).cloned().unwrap_or_default(),
                counts,
            })
            .collect()
    }
}

/// Output layout of the statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsFormat {
    Table,
    Wiki,
    Json,
}

/// Rendering options.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub format: StatsFormat,
    /// Merge insert/dispatch/complete counters into `i/d/c` columns.
    pub compact: bool,
    /// Column width of the table layout.
    pub width: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            format: StatsFormat::Table,
            compact: false,
            width: 5,
        }
    }
}

pub fn render(rows: &[ProcessStats], opts: &RenderOptions) -> Result<String> {
    Ok(match opts.format {
        StatsFormat::Table => render_table(rows, opts.compact, opts.width),
        StatsFormat::Wiki => render_wiki(rows, opts.compact),
        StatsFormat::Json => serde_json::to_string_pretty(rows)? + "\n",
    })
}

const NAME_WIDTH: usize = 16;

/// Shorten counters that do not fit a column: values with `width` or more
/// digits are shown in thousands.
pub fn abbreviate(value: u64, width: usize) -> String {
    let text = value.to_string();
    if text.len() >= width {
        format!("{}K", value / 1000)
    } else {
        text
    }
}

fn triplet(values: [u64; 3], width: usize) -> String {
    values
        .iter()
        .map(|v| abbreviate(*v, width))
        .collect::<Vec<_>>()
        .join("/")
}

impl IoCounts {
    /// Insert/dispatch/complete triplets for R, RS, W and WS.
    fn triplets(&self) -> [[u64; 3]; 4] {
        [
            [self.insert_read, self.dispatch_read, self.complete_read],
            [self.insert_read_sync, self.dispatch_read_sync, self.complete_read_sync],
            [self.insert_write, self.dispatch_write, self.complete_write],
            [self.insert_write_sync, self.dispatch_write_sync, self.complete_write_sync],
        ]
    }

    /// The same counters in expanded column order (IR IRS DR DRS CR CRS,
    /// then the write side).
    fn expanded(&self) -> [u64; 12] {
        [
            self.insert_read,
            self.insert_read_sync,
            self.dispatch_read,
            self.dispatch_read_sync,
            self.complete_read,
            self.complete_read_sync,
            self.insert_write,
            self.insert_write_sync,
            self.dispatch_write,
            self.dispatch_write_sync,
            self.complete_write,
            self.complete_write_sync,
        ]
    }

    /// RA, M, I, D and C.
    fn totals(&self) -> [u64; 5] {
        [self.read_ahead, self.merges, self.inserted, self.dispatched, self.completed]
    }
}

const COMPACT_HEADERS: [&str; 4] = ["R", "RS", "W", "WS"];
const EXPANDED_HEADERS: [&str; 12] = [
    "IR", "IRS", "DR", "DRS", "CR", "CRS", "IW", "IWS", "DW", "DWS", "CW", "CWS",
];
const TOTAL_HEADERS: [&str; 5] = ["RA", "M", "I", "D", "C"];

pub fn render_table(rows: &[ProcessStats], compact: bool, width: usize) -> String {
    let w = width;
    let wide = width * 3;
    let column = |text: &str| format!("{text:>w$}");

    let mut out = format!("{:>NAME_WIDTH$}{:>w$}{:>w$}{:>w$}", "Process", "PID", "RMD", "WMD");
    if compact {
        out.extend(COMPACT_HEADERS.iter().map(|h| format!("{h:>wide$}")));
    } else {
        out.extend(EXPANDED_HEADERS.iter().map(|h| column(h)));
    }
    out.extend(TOTAL_HEADERS.iter().map(|h| column(h)));
    out.push('\n');

    for row in rows {
        let c = &row.counts;
        out.push_str(&format!(
            "{:>NAME_WIDTH$}{:>w$}{:>w$}{:>w$}",
            row.name,
            row.pid,
            abbreviate(c.read_meta, w),
            abbreviate(c.write_meta, w)
        ));
        if compact {
            out.extend(
                c.triplets()
                    .into_iter()
                    .map(|values| format!("{:>wide$}", triplet(values, w))),
            );
        } else {
            out.extend(c.expanded().into_iter().map(|v| column(&abbreviate(v, w))));
        }
        out.extend(c.totals().into_iter().map(|v| column(&abbreviate(v, w))));
        out.push('\n');
    }
    out
}

pub fn render_wiki(rows: &[ProcessStats], compact: bool) -> String {
    let counters: &[&str] = if compact {
        &COMPACT_HEADERS
    } else {
        &EXPANDED_HEADERS
    };
    let header: Vec<&str> = ["Process", "PID", "RM", "WM"]
        .into_iter()
        .chain(counters.iter().copied())
        .chain(TOTAL_HEADERS)
        .collect();

    let mut out = String::from("{|border=\"1\"\n");
    out.push_str(&format!("!{}\n", header.join("||")));
    out.push_str("|- align=\"right\"\n");

    for row in rows {
        let c = &row.counts;
        let mut cells = vec![
            row.name.clone(),
            row.pid.to_string(),
            c.read_meta.to_string(),
            c.write_meta.to_string(),
        ];
        if compact {
            cells.extend(c.triplets().into_iter().map(|values| {
                values
                    .iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join("/")
            }));
        } else {
            cells.extend(c.expanded().iter().map(u64::to_string));
        }
        cells.extend(c.totals().iter().map(u64::to_string));
        out.push_str(&format!("|{}\n", cells.join("||")));
        out.push_str("|- align=\"right\"\n");
    }

    out.push_str("|}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blktrace::constants::*;
    use crate::blktrace::BlkIoTrace;

    fn record(action: u32, pid: u32) -> TraceRecord {
        TraceRecord::from_parts(
            &BlkIoTrace {
                action,
                pid,
                ..Default::default()
            },
            &[],
        )
    }

    fn name(pid: u32, name: &str) -> TraceRecord {
        TraceRecord::from_parts(
            &BlkIoTrace {
                action: BLK_TN_PROCESS,
                pid,
                pdu_len: name.len() as u16,
                ..Default::default()
            },
            name.as_bytes(),
        )
    }

    fn collect(records: &[TraceRecord]) -> Vec<ProcessStats> {
        let mut collector = StatsCollector::new();
        for r in records {
            collector.add(r);
        }
        collector.rows()
    }

    #[test]
    fn test_counts_per_stage() {
        let w = blk_tc_act(BLK_TC_WRITE);
        let s = blk_tc_act(BLK_TC_SYNC);
        let m = blk_tc_act(BLK_TC_META);
        let rows = collect(&[
            name(5, "dd"),
            record(BLK_TA_INSERT | w, 5),
            record(BLK_TA_INSERT | w | s, 5),
            record(BLK_TA_INSERT | m, 5),
            record(BLK_TA_ISSUE | w | m, 5),
            record(BLK_TA_ISSUE | s, 5),
            record(BLK_TA_COMPLETE | w | m, 5),
            record(BLK_TA_BACKMERGE, 5),
            record(BLK_TA_FRONTMERGE, 5),
            record(BLK_TA_QUEUE | blk_tc_act(BLK_TC_AHEAD), 5),
            record(BLK_TA_QUEUE, 5),
            record(BLK_TA_PLUG, 5),
        ]);

        assert_eq!(rows.len(), 1);
        let c = rows[0].counts;
        assert_eq!(rows[0].name, "dd");
        assert_eq!(c.inserted, 3);
        assert_eq!(c.insert_write, 1);
        assert_eq!(c.insert_write_sync, 1);
        assert_eq!(c.insert_read, 1);
        assert_eq!(c.dispatched, 2);
        assert_eq!(c.write_meta, 1);
        assert_eq!(c.dispatch_read_sync, 1);
        assert_eq!(c.completed, 1);
        assert_eq!(c.complete_write, 1);
        assert_eq!(c.merges, 2);
        assert_eq!(c.read_ahead, 1);
    }

    #[test]
    fn test_rows_sorted_by_pid() {
        let rows = collect(&[record(BLK_TA_INSERT, 9), name(3, "three"), record(BLK_TA_ISSUE, 3)]);
        let pids: Vec<u32> = rows.iter().map(|r| r.pid).collect();
        assert_eq!(pids, vec![3, 9]);
        assert_eq!(rows[1].name, "");
        assert_eq!(rows[1].counts.inserted, 1);
    }

    #[test]
    fn test_abbreviate() {
        assert_eq!(abbreviate(999, 5), "999");
        assert_eq!(abbreviate(9999, 5), "9999");
        assert_eq!(abbreviate(12_345, 5), "12K");
        assert_eq!(abbreviate(123, 3), "0K");
    }

    #[test]
    fn test_table_layout() {
        let rows = collect(&[name(5, "dd"), record(BLK_TA_INSERT, 5)]);
        let table = render_table(&rows, false, 5);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 16 + 5 * 20);
        assert_eq!(lines[1].len(), lines[0].len());
        assert!(lines[0].starts_with("         Process  PID  RMD  WMD   IR  IRS"));
        assert!(lines[1].starts_with("              dd    5    0    0    1    0"));
        assert!(lines[1].ends_with("    0    0    1    0    0"));
    }

    #[test]
    fn test_compact_table_layout() {
        let rows = collect(&[name(5, "dd"), record(BLK_TA_INSERT, 5), record(BLK_TA_ISSUE, 5)]);
        let table = render_table(&rows, true, 4);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0].len(), 16 + 4 * 3 + 12 * 4 + 4 * 5);
        assert_eq!(
            lines[0],
            "         Process PID RMD WMD           R          RS           W          WS  RA   M   I   D   C"
        );
        assert!(lines[1].contains("       1/1/0"));
    }

    #[test]
    fn test_wiki_layout() {
        let rows = collect(&[name(5, "dd"), record(BLK_TA_INSERT, 5)]);
        let wiki = render_wiki(&rows, true);
        assert_eq!(
            wiki,
            "{|border=\"1\"\n\
             !Process||PID||RM||WM||R||RS||W||WS||RA||M||I||D||C\n\
             |- align=\"right\"\n\
             |dd||5||0||0||1/0/0||0/0/0||0/0/0||0/0/0||0||0||1||0||0\n\
             |- align=\"right\"\n\
             |}\n"
        );

        let expanded = render_wiki(&rows, false);
        assert!(expanded.starts_with(
            "{|border=\"1\"\n!Process||PID||RM||WM||IR||IRS||DR||DRS||CR||CRS||IW||IWS||DW||DWS||CW||CWS||RA||M||I||D||C\n"
        ));
        assert!(expanded.contains("|dd||5||0||0||1||0||0||0||0||0||0||0||0||0||0||0||0||0||1||0||0\n"));
    }

    #[test]
    fn test_json_rows() {
        let rows = collect(&[name(5, "dd"), record(BLK_TA_COMPLETE, 5)]);
        let json = render(
            &rows,
            &RenderOptions {
                format: StatsFormat::Json,
                ..Default::default()
            },
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["pid"], 5);
        assert_eq!(value[0]["name"], "dd");
        assert_eq!(value[0]["completed"], 1);
        assert_eq!(value[0]["complete_read"], 1);
    }
}
