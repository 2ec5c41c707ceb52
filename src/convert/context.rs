//! State of a single conversion pass.
//!
//! All bookkeeping the pass needs lives in [`ConversionContext`]: the thread
//! registry, the in-flight tracker and, when communications are enabled, the
//! send correlator. Records are fed in trace order and the resulting Paraver
//! records go straight to the output.

use anyhow::Result;

use crate::blktrace::{Payload, TraceRecord};
use crate::classify::{classify, EventClass, EventValue, Stage};
use crate::correlate::{PendingSend, SendCorrelator};
use crate::output::{CommRecord, ParaverHeader, StateRecord, TraceOutput};
use crate::registry::{ThreadRegistry, DISK_THREAD};
use crate::telemetry::{self, TelemetrySample, CHANNEL_NAMES};
use crate::tracker::{InFlightTracker, Owner, PendingRange};

/// Counters reported at the end of a conversion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConversionStats {
    /// Records read from the trace, including name records.
    pub records: u64,
    /// Lifecycle records whose opcode produces no output.
    pub ignored: u64,
    pub states: u64,
    pub comms: u64,
    /// Pending ranges retired by completions.
    pub retired: u64,
}

pub struct ConversionContext<O: TraceOutput> {
    output: O,
    registry: ThreadRegistry,
    tracker: InFlightTracker,
    correlator: Option<SendCorrelator>,
    energy_threads: Option<[u32; 2]>,
    end_time: u64,
    stats: ConversionStats,
}

impl<O: TraceOutput> ConversionContext<O> {
    /// Create a context. Synthetic threads are reserved here, before any
    /// process can be registered.
    pub fn new(output: O, comms: bool, energy: bool) -> Self {
        let mut registry = ThreadRegistry::new();
        let energy_threads =
            energy.then(|| [registry.reserve(CHANNEL_NAMES[0]), registry.reserve(CHANNEL_NAMES[1])]);

        ConversionContext {
            output,
            registry,
            tracker: InFlightTracker::new(),
            correlator: comms.then(SendCorrelator::new),
            energy_threads,
            end_time: 0,
            stats: ConversionStats::default(),
        }
    }

    pub fn registry(&self) -> &ThreadRegistry {
        &self.registry
    }

    pub fn tracker(&self) -> &InFlightTracker {
        &self.tracker
    }

    pub fn stats(&self) -> ConversionStats {
        self.stats
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    /// Header describing everything written so far.
    pub fn header(&self) -> ParaverHeader {
        ParaverHeader {
            end_time: self.end_time,
            threads: self.registry.len(),
        }
    }

    /// Hand back the output together with the registry, whose names make up
    /// the `.row` file.
    pub fn into_parts(self) -> (O, ThreadRegistry) {
        (self.output, self.registry)
    }

    /// Feed one trace record.
    pub fn process(&mut self, record: &TraceRecord) -> Result<()> {
        self.stats.records += 1;

        if let Payload::ProcessName(name) = &record.payload {
            self.registry.register(record.pid, name.clone());
            return Ok(());
        }
        if !record.is_lifecycle() {
            return Ok(());
        }
        // Every lifecycle record moves the trace end, written or not.
        self.end_time = self.end_time.max(record.time);

        let Some((stage, class)) = classify(record.action) else {
            self.stats.ignored += 1;
            return Ok(());
        };

        match stage {
            Stage::Insert => self.on_insert(record, class),
            Stage::Dispatch => self.on_dispatch(record, class),
            Stage::Complete => self.on_complete(record, class),
            Stage::Merge | Stage::ReadAhead => {
                let thread = self.registry.thread_of(record.pid);
                self.state(record, thread, class, class.value())
            }
        }
    }

    fn on_insert(&mut self, record: &TraceRecord, class: EventClass) -> Result<()> {
        let thread = self.registry.thread_of(record.pid);
        self.state(record, thread, class, class.value())?;

        self.tracker.push(
            class,
            Owner::Process(record.pid),
            PendingRange::new(record.sector, record.bytes as u64),
        );
        if let Some(correlator) = self.correlator.as_mut() {
            correlator.record_insert(
                record.pid,
                PendingSend {
                    time: record.time,
                    sector: record.sector,
                    bytes: record.bytes,
                },
            );
        }
        Ok(())
    }

    fn on_dispatch(&mut self, record: &TraceRecord, class: EventClass) -> Result<()> {
        self.state(record, DISK_THREAD, class, class.value())?;
        self.tracker.push(
            class,
            Owner::Disk,
            PendingRange::new(record.sector, record.bytes as u64),
        );

        if let Some(correlator) = self.correlator.as_mut() {
            let send_time =
                correlator.match_dispatch(record.pid, record.sector, record.bytes, record.time);
            let sender = self.registry.thread_of(record.pid);
            self.comm(CommRecord {
                send_resource: record.resource(),
                send_thread: sender,
                send_time,
                recv_resource: record.resource(),
                recv_thread: DISK_THREAD,
                recv_time: record.time,
                size: record.bytes,
                offset: record.sector,
            })?;
        }
        Ok(())
    }

    fn on_complete(&mut self, record: &TraceRecord, class: EventClass) -> Result<()> {
        let completed = PendingRange::new(record.sector, record.bytes as u64);
        let retired = self.tracker.complete(class, completed);
        let comms = self.correlator.is_some();

        for entry in retired {
            self.stats.retired += entry.count as u64;
            let thread = match entry.owner {
                Owner::Disk => DISK_THREAD,
                Owner::Process(pid) => self.registry.thread_of(pid),
            };
            for _ in 0..entry.count {
                self.state(record, thread, class, Some(EventValue::Completed))?;
                if comms && entry.owner != Owner::Disk {
                    self.comm(CommRecord {
                        send_resource: record.resource(),
                        send_thread: DISK_THREAD,
                        send_time: record.time,
                        recv_resource: record.resource(),
                        recv_thread: thread,
                        recv_time: record.time,
                        size: record.bytes,
                        offset: record.sector,
                    })?;
                }
            }
        }

        // The completing process always gets a record, even when it owned
        // none of the retired ranges (and again when it did).
        let thread = self.registry.thread_of(record.pid);
        self.state(record, thread, class, Some(EventValue::Completed))
    }

    /// Append the telemetry samples after the trace records.
    pub fn emit_telemetry(&mut self, samples: &[TelemetrySample]) -> Result<()> {
        let Some(threads) = self.energy_threads else {
            return Ok(());
        };
        for state in telemetry::to_records(samples, threads) {
            self.end_time = self.end_time.max(state.time);
            self.output.write_state(&state)?;
            self.stats.states += 1;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.output.flush()
    }

    fn state(
        &mut self,
        record: &TraceRecord,
        thread: u32,
        class: EventClass,
        value: Option<EventValue>,
    ) -> Result<()> {
        let state = StateRecord {
            resource: record.resource(),
            thread,
            time: record.time,
            type_code: class.type_code(),
            value: value.map_or(0, |v| v.code() as u64),
        };
        self.stats.states += 1;
        self.output.write_state(&state)
    }

    fn comm(&mut self, comm: CommRecord) -> Result<()> {
        self.stats.comms += 1;
        self.output.write_comm(&comm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blktrace::constants::*;
    use crate::blktrace::BlkIoTrace;
    use crate::output::InMemoryOutput;

    fn record(time: u64, action: u32, pid: u32, sector: u64, bytes: u32) -> TraceRecord {
        let header = BlkIoTrace {
            magic: BLK_IO_TRACE_MAGIC | 7,
            time,
            action,
            pid,
            sector,
            bytes,
            ..Default::default()
        };
        TraceRecord::from_parts(&header, &[])
    }

    fn name(pid: u32, name: &str) -> TraceRecord {
        let header = BlkIoTrace {
            action: BLK_TN_PROCESS,
            pid,
            pdu_len: name.len() as u16,
            ..Default::default()
        };
        TraceRecord::from_parts(&header, name.as_bytes())
    }

    fn context(comms: bool) -> ConversionContext<InMemoryOutput> {
        ConversionContext::new(InMemoryOutput::new(), comms, false)
    }

    fn lines(ctx: &ConversionContext<InMemoryOutput>) -> Vec<String> {
        ctx.output().lines()
    }

    #[test]
    fn test_insert_dispatch_complete() {
        let mut ctx = context(false);
        ctx.process(&name(5, "worker")).unwrap();
        ctx.process(&record(10, BLK_TA_INSERT, 5, 0, 8)).unwrap();
        ctx.process(&record(20, BLK_TA_ISSUE, 5, 0, 8)).unwrap();
        ctx.process(&record(30, BLK_TA_COMPLETE, 5, 0, 8)).unwrap();

        assert_eq!(
            lines(&ctx),
            vec![
                "2:1:1:1:2:10:100000:8",
                "2:1:1:1:1:20:100000:8",
                "2:1:1:1:1:30:100000:0",
                "2:1:1:1:2:30:100000:0",
                "2:1:1:1:2:30:100000:0",
            ]
        );
        assert!(ctx.tracker().is_empty());
        assert_eq!(ctx.output().comms().count(), 0);
        assert_eq!(ctx.header().end_time, 30);
        assert_eq!(ctx.header().threads, 2);
    }

    #[test]
    fn test_completion_counts_per_owner_plus_originator() {
        let mut ctx = context(false);
        ctx.process(&name(5, "a")).unwrap();
        ctx.process(&name(6, "b")).unwrap();
        ctx.process(&name(7, "irq")).unwrap();
        ctx.process(&record(1, BLK_TA_INSERT, 5, 0, 4)).unwrap();
        ctx.process(&record(2, BLK_TA_INSERT, 5, 4, 4)).unwrap();
        ctx.process(&record(3, BLK_TA_INSERT, 6, 100, 4)).unwrap();
        ctx.process(&record(4, BLK_TA_COMPLETE, 7, 0, 8)).unwrap();

        let completions: Vec<_> = ctx
            .output()
            .states()
            .filter(|s| s.time == 4)
            .map(|s| s.thread)
            .collect();
        assert_eq!(completions, vec![2, 2, 4]);
        assert_eq!(ctx.stats().retired, 2);
    }

    #[test]
    fn test_completion_without_matches_still_emits_one_record() {
        let mut ctx = context(false);
        ctx.process(&name(5, "a")).unwrap();
        ctx.process(&record(1, BLK_TA_INSERT, 5, 0, 4)).unwrap();
        ctx.process(&record(2, BLK_TA_COMPLETE, 5, 2, 4)).unwrap();

        assert_eq!(lines(&ctx)[1], "2:1:1:1:2:2:100000:0");
        assert_eq!(lines(&ctx).len(), 2);
        assert_eq!(ctx.tracker().len(), 1);
    }

    #[test]
    fn test_merge_and_read_ahead() {
        let mut ctx = context(false);
        ctx.process(&name(5, "a")).unwrap();
        ctx.process(&record(1, BLK_TA_BACKMERGE | blk_tc_act(BLK_TC_WRITE), 5, 0, 4))
            .unwrap();
        ctx.process(&record(2, BLK_TA_FRONTMERGE, 5, 0, 4)).unwrap();
        ctx.process(&record(3, BLK_TA_QUEUE | blk_tc_act(BLK_TC_AHEAD), 5, 0, 4))
            .unwrap();
        ctx.process(&record(4, BLK_TA_QUEUE, 5, 0, 4)).unwrap();

        assert_eq!(
            lines(&ctx),
            vec![
                "2:1:1:1:2:1:100006:18",
                "2:1:1:1:2:2:100006:18",
                "2:1:1:1:2:3:100007:19",
            ]
        );
        assert!(ctx.tracker().is_empty());
        assert_eq!(ctx.stats().ignored, 1);
        // the plain QUEUE writes nothing but still ends the trace
        assert_eq!(ctx.header().end_time, 4);
    }

    #[test]
    fn test_comms() {
        let mut ctx = context(true);
        ctx.process(&name(5, "worker")).unwrap();
        ctx.process(&record(10, BLK_TA_INSERT, 5, 16, 8)).unwrap();
        ctx.process(&record(20, BLK_TA_ISSUE, 5, 16, 8)).unwrap();
        ctx.process(&record(30, BLK_TA_COMPLETE, 5, 16, 8)).unwrap();

        let comms: Vec<String> = ctx.output().comms().map(ToString::to_string).collect();
        assert_eq!(
            comms,
            vec![
                "3:1:1:1:2:10:20:1:1:1:1:20:20:8:16",
                "3:1:1:1:1:30:30:1:1:1:2:30:30:8:16",
            ]
        );
    }

    #[test]
    fn test_dispatch_without_insert_is_zero_length_edge() {
        let mut ctx = context(true);
        ctx.process(&name(5, "worker")).unwrap();
        ctx.process(&record(20, BLK_TA_ISSUE, 5, 16, 8)).unwrap();

        let comm = *ctx.output().comms().next().unwrap();
        assert_eq!(comm.send_time, 20);
        assert_eq!(comm.recv_time, 20);
    }

    #[test]
    fn test_unnamed_process_uses_thread_zero() {
        let mut ctx = context(false);
        ctx.process(&record(1, BLK_TA_INSERT, 9, 0, 4)).unwrap();
        assert_eq!(lines(&ctx), vec!["2:1:1:1:0:1:100000:8"]);
        assert_eq!(ctx.registry().len(), 1);
    }

    #[test]
    fn test_payload_records_are_not_lifecycle_events() {
        let mut ctx = context(false);
        let header = BlkIoTrace {
            time: 99,
            action: BLK_TA_REMAP,
            pdu_len: 16,
            ..Default::default()
        };
        ctx.process(&TraceRecord::from_parts(&header, &[0u8; 16]))
            .unwrap();
        assert!(lines(&ctx).is_empty());
        assert_eq!(ctx.header().end_time, 0);
        assert_eq!(ctx.stats().records, 1);
    }

    #[test]
    fn test_resource_is_cpu_plus_one() {
        let mut ctx = context(false);
        ctx.process(&name(5, "a")).unwrap();
        let mut insert = record(1, BLK_TA_INSERT, 5, 0, 4);
        insert.cpu = 3;
        ctx.process(&insert).unwrap();
        assert_eq!(ctx.output().states().next().unwrap().resource, 4);
    }

    #[test]
    fn test_energy_threads_are_reserved_first() {
        let mut ctx = ConversionContext::new(InMemoryOutput::new(), false, true);
        ctx.process(&name(5, "worker")).unwrap();
        assert_eq!(ctx.registry().get(5), Some(4));
        assert_eq!(
            ctx.registry().names(),
            vec!["Disk", "Energy channel 1", "Energy channel 2", "worker"]
        );

        let samples = vec![
            telemetry::parse_line("10 1 2").unwrap(),
            telemetry::parse_line("12 3 4").unwrap(),
        ];
        ctx.emit_telemetry(&samples).unwrap();
        assert_eq!(ctx.output().states().count(), 4);
        assert_eq!(ctx.header().end_time, 2_000_000_000);
    }

    #[test]
    fn test_telemetry_ignored_when_disabled() {
        let mut ctx = context(false);
        let samples = vec![telemetry::parse_line("10 1 2").unwrap()];
        ctx.emit_telemetry(&samples).unwrap();
        assert!(lines(&ctx).is_empty());
    }
}
