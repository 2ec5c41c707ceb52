//! Records written to the Paraver trace body.

use std::fmt;

/// A state change of one thread: `2:cpu:appl:task:thread:time:type:value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateRecord {
    /// Paraver resource (CPU, 1-based).
    pub resource: u32,
    pub thread: u32,
    pub time: u64,
    pub type_code: u32,
    pub value: u64,
}

/// A message between two threads:
/// `3:cpu:appl:task:thread:lsend:psend:cpu:appl:task:thread:lrecv:precv:size:tag`.
///
/// blktrace gives a single timestamp per side, so the physical send and the
/// logical and physical receive all collapse onto `recv_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommRecord {
    pub send_resource: u32,
    pub send_thread: u32,
    pub send_time: u64,
    pub recv_resource: u32,
    pub recv_thread: u32,
    pub recv_time: u64,
    /// Request length in bytes.
    pub size: u32,
    /// Request start sector, used as the message tag.
    pub offset: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputRecord {
    State(StateRecord),
    Comm(CommRecord),
}

impl fmt::Display for StateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "2:{}:1:1:{}:{}:{}:{}",
            self.resource, self.thread, self.time, self.type_code, self.value
        )
    }
}

impl fmt::Display for CommRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "3:{}:1:1:{}:{}:{}:{}:1:1:{}:{}:{}:{}:{}",
            self.send_resource,
            self.send_thread,
            self.send_time,
            self.recv_time,
            self.recv_resource,
            self.recv_thread,
            self.recv_time,
            self.recv_time,
            self.size,
            self.offset
        )
    }
}

impl fmt::Display for OutputRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputRecord::State(s) => s.fmt(f),
            OutputRecord::Comm(c) => c.fmt(f),
        }
    }
}

/// First line of a `.prv` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParaverHeader {
    /// Largest timestamp in the trace body.
    pub end_time: u64,
    /// Number of threads, i.e. the highest thread index.
    pub threads: u32,
}

/// Date stamp written in every header. Fixed so that converting the same
/// input twice produces identical files.
pub const HEADER_DATE: &str = "06/08/14 at 23:30";

/// CPUs declared for the single resource node.
pub const RESOURCE_CPUS: u32 = 8;

impl fmt::Display for ParaverHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#Paraver ({}):{}:1({}):1:1({}:1)",
            HEADER_DATE, self.end_time, RESOURCE_CPUS, self.threads
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_line() {
        let state = StateRecord {
            resource: 3,
            thread: 2,
            time: 1500,
            type_code: 100_001,
            value: 9,
        };
        assert_eq!(state.to_string(), "2:3:1:1:2:1500:100001:9");
    }

    #[test]
    fn test_comm_line() {
        let comm = CommRecord {
            send_resource: 1,
            send_thread: 4,
            send_time: 100,
            recv_resource: 1,
            recv_thread: 1,
            recv_time: 250,
            size: 4096,
            offset: 2048,
        };
        assert_eq!(
            comm.to_string(),
            "3:1:1:1:4:100:250:1:1:1:1:250:250:4096:2048"
        );
    }

    #[test]
    fn test_header_line() {
        let header = ParaverHeader {
            end_time: 987_654,
            threads: 5,
        };
        assert_eq!(
            header.to_string(),
            "#Paraver (06/08/14 at 23:30):987654:1(8):1:1(5:1)"
        );
    }
}
