//! Dense Paraver thread indices for traced processes.
//!
//! Paraver identifies threads by a 1-based index into the `.row` name list.
//! Indices are handed out in the order processes are first named by the
//! trace and are never reused, so the registry doubles as the `.row`
//! contents.
//!
//! # Reserved indices
//!
//! Index 1 is the synthetic disk thread that owns dispatched requests. When
//! energy telemetry is converted as well, the next two indices belong to the
//! telemetry channels. Both are reserved before the first record is read.

use std::collections::{HashMap, HashSet};

/// Thread index of the synthetic disk thread.
pub const DISK_THREAD: u32 = 1;

/// Index reported for processes that never received a name record.
pub const UNKNOWN_THREAD: u32 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ThreadOwner {
    Synthetic,
    Process(u32),
}

#[derive(Debug, Clone)]
struct ThreadEntry {
    owner: ThreadOwner,
    name: Option<String>,
}

impl ThreadEntry {
    fn display_name(&self) -> String {
        match (&self.name, &self.owner) {
            (Some(name), _) => name.clone(),
            (None, ThreadOwner::Process(pid)) => format!("PID {pid}"),
            (None, ThreadOwner::Synthetic) => "Synthetic".to_string(),
        }
    }
}

/// Maps process ids to Paraver thread indices.
#[derive(Debug)]
pub struct ThreadRegistry {
    /// Entry for thread index `i` lives at `threads[i - 1]`.
    threads: Vec<ThreadEntry>,
    pid_to_thread: HashMap<u32, u32>,
    /// Pids we already warned about, to keep lookups of a chatty unnamed
    /// process from flooding the log.
    warned: HashSet<u32>,
}

impl ThreadRegistry {
    /// Create a registry holding only the disk thread.
    pub fn new() -> Self {
        let mut registry = ThreadRegistry {
            threads: Vec::new(),
            pid_to_thread: HashMap::new(),
            warned: HashSet::new(),
        };
        registry.reserve("Disk");
        registry
    }

    /// Reserve the next index for a synthetic thread and return it.
    pub fn reserve(&mut self, name: &str) -> u32 {
        self.threads.push(ThreadEntry {
            owner: ThreadOwner::Synthetic,
            name: Some(name.to_string()),
        });
        self.threads.len() as u32
    }

    /// Register `pid` or refresh its name.
    ///
    /// The first call for a pid assigns the next free index. Later calls
    /// update the name (unless it is `None`) and keep the index.
    pub fn register(&mut self, pid: u32, name: Option<String>) -> u32 {
        if let Some(&thread) = self.pid_to_thread.get(&pid) {
            if name.is_some() {
                self.threads[thread as usize - 1].name = name;
            }
            return thread;
        }

        self.threads.push(ThreadEntry {
            owner: ThreadOwner::Process(pid),
            name,
        });
        let thread = self.threads.len() as u32;
        self.pid_to_thread.insert(pid, thread);
        tracing::debug!("Registered pid {} as thread {}", pid, thread);
        thread
    }

    /// Index for `pid`, if it has been registered.
    pub fn get(&self, pid: u32) -> Option<u32> {
        self.pid_to_thread.get(&pid).copied()
    }

    /// Index for `pid`, falling back to [`UNKNOWN_THREAD`] with a warning.
    pub fn thread_of(&mut self, pid: u32) -> u32 {
        match self.get(pid) {
            Some(thread) => thread,
            None => {
                if self.warned.insert(pid) {
                    tracing::warn!("Pid {} has no process name record, using thread 0", pid);
                } else {
                    tracing::debug!("Lookup of unnamed pid {}", pid);
                }
                UNKNOWN_THREAD
            }
        }
    }

    /// Highest assigned index, which is also the number of threads.
    pub fn len(&self) -> u32 {
        self.threads.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Display names ordered by thread index, starting at index 1.
    pub fn names(&self) -> Vec<String> {
        self.threads.iter().map(ThreadEntry::display_name).collect()
    }
}

impl Default for ThreadRegistry {
    fn default() -> Self {
        Self::new()
    }
}
