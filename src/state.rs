//! Per-process behavioral state, keyed by PID.
//!
//! Ownership is single and clear: the ingest loop is the only caller, the
//! `StateManager` is the only owner of `ProcessStats`, and the scorer
//! borrows an entry mutably for the duration of one `apply` call. No
//! synchronization is needed.

use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct ProcessStats {
    pub pid: u32,
    pub comm: String,
    pub current_score: i32,
    pub write_burst: u32,
    pub rename_burst: u32,
    pub total_write_count: u64,
    pub window_start_time: Instant,
    pub last_decay_time: Instant,
}

impl ProcessStats {
    fn new(pid: u32, comm: &str, now: Instant) -> Self {
        ProcessStats {
            pid,
            comm: comm.to_string(),
            current_score: 0,
            write_burst: 0,
            rename_burst: 0,
            total_write_count: 0,
            window_start_time: now,
            last_decay_time: now,
        }
    }
}

#[derive(Debug, Default)]
pub struct StateManager {
    processes: HashMap<u32, ProcessStats>,
}

impl StateManager {
    pub fn new() -> Self {
        StateManager::default()
    }

    /// Returns the existing entry for `pid`, or inserts and returns a fresh
    /// one anchored at `now`. Never fails: `HashMap` allocation failure is
    /// not something Rust callers can distinguish from any other OOM, so
    /// unlike the original's malloc-checked variant this simply aborts like
    /// any other allocation in the process, which is the idiomatic stance.
    pub fn get_or_create(&mut self, pid: u32, comm: &str, now: Instant) -> &mut ProcessStats {
        self.processes
            .entry(pid)
            .or_insert_with(|| ProcessStats::new(pid, comm, now))
    }

    pub fn remove(&mut self, pid: u32) {
        self.processes.remove(&pid);
    }

    pub fn get(&self, pid: u32) -> Option<&ProcessStats> {
        self.processes.get(&pid)
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Removes and drops every tracked process. Called once at shutdown.
    pub fn drain(&mut self) {
        self.processes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_idempotent() {
        let mut sm = StateManager::new();
        let now = Instant::now();
        sm.get_or_create(100, "bash", now);
        sm.get_or_create(100, "bash", now).current_score = 42;
        assert_eq!(sm.get(100).unwrap().current_score, 42);
        assert_eq!(sm.len(), 1);
    }

    #[test]
    fn remove_is_idempotent_on_absent_pid() {
        let mut sm = StateManager::new();
        sm.remove(999);
        assert!(sm.is_empty());
    }

    #[test]
    fn drain_removes_everything() {
        let mut sm = StateManager::new();
        let now = Instant::now();
        sm.get_or_create(1, "a", now);
        sm.get_or_create(2, "b", now);
        sm.drain();
        assert!(sm.is_empty());
    }
}
