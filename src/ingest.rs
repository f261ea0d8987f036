//! The event ingest loop: polls the ring buffer transport and drives every
//! event through the self-PID filter, EXIT handling, state lookup,
//! whitelist filter, audit log, scorer, and response controller, in that
//! exact order (SPEC_FULL §4.1).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::config::Config;
use crate::event::{Event, EventType};
use crate::logger::Logger;
use crate::response::ResponseController;
use crate::ringbuffer::{decode_and_dispatch, EventSource, PollOutcome, PollError};
use crate::scorer;
use crate::state::StateManager;
use crate::whitelist::Whitelist;

const POLL_TIMEOUT: Duration = Duration::from_millis(100);

pub struct IngestLoop<'a> {
    pub config: &'a Config,
    pub clock: &'a dyn Clock,
    pub logger: &'a mut Logger,
    pub state: StateManager,
    pub whitelist: Whitelist,
    pub own_pid: u32,
}

impl<'a> IngestLoop<'a> {
    pub fn new(config: &'a Config, clock: &'a dyn Clock, logger: &'a mut Logger, own_pid: u32) -> Self {
        IngestLoop {
            config,
            clock,
            logger,
            state: StateManager::new(),
            whitelist: Whitelist::from_csv(&config.whitelist_csv),
            own_pid,
        }
    }

    /// Runs until `cancel` is set or the transport reports [`PollOutcome::Closed`].
    pub fn run(&mut self, source: &mut dyn EventSource, cancel: &Arc<AtomicBool>) {
        loop {
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            match source.poll(POLL_TIMEOUT, &mut |bytes| {
                decode_and_dispatch(bytes, |event| self.handle_event(event));
            }) {
                Ok(PollOutcome::Continue) => continue,
                Ok(PollOutcome::Closed) => break,
                Err(PollError::Transport(msg)) => {
                    self.logger.error(&format!("ring buffer transport error: {msg}"));
                    break;
                }
            }
        }
        self.state.drain();
    }

    fn handle_event(&mut self, event: Event) {
        if event.pid == self.own_pid {
            return;
        }

        if event.event_type == EventType::Exit {
            self.state.remove(event.pid);
            return;
        }

        let now = self.clock.now();
        let stats = self.state.get_or_create(event.pid, &event.comm, now);

        if self.whitelist.contains(&stats.comm) {
            return;
        }

        self.logger.audit(&event);

        let report = scorer::apply(stats, &event, self.config, now);

        if let Some(reason) = report.alarm {
            if let Some(stats_snapshot) = self.state.get(event.pid).cloned() {
                ResponseController::react(
                    self.logger,
                    &self.whitelist,
                    self.config,
                    &stats_snapshot,
                    event.ppid,
                    event.uid,
                    &event.filename,
                    reason,
                    report.new_score,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::event::{COMM_LEN, EVENT_RECORD_SIZE};
    use crate::ringbuffer::ScriptedEventSource;

    fn record(t: i32, pid: u32, comm: &str) -> Vec<u8> {
        let mut buf = vec![0u8; EVENT_RECORD_SIZE];
        buf[0..4].copy_from_slice(&t.to_ne_bytes());
        buf[4..8].copy_from_slice(&pid.to_ne_bytes());
        let comm_bytes = comm.as_bytes();
        buf[16..16 + comm_bytes.len().min(COMM_LEN)]
            .copy_from_slice(&comm_bytes[..comm_bytes.len().min(COMM_LEN)]);
        buf
    }

    #[test]
    fn exit_event_removes_process_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        let clock = FakeClock::new();
        config.service_log = dir.path().join("service.log");
        config.audit_log = dir.path().join("audit.json");
        config.alert_log = dir.path().join("alerts.json");
        let mut logger = Logger::new(&config, 99999);

        let mut loop_ = IngestLoop::new(&config, &clock, &mut logger, 1);
        let mut source = ScriptedEventSource::new(vec![
            vec![record(2, 42, "victim")],
            vec![record(5, 42, "victim")],
        ]);
        let cancel = Arc::new(AtomicBool::new(false));
        loop_.run(&mut source, &cancel);

        assert!(loop_.state.is_empty());
    }

    #[test]
    fn self_pid_events_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.service_log = dir.path().join("service.log");
        config.audit_log = dir.path().join("audit.json");
        config.alert_log = dir.path().join("alerts.json");
        let clock = FakeClock::new();
        let mut logger = Logger::new(&config, 42);

        let mut loop_ = IngestLoop::new(&config, &clock, &mut logger, 42);
        let mut source = ScriptedEventSource::new(vec![vec![record(2, 42, "self")]]);
        let cancel = Arc::new(AtomicBool::new(false));
        loop_.run(&mut source, &cancel);

        assert!(loop_.state.is_empty());
    }
}
