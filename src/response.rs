//! Alarm response: always logs an alert; when `active_blocking` is on,
//! attempts to terminate the offending process behind two safety filters.
//!
//! The whitelist re-check here is defense-in-depth: the ingest loop already
//! filters whitelisted comms before reaching the scorer, but `comm` can be
//! reused by a different process between that check and this one, so the
//! filter is re-applied against the state actually being killed.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::config::Config;
use crate::logger::Logger;
use crate::scorer::AlarmReason;
use crate::state::ProcessStats;
use crate::whitelist::Whitelist;

pub struct ResponseController;

impl ResponseController {
    pub fn react(
        logger: &mut Logger,
        whitelist: &Whitelist,
        config: &Config,
        stats: &ProcessStats,
        ppid: u32,
        uid: u32,
        filename: &str,
        reason: AlarmReason,
        score: i32,
    ) {
        logger.alert(
            "RANSOMWARE_DETECTED",
            stats.pid,
            ppid,
            uid,
            &stats.comm,
            filename,
            reason.as_str(),
            score,
        );

        if !config.active_blocking {
            return;
        }

        if let Some(prevented_reason) = safety_filter(stats, whitelist) {
            logger.alert(
                "KILL_PREVENTED",
                stats.pid,
                ppid,
                uid,
                &stats.comm,
                filename,
                prevented_reason,
                score,
            );
            return;
        }

        match signal::kill(Pid::from_raw(stats.pid as i32), Signal::SIGKILL) {
            Ok(()) => {
                logger.alert(
                    "PROCESS_KILLED",
                    stats.pid,
                    ppid,
                    uid,
                    &stats.comm,
                    filename,
                    reason.as_str(),
                    score,
                );
            }
            Err(errno) => {
                logger.alert(
                    "KILL_FAILED",
                    stats.pid,
                    ppid,
                    uid,
                    &stats.comm,
                    filename,
                    &errno.to_string(),
                    score,
                );
            }
        }
    }
}

/// Returns `Some(reason)` if termination must be aborted.
fn safety_filter<'a>(stats: &ProcessStats, whitelist: &Whitelist) -> Option<&'a str> {
    if stats.pid <= 1 {
        return Some("Critical System Process Protection");
    }
    if whitelist.contains(&stats.comm) {
        return Some("Whitelisted Process Protection");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn stats(pid: u32, comm: &str) -> ProcessStats {
        ProcessStats {
            pid,
            comm: comm.to_string(),
            current_score: 0,
            write_burst: 0,
            rename_burst: 0,
            total_write_count: 0,
            window_start_time: Instant::now(),
            last_decay_time: Instant::now(),
        }
    }

    #[test]
    fn refuses_to_kill_pid_one() {
        let wl = Whitelist::from_csv("");
        let reason = safety_filter(&stats(1, "systemd"), &wl);
        assert_eq!(reason, Some("Critical System Process Protection"));
    }

    #[test]
    fn refuses_to_kill_whitelisted_comm() {
        let wl = Whitelist::from_csv("sshd");
        let reason = safety_filter(&stats(500, "sshd"), &wl);
        assert_eq!(reason, Some("Whitelisted Process Protection"));
    }

    #[test]
    fn allows_killing_ordinary_process() {
        let wl = Whitelist::from_csv("sshd");
        let reason = safety_filter(&stats(5000, "malware"), &wl);
        assert_eq!(reason, None);
    }
}
