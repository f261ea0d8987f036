//! The heuristic scoring model: decay, per-event weights, path sensitivity,
//! honeypot bypass, and extension penalties. See SPEC_FULL.md §4.3 for the
//! exact step order this function follows; the order is load-bearing (e.g.
//! decay always runs before the new event's contribution is added).

use std::time::Instant;

use crate::config::Config;
use crate::event::{Event, EventType};
use crate::state::ProcessStats;

const SUSPICIOUS_EXTENSIONS: &[&str] = &[
    ".locked", ".enc", ".cry", ".crypto", ".crypted", ".wanna", ".dark",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmReason {
    HoneypotWrite,
    HoneypotRename,
    HoneypotAccess,
    SuspiciousExtension,
    RiskThresholdExceeded,
}

impl AlarmReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmReason::HoneypotWrite => "HONEYPOT WRITE",
            AlarmReason::HoneypotRename => "HONEYPOT RENAME",
            AlarmReason::HoneypotAccess => "HONEYPOT ACCESS",
            AlarmReason::SuspiciousExtension => "SUSPICIOUS EXTENSION",
            AlarmReason::RiskThresholdExceeded => "RISK THRESHOLD EXCEEDED",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoreReport {
    pub delta: i32,
    pub new_score: i32,
    pub alarm: Option<AlarmReason>,
}

/// Applies decay, scores `event` against `stats`, mutates `stats` in place,
/// and reports whether an alarm fired. Pure aside from that mutation.
pub fn apply(stats: &mut ProcessStats, event: &Event, config: &Config, now: Instant) -> ScoreReport {
    apply_decay(stats, now);

    let mut delta = base_weight(stats, event, config);
    let mut reason = honeypot_bonus(event, config, &mut delta);

    let multiplier = path_multiplier(&event.filename);
    delta = ((delta as f64) * multiplier) as i32;

    apply_extension_penalty(event, config, &mut delta, &mut reason);

    stats.current_score += delta;
    let new_score = stats.current_score;

    let alarm = if new_score >= config.risk_threshold {
        Some(reason.unwrap_or(AlarmReason::RiskThresholdExceeded))
    } else {
        None
    };

    if alarm.is_some() {
        stats.current_score = 0;
        stats.write_burst = 0;
        stats.rename_burst = 0;
        stats.last_decay_time = now;
    }

    ScoreReport {
        delta,
        new_score,
        alarm,
    }
}

/// Step 1: exponential decay, 10% of the current score per elapsed second,
/// floored, with a minimum decay of 1 while the score is still positive.
fn apply_decay(stats: &mut ProcessStats, now: Instant) {
    let elapsed = now.saturating_duration_since(stats.last_decay_time);
    if elapsed.as_secs() < 1 {
        return;
    }
    let dt = elapsed.as_secs() as i64;
    let mut decay = ((stats.current_score as i64) as f64 * 0.10 * dt as f64).floor() as i32;
    if stats.current_score > 0 && decay == 0 {
        decay = 1;
    }
    stats.current_score = (stats.current_score - decay).max(0);
    if stats.current_score == 0 {
        stats.write_burst = 0;
        stats.rename_burst = 0;
    }
    stats.last_decay_time = now;
}

/// Step 2: base weight by event type, plus burst/total-count bookkeeping.
fn base_weight(stats: &mut ProcessStats, event: &Event, config: &Config) -> i32 {
    match event.event_type {
        EventType::Write => {
            stats.write_burst += 1;
            stats.total_write_count += 1;
            config.score_write
        }
        EventType::Rename => {
            stats.rename_burst += 1;
            config.score_rename
        }
        EventType::Unlink => config.score_unlink,
        EventType::Open | EventType::Exec => 0,
        EventType::Exit => 0,
    }
}

/// Step 3: honeypot substring bypass for WRITE/RENAME/OPEN.
fn honeypot_bonus(event: &Event, config: &Config, delta: &mut i32) -> Option<AlarmReason> {
    if config.honeypot_file.is_empty() {
        return None;
    }
    let matches = !event.filename.is_empty() && event.filename.contains(&config.honeypot_file);
    if !matches {
        return None;
    }
    match event.event_type {
        EventType::Write => {
            *delta += config.score_honeypot;
            Some(AlarmReason::HoneypotWrite)
        }
        EventType::Rename => {
            *delta += config.score_honeypot;
            Some(AlarmReason::HoneypotRename)
        }
        EventType::Open => {
            *delta += config.score_honeypot;
            Some(AlarmReason::HoneypotAccess)
        }
        _ => None,
    }
}

/// Step 4: path-prefix sensitivity multiplier, applied to the accumulated
/// delta including any honeypot bonus.
fn path_multiplier(filename: &str) -> f64 {
    if filename.starts_with("/etc") {
        5.0
    } else if filename.starts_with("/home") {
        2.0
    } else if filename.starts_with("/var/www") {
        2.0
    } else if filename.starts_with("/tmp") {
        0.5
    } else {
        1.0
    }
}

/// Step 5: suspicious extension penalty for WRITE/RENAME.
fn apply_extension_penalty(
    event: &Event,
    config: &Config,
    delta: &mut i32,
    reason: &mut Option<AlarmReason>,
) {
    if !matches!(event.event_type, EventType::Write | EventType::Rename) {
        return;
    }
    if SUSPICIOUS_EXTENSIONS.iter().any(|ext| event.filename.ends_with(ext)) {
        *delta += config.score_ext_penalty;
        if reason.is_none() {
            *reason = Some(AlarmReason::SuspiciousExtension);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn event(event_type: EventType, filename: &str) -> Event {
        Event {
            event_type,
            pid: 1001,
            ppid: 1,
            uid: 1000,
            comm: "attacker".to_string(),
            filename: filename.to_string(),
        }
    }

    fn fresh_stats(now: Instant) -> ProcessStats {
        ProcessStats {
            pid: 1001,
            comm: "attacker".to_string(),
            current_score: 0,
            write_burst: 0,
            rename_burst: 0,
            total_write_count: 0,
            window_start_time: now,
            last_decay_time: now,
        }
    }

    #[test]
    fn write_burst_triggers_alarm_and_resets() {
        let config = Config {
            score_write: 10,
            risk_threshold: 100,
            ..Config::default()
        };
        let now = Instant::now();
        let mut stats = fresh_stats(now);
        let mut alarms = 0;
        for _ in 0..11 {
            let report = apply(&mut stats, &event(EventType::Write, ""), &config, now);
            if report.alarm.is_some() {
                alarms += 1;
            }
        }
        assert_eq!(alarms, 1);
        assert_eq!(stats.current_score, 0);
    }

    #[test]
    fn normal_user_below_threshold_does_not_alarm() {
        let config = Config {
            score_write: 10,
            risk_threshold: 100,
            ..Config::default()
        };
        let now = Instant::now();
        let mut stats = fresh_stats(now);
        let mut last = None;
        for _ in 0..5 {
            last = Some(apply(&mut stats, &event(EventType::Write, ""), &config, now));
        }
        assert!(last.unwrap().alarm.is_none());
        assert_eq!(stats.current_score, 50);
    }

    #[test]
    fn decay_reduces_score_before_new_event_is_applied() {
        let config = Config {
            score_write: 10,
            risk_threshold: 1_000_000,
            ..Config::default()
        };
        let t0 = Instant::now();
        let mut stats = fresh_stats(t0);
        stats.current_score = 90;
        stats.last_decay_time = t0;
        let t1 = t0 + Duration::from_secs(10);
        let report = apply(&mut stats, &event(EventType::Write, ""), &config, t1);
        assert!(report.alarm.is_none());
        assert_eq!(stats.current_score, 10);
    }

    #[test]
    fn rename_with_suspicious_extension_accumulates_and_alarms() {
        let config = Config {
            score_rename: 20,
            score_ext_penalty: 50,
            risk_threshold: 100,
            ..Config::default()
        };
        let now = Instant::now();
        let mut stats = fresh_stats(now);
        let r1 = apply(&mut stats, &event(EventType::Rename, "data.txt.locked"), &config, now);
        assert!(r1.alarm.is_none());
        assert_eq!(stats.current_score, 70);
        let r2 = apply(&mut stats, &event(EventType::Rename, "data.txt.locked"), &config, now);
        assert!(r2.alarm.is_some());
    }

    #[test]
    fn honeypot_access_fires_single_event_alarm() {
        let config = Config {
            score_honeypot: 1000,
            honeypot_file: "secret_passwords.txt".to_string(),
            risk_threshold: 100,
            ..Config::default()
        };
        let now = Instant::now();
        let mut stats = fresh_stats(now);
        let report = apply(
            &mut stats,
            &event(EventType::Open, "/var/www/secret_passwords.txt"),
            &config,
            now,
        );
        assert_eq!(report.alarm, Some(AlarmReason::HoneypotAccess));
        assert_eq!(report.delta, 2000);
    }

    #[test]
    fn whitelisted_path_scores_are_unaffected_by_unrelated_prefixes() {
        let config = Config {
            score_write: 10,
            risk_threshold: 1_000_000,
            ..Config::default()
        };
        let now = Instant::now();
        let mut stats = fresh_stats(now);
        apply(&mut stats, &event(EventType::Write, "/tmp/scratch"), &config, now);
        assert_eq!(stats.current_score, 5); // 10 * 0.5 truncated
    }

    #[test]
    fn open_events_have_zero_base_score() {
        let config = Config {
            risk_threshold: 1_000_000,
            ..Config::default()
        };
        let now = Instant::now();
        let mut stats = fresh_stats(now);
        apply(&mut stats, &event(EventType::Open, "/etc/passwd"), &config, now);
        assert_eq!(stats.current_score, 0);
    }
}
