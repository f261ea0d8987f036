//! Three independent append-only sinks: a human-readable, ANSI-colored
//! service log; a JSON-lines audit log; and a JSON-lines alert log.
//!
//! Durability: audit and alert records, plus ERROR/ALARM service records,
//! are `flush`ed (and `sync_data`'d) before the write call returns. Lower
//! service levels may be buffered by the OS and are only guaranteed to be
//! on disk by process exit.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use colored::Colorize;
use serde::Serialize;

use crate::config::Config;
use crate::event::Event;

/// Wire shape of one audit-log line. Field declaration order is the JSON
/// key order (`serde_json` preserves struct field order), matching
/// SPEC_FULL §4.5's `{"timestamp":…,"type":…}` schema.
#[derive(Serialize)]
struct AuditRecord<'a> {
    timestamp: String,
    #[serde(rename = "type")]
    event_type: &'a str,
    pid: u32,
    ppid: u32,
    uid: u32,
    comm: &'a str,
    filename: &'a str,
}

/// Wire shape of one alert-log line.
#[derive(Serialize)]
struct AlertRecord<'a> {
    timestamp: String,
    level: &'a str,
    alert_type: &'a str,
    pid: u32,
    ppid: u32,
    uid: u32,
    comm: &'a str,
    filename: &'a str,
    risk_reason: &'a str,
    score: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Alarm,
}

impl Level {
    fn label(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Alarm => "ALARM",
        }
    }

    fn colorize(&self, text: &str) -> String {
        match self {
            Level::Debug => text.blue().to_string(),
            Level::Info => text.green().to_string(),
            Level::Warn => text.yellow().to_string(),
            Level::Error | Level::Alarm => text.red().to_string(),
        }
    }

    fn must_flush(&self) -> bool {
        matches!(self, Level::Error | Level::Alarm)
    }
}

/// A sink that silently becomes a no-op if its backing file could not be
/// opened at startup, per SPEC_FULL §4.5's "recoverable runtime" policy.
struct Sink {
    file: Option<File>,
}

impl Sink {
    fn open(path: &Path, label: &str) -> Sink {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Sink { file: Some(file) },
            Err(err) => {
                eprintln!("WARN: failed to open {label} log at {}: {err}; sink disabled", path.display());
                Sink { file: None }
            }
        }
    }

    fn write_line(&mut self, line: &str, flush: bool) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        let _ = writeln!(file, "{line}");
        if flush {
            let _ = file.flush();
            let _ = file.sync_data();
        }
    }
}

pub struct Logger {
    service: Sink,
    audit: Sink,
    alert: Sink,
    verbose: bool,
    pid: u32,
}

impl Logger {
    pub fn new(config: &Config, pid: u32) -> Logger {
        Logger {
            service: Sink::open(&config.service_log, "service"),
            audit: Sink::open(&config.audit_log, "audit"),
            alert: Sink::open(&config.alert_log, "alert"),
            verbose: config.verbose,
            pid,
        }
    }

    pub fn log(&mut self, level: Level, message: &str) {
        if level == Level::Debug && !self.verbose {
            return;
        }
        let ts = format_timestamp(SystemTime::now());
        let plain = format!("[{ts}] [{}] [{}] {message}", level.label(), self.pid);
        let console_line = format!("[{ts}] [{}] [{}] {message}", level.colorize(level.label()), self.pid);
        println!("{console_line}");
        self.service.write_line(&plain, level.must_flush());
    }

    pub fn debug(&mut self, message: &str) {
        self.log(Level::Debug, message);
    }
    pub fn info(&mut self, message: &str) {
        self.log(Level::Info, message);
    }
    pub fn warn(&mut self, message: &str) {
        self.log(Level::Warn, message);
    }
    pub fn error(&mut self, message: &str) {
        self.log(Level::Error, message);
    }

    pub fn audit(&mut self, event: &Event) {
        let record = AuditRecord {
            timestamp: format_timestamp(SystemTime::now()),
            event_type: event.event_type.as_str(),
            pid: event.pid,
            ppid: event.ppid,
            uid: event.uid,
            comm: &event.comm,
            filename: &event.filename,
        };
        let line = serde_json::to_string(&record).expect("AuditRecord is always serializable");
        self.audit.write_line(&line, true);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn alert(
        &mut self,
        alert_type: &str,
        pid: u32,
        ppid: u32,
        uid: u32,
        comm: &str,
        filename: &str,
        risk_reason: &str,
        score: i32,
    ) {
        let record = AlertRecord {
            timestamp: format_timestamp(SystemTime::now()),
            level: "ALARM",
            alert_type,
            pid,
            ppid,
            uid,
            comm,
            filename,
            risk_reason,
            score,
        };
        let line = serde_json::to_string(&record).expect("AlertRecord is always serializable");
        self.alert.write_line(&line, true);
        self.log(Level::Alarm, &format!("{alert_type}: pid={pid} comm={comm} reason={risk_reason}"));
    }

    pub fn flush(&mut self) {
        if let Some(f) = self.service.file.as_mut() {
            let _ = f.flush();
        }
        if let Some(f) = self.audit.file.as_mut() {
            let _ = f.flush();
        }
        if let Some(f) = self.alert.file.as_mut() {
            let _ = f.flush();
        }
    }
}

/// `YYYY-MM-DD HH:MM:SS.mmm` in UTC, computed without a date/time crate via
/// the civil-from-days algorithm (Howard Hinnant's `civil_from_days`).
fn format_timestamp(t: SystemTime) -> String {
    let dur = t.duration_since(UNIX_EPOCH).unwrap_or_default();
    let millis = dur.subsec_millis();
    let secs = dur.as_secs() as i64;
    let days = secs.div_euclid(86_400);
    let secs_of_day = secs.rem_euclid(86_400);
    let (y, m, d) = civil_from_days(days);
    let hh = secs_of_day / 3600;
    let mm = (secs_of_day % 3600) / 60;
    let ss = secs_of_day % 60;
    format!("{y:04}-{m:02}-{d:02} {hh:02}:{mm:02}:{ss:02}.{millis:03}")
}

fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}
