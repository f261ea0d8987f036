//! Layered runtime configuration: built-in defaults, overlaid by an optional
//! `KEY=VALUE` file, overlaid by CLI flags. Mirrors the original agent's
//! config file grammar: blank lines and `#` comments are skipped, unknown
//! keys are ignored, values never contain `=`.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const DEFAULT_WINDOW_SEC: u64 = 5;
pub const DEFAULT_RISK_THRESHOLD: i32 = 100;
pub const DEFAULT_SCORE_WRITE: i32 = 2;
pub const DEFAULT_SCORE_RENAME: i32 = 20;
pub const DEFAULT_SCORE_UNLINK: i32 = 50;
pub const DEFAULT_SCORE_HONEYPOT: i32 = 1000;
pub const DEFAULT_SCORE_EXT_PENALTY: i32 = 50;

const DEFAULT_SERVICE_LOG: &str = "./service.log";
const DEFAULT_ALERT_LOG: &str = "./alerts.json";
const DEFAULT_AUDIT_LOG: &str = "./audit.json";
const MAX_WHITELIST_LEN: usize = 2048;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {path} not found")]
    NotFound { path: PathBuf },
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub window_sec: u64,
    pub risk_threshold: i32,
    pub score_write: i32,
    pub score_rename: i32,
    pub score_unlink: i32,
    pub score_honeypot: i32,
    pub score_ext_penalty: i32,
    pub active_blocking: bool,
    pub service_log: PathBuf,
    pub alert_log: PathBuf,
    pub audit_log: PathBuf,
    pub whitelist_csv: String,
    pub honeypot_file: String,
    pub verbose: bool,
    /// Legacy field: accepted from `--write-limit` / `WRITE_THRESHOLD` for
    /// command-line compatibility with the original tool. Unused by the
    /// current scoring algorithm (see SPEC_FULL §4.3).
    pub write_threshold: Option<u32>,
    /// Where the active config came from, for the startup summary.
    pub source: ConfigSource,
}

#[derive(Debug, Clone)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            window_sec: DEFAULT_WINDOW_SEC,
            risk_threshold: DEFAULT_RISK_THRESHOLD,
            score_write: DEFAULT_SCORE_WRITE,
            score_rename: DEFAULT_SCORE_RENAME,
            score_unlink: DEFAULT_SCORE_UNLINK,
            score_honeypot: DEFAULT_SCORE_HONEYPOT,
            score_ext_penalty: DEFAULT_SCORE_EXT_PENALTY,
            active_blocking: false,
            service_log: PathBuf::from(DEFAULT_SERVICE_LOG),
            alert_log: PathBuf::from(DEFAULT_ALERT_LOG),
            audit_log: PathBuf::from(DEFAULT_AUDIT_LOG),
            whitelist_csv: String::new(),
            honeypot_file: String::new(),
            verbose: false,
            write_threshold: None,
            source: ConfigSource::Defaults,
        }
    }
}

impl Config {
    /// Loads defaults, then applies `path` if given, else searches
    /// `./ransom.conf` then `/etc/ransom-bpf/ransom.conf`, else stays at
    /// embedded defaults. Never errors on "no config file found" unless an
    /// explicit `-c` path was given and is missing.
    pub fn load(explicit_path: Option<&Path>) -> Result<Config, ConfigError> {
        if let Some(path) = explicit_path {
            if !path.exists() {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            return Self::from_file(path);
        }

        for candidate in [Path::new("./ransom.conf"), Path::new("/etc/ransom-bpf/ransom.conf")] {
            if candidate.exists() {
                return Self::from_file(candidate);
            }
        }

        Ok(Config::default())
    }

    fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Config::default();
        config.apply_text(&text);
        config.source = ConfigSource::File(path.to_path_buf());
        Ok(config)
    }

    fn apply_text(&mut self, text: &str) {
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            self.apply_kv(key.trim(), value.trim());
        }
    }

    fn apply_kv(&mut self, key: &str, value: &str) {
        match key {
            "WINDOW_SEC" => {
                if let Ok(v) = value.parse() {
                    self.window_sec = v;
                }
            }
            "RISK_THRESHOLD" => {
                if let Ok(v) = value.parse() {
                    self.risk_threshold = v;
                }
            }
            "SCORE_WRITE" => {
                if let Ok(v) = value.parse() {
                    self.score_write = v;
                }
            }
            "SCORE_RENAME" => {
                if let Ok(v) = value.parse() {
                    self.score_rename = v;
                }
            }
            "SCORE_UNLINK" => {
                if let Ok(v) = value.parse() {
                    self.score_unlink = v;
                }
            }
            "SCORE_HONEYPOT" => {
                if let Ok(v) = value.parse() {
                    self.score_honeypot = v;
                }
            }
            "SCORE_EXT_PENALTY" => {
                if let Ok(v) = value.parse() {
                    self.score_ext_penalty = v;
                }
            }
            "ACTIVE_BLOCKING" => {
                self.active_blocking = matches!(value.to_ascii_lowercase().as_str(), "true" | "1");
            }
            "SERVICE_LOG" | "LOG_FILE" => self.service_log = PathBuf::from(value),
            "ALERT_LOG" => self.alert_log = PathBuf::from(value),
            "AUDIT_LOG" => self.audit_log = PathBuf::from(value),
            "WHITELIST" => self.whitelist_csv = value.chars().take(MAX_WHITELIST_LEN).collect(),
            "HONEYPOT_FILE" => self.honeypot_file = value.to_string(),
            _ => {}
        }
    }

    /// Truncated whitelist description used by the startup summary, matching
    /// the original tool's `"{47 chars}... (Total {n} chars)"` behavior.
    pub fn whitelist_summary(&self) -> String {
        let len = self.whitelist_csv.chars().count();
        if len <= 50 {
            self.whitelist_csv.clone()
        } else {
            let truncated: String = self.whitelist_csv.chars().take(47).collect();
            format!("{truncated}... (Total {len} chars)")
        }
    }
}
