//! Command-line surface and startup banner, mirroring the original tool's
//! `getopt_long` option set with `clap`'s derive API. Unlike the original
//! (which folded "unknown argument" into the same exit-0 path as
//! `--help`/`--version`), an unrecognized flag here exits non-zero, which is
//! `clap`'s native behavior.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{Config, ConfigSource};

#[derive(Parser, Debug)]
#[command(
    name = "ransomwatchd",
    version,
    about = "Host-based ransomware behavior detection and response agent"
)]
pub struct Cli {
    /// Path to a config file (overrides the default search order).
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the service log path (legacy alias for SERVICE_LOG).
    #[arg(short = 'l', long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Legacy write-burst threshold override; retained for command-line
    /// compatibility only, has no effect on current scoring.
    #[arg(long = "write-limit", value_name = "N")]
    pub write_limit: Option<u32>,

    /// Enable DEBUG-level service log output.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Cli {
    /// Layers CLI overrides on top of an already-loaded [`Config`].
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(log_file) = &self.log_file {
            config.service_log = log_file.clone();
        }
        if let Some(limit) = self.write_limit {
            config.write_threshold = Some(limit);
        }
        if self.verbose {
            config.verbose = true;
        }
    }
}

/// Prints the startup banner and active-configuration summary to stdout,
/// in the spirit of the original's `print_startup_summary`.
pub fn print_startup_summary(config: &Config, pid: u32) {
    println!("ransomwatchd {} starting (pid {pid})", env!("CARGO_PKG_VERSION"));
    match &config.source {
        ConfigSource::File(path) => println!("config: {}", path.display()),
        ConfigSource::Defaults => println!("config: built-in defaults"),
    }
    println!("  service log : {}", config.service_log.display());
    println!("  audit log   : {}", config.audit_log.display());
    println!("  alert log   : {}", config.alert_log.display());
    println!("  verbose     : {}", config.verbose);
    println!("  active mode : {}", if config.active_blocking { "BLOCKING (IPS)" } else { "monitor-only" });
    println!("  whitelist   : {}", config.whitelist_summary());
    println!(
        "  weights     : write={} rename={} unlink={} honeypot={} ext_penalty={} threshold={}",
        config.score_write,
        config.score_rename,
        config.score_unlink,
        config.score_honeypot,
        config.score_ext_penalty,
        config.risk_threshold,
    );
}
