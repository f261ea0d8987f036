//! Top-level error type for startup failures. Runtime errors inside the
//! ingest loop are never propagated this way — they are absorbed and
//! reflected into the log/alert channels (SPEC_FULL §7).

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to install signal handler: {0}")]
    SignalHandler(#[from] ctrlc::Error),
}
