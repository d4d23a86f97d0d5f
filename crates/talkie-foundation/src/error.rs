//! Crate-wide error taxonomy.
//!
//! Mirrors the error categories every component is required to surface:
//! configuration, resource, runtime-backend, overflow/underflow, shape
//! mismatch, and user cancellation. Component crates define their own
//! narrower error enum and convert into `TalkieError` at the boundary.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TalkieError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Vad(#[from] VadError),

    #[error(transparent)]
    Stt(#[from] SttError),

    #[error(transparent)]
    Nn(#[from] NnError),

    #[error(transparent)]
    Gec(#[from] GecError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    #[error("health check failed: {component}")]
    HealthCheckFailed { component: String },

    #[error("shutdown requested")]
    ShutdownRequested,

    #[error("fatal: {0}")]
    Fatal(String),
}

impl From<std::io::Error> for TalkieError {
    fn from(e: std::io::Error) -> Self {
        TalkieError::Fatal(e.to_string())
    }
}

/// Configuration error — invalid or missing required option, fatal for
/// the affected component.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("invalid value for `{field}`: {reason}")]
    Validation { field: String, reason: String },

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid environment variable `{0}`")]
    EnvVar(String),
}

/// Resource error — device/model/file not found or permission denied;
/// fatal for the operation that requested it.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("audio device not found: {name:?}")]
    DeviceNotFound { name: Option<String> },

    #[error("audio device disconnected")]
    DeviceDisconnected,

    #[error("unsupported sample format: {format}")]
    FormatNotSupported { format: String },

    #[error("ring buffer overflow, {count} frames dropped")]
    BufferOverflow { count: u64 },

    #[error("no audio data for {duration_ms} ms")]
    NoDataTimeout { duration_ms: u64 },

    #[error(transparent)]
    Cpal(#[from] cpal::DevicesError),

    #[error(transparent)]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error(transparent)]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error(transparent)]
    SupportedStreamConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("fatal audio error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum VadError {
    #[error("vad processing failed: {0}")]
    ProcessingFailed(String),

    #[error("invalid frame size: expected {expected}, got {actual}")]
    InvalidFrameSize { expected: usize, actual: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum SttError {
    #[error("engine not available: {engine}: {reason}")]
    NotAvailable { engine: String, reason: String },

    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("model not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}

/// Runtime backend error — the NN runtime returned a non-OK status.
/// Carries the backend's own message and a symbolic status name so
/// callers can decide whether the failure is retry-safe.
#[derive(Debug, thiserror::Error)]
pub enum NnError {
    #[error("runtime backend error [{status}]: {message}")]
    Backend { status: String, message: String },

    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("model load failed: {0}")]
    LoadFailed(String),

    #[error("device unavailable: {0}, falling back to cpu")]
    DeviceUnavailable(String),
}

impl NnError {
    /// Shape-mismatch and load failures indicate the wrong model was
    /// loaded; never safe to retry. Backend status errors may be.
    pub fn is_retry_safe(&self) -> bool {
        matches!(self, NnError::Backend { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GecError {
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error(transparent)]
    Nn(#[from] NnError),

    #[error("pipeline already in progress for another utterance")]
    AlreadyInProgress,
}

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("config change race, retries exhausted")]
    ConfigRaceExhausted,

    #[error("engine swap requires process restart")]
    RestartRequired,
}

/// The recovery strategy the supervisor applies for a given error.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryStrategy {
    Retry { max_attempts: u32, delay_ms: u64 },
    Restart,
    Ignore,
    Fatal,
}

impl TalkieError {
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            TalkieError::Audio(AudioError::BufferOverflow { .. }) => RecoveryStrategy::Ignore,
            TalkieError::Audio(AudioError::DeviceDisconnected) => RecoveryStrategy::Retry {
                max_attempts: 3,
                delay_ms: 500,
            },
            TalkieError::Nn(e) if e.is_retry_safe() => RecoveryStrategy::Retry {
                max_attempts: 1,
                delay_ms: 100,
            },
            TalkieError::Supervisor(SupervisorError::RestartRequired) => RecoveryStrategy::Restart,
            TalkieError::Gec(_) => RecoveryStrategy::Ignore,
            _ => RecoveryStrategy::Fatal,
        }
    }
}
