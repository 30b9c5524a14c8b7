//! Error types used by the ingestion runtime, its workers and collaborators.
//!
//! - [`ConfigError`] startup failures (credentials, region file, settings); always fatal.
//! - [`SubscriptionError`] one region's upstream connection failed to open or dropped.
//! - [`PublishError`] the message bus rejected or failed to carry one record.
//! - [`WorkerError`] outcome of one supervised worker attempt.
//! - [`RuntimeError`] failures of the orchestration runtime itself.
//!
//! Every enum exposes `as_label()`: a short stable snake_case string for logs/metrics.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// # Fatal startup errors.
///
/// Raised while loading credentials, the region list or runtime settings.
/// The process does not proceed past any of these.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required credential was not found in the environment or key file.
    #[error("missing credential: {name}")]
    MissingCredential {
        /// Environment variable or key-file field that was expected.
        name: &'static str,
    },

    /// A file could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A file could not be parsed.
    #[error("cannot parse {path}: {source}")]
    Parse {
        /// Offending path.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A region record is well-formed JSON but semantically invalid.
    #[error("invalid region #{index}: {reason}")]
    InvalidRegion {
        /// Position of the record in the region list (0-based).
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// The region list contains no regions.
    #[error("region list is empty")]
    NoRegions,

    /// A runtime setting is out of range or inconsistent.
    #[error("invalid setting `{name}`: {reason}")]
    InvalidSetting {
        /// Setting name (CLI flag without dashes).
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A publisher backend could not be constructed.
    #[error("publisher backend `{backend}` unavailable: {reason}")]
    Backend {
        /// Backend name.
        backend: &'static str,
        /// Underlying reason.
        reason: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::MissingCredential { .. } => "config_missing_credential",
            ConfigError::Read { .. } => "config_read",
            ConfigError::Parse { .. } => "config_parse",
            ConfigError::InvalidRegion { .. } => "config_invalid_region",
            ConfigError::NoRegions => "config_no_regions",
            ConfigError::InvalidSetting { .. } => "config_invalid_setting",
            ConfigError::Backend { .. } => "config_backend",
        }
    }
}

/// # Upstream subscription failures.
///
/// Always scoped to a single region; never fatal for the process.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum SubscriptionError {
    /// The connection could not be established.
    #[error("connect failed: {0}")]
    Connect(String),

    /// The upstream answered the subscription request with a non-success status.
    #[error("upstream rejected subscription with status {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },

    /// An established connection failed while reading.
    #[error("transport error: {0}")]
    Transport(String),

    /// A stream line was not valid JSON.
    #[error("undecodable stream line: {0}")]
    Decode(String),

    /// The upstream closed the stream.
    #[error("stream closed by upstream")]
    Closed,

    /// The upstream sent a disconnect notice.
    #[error("disconnected by upstream (code {code}): {reason}")]
    Disconnected {
        /// Upstream disconnect code.
        code: i64,
        /// Upstream reason text.
        reason: String,
    },
}

impl SubscriptionError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SubscriptionError::Connect(_) => "subscription_connect",
            SubscriptionError::Rejected { .. } => "subscription_rejected",
            SubscriptionError::Transport(_) => "subscription_transport",
            SubscriptionError::Decode(_) => "subscription_decode",
            SubscriptionError::Closed => "subscription_closed",
            SubscriptionError::Disconnected { .. } => "subscription_disconnected",
        }
    }
}

/// # Message bus failures for one record.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum PublishError {
    /// The record could not be serialized.
    #[error("serialize failed: {0}")]
    Serialize(String),

    /// The bus rejected the record.
    #[error("rejected by bus: {0}")]
    Rejected(String),

    /// The record could not be carried to the bus.
    #[error("transport failed: {0}")]
    Transport(String),
}

impl PublishError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PublishError::Serialize(_) => "publish_serialize",
            PublishError::Rejected(_) => "publish_rejected",
            PublishError::Transport(_) => "publish_transport",
        }
    }
}

/// # Outcome of one supervised worker attempt.
///
/// `Fail` is retryable under `RestartPolicy::OnFailure`; `Fatal` never is.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Attempt failed but may succeed if retried.
    #[error("attempt failed: {0}")]
    Fail(String),

    /// Non-recoverable error (no retry).
    #[error("fatal error (no retry): {0}")]
    Fatal(String),

    /// Attempt was cancelled by shutdown or a restart request.
    #[error("context cancelled")]
    Canceled,
}

impl WorkerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Fail(_) => "worker_failed",
            WorkerError::Fatal(_) => "worker_fatal",
            WorkerError::Canceled => "worker_canceled",
        }
    }

    /// Indicates whether the error is safe to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkerError::Fail(_))
    }
}

impl From<SubscriptionError> for WorkerError {
    fn from(e: SubscriptionError) -> Self {
        WorkerError::Fail(e.to_string())
    }
}

/// # Errors produced by the orchestration runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some regions did not stop in time.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Regions whose workers were still alive.
        stuck: Vec<String>,
    },

    /// OS signal handlers could not be installed.
    #[error("signal handler registration failed: {0}")]
    Signal(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }
}
