use std::fmt;

use thiserror::Error;

/// Error reported by a platform collaborator (audio subsystem, interruption
/// source, continuity keeper). The core maps it onto a [`SessionError`]
/// according to the step that failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct PlatformError(pub String);

impl PlatformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Teardown step that reported a failure during `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    Continuity,
    Interruptions,
    Route,
}

impl fmt::Display for TeardownStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Continuity => "continuity",
            Self::Interruptions => "interruptions",
            Self::Route => "route",
        };
        f.write_str(name)
    }
}

/// One failed teardown step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownFailure {
    pub step: TeardownStep,
    pub message: String,
}

impl fmt::Display for TeardownFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.message)
    }
}

/// Errors surfaced across the session boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("device enumeration failed: {0}")]
    DeviceEnumerationFailed(String),

    #[error("category selection failed: {0}")]
    CategorySelectionFailed(String),

    #[error("sample rate rejected: {0}")]
    SampleRateRejected(String),

    #[error("activation failed: {0}")]
    ActivationFailed(String),

    #[error("input routing failed: {0}")]
    InputRoutingFailed(String),

    #[error("interruption subscription failed: {0}")]
    InterruptionSubscriptionFailed(String),

    #[error("continuity keeper failed: {0}")]
    ContinuityFailed(String),

    #[error("session busy: {0}")]
    SessionBusy(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("cancelled: superseded by stop")]
    Cancelled,

    #[error("teardown failed: {}", join_failures(.0))]
    TeardownAggregateFailure(Vec<TeardownFailure>),
}

fn join_failures(failures: &[TeardownFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
