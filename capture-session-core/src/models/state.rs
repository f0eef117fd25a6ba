use super::error::SessionError;

/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle → configuring → recording → paused
///            ↓    ↑                   │
///         failed  └───── resume ──────┘
///
/// recording / paused → stopping → idle
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Configuring,
    Recording,
    Paused,
    Stopping,
    Failed(SessionError),
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// States from which a fresh `start` is accepted.
    pub fn accepts_start(&self) -> bool {
        matches!(self, Self::Idle | Self::Failed(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Configuring => "configuring",
            Self::Recording => "recording",
            Self::Paused => "paused",
            Self::Stopping => "stopping",
            Self::Failed(_) => "failed",
        }
    }
}
