use crate::models::error::SessionError;
use crate::models::state::SessionState;

/// Event delegate for the media pipeline.
///
/// Called from the caller's thread for explicit actions and from the
/// interruption dispatcher thread for interruptions. Implementations must
/// not call back into the session synchronously from `on_state_changed`
/// while holding their own locks.
pub trait SessionDelegate: Send + Sync {
    /// Called after every state transition.
    fn on_state_changed(&self, state: &SessionState);

    /// Called when a call fails or teardown reports failures.
    fn on_error(&self, error: &SessionError);
}
