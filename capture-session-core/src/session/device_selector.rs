use std::sync::Arc;

use crate::models::device::{DeviceId, InputDevice};
use crate::models::error::SessionError;
use crate::traits::audio_platform::AudioPlatform;

/// Resolves a requested input against the inputs the platform exposes right now.
///
/// Nothing is cached: routes change whenever a headset is plugged in or a
/// Bluetooth device connects, so every call enumerates afresh.
pub struct DeviceSelector {
    platform: Arc<dyn AudioPlatform>,
}

impl DeviceSelector {
    pub fn new(platform: Arc<dyn AudioPlatform>) -> Self {
        Self { platform }
    }

    /// Returns the input whose id equals `requested`, or `None` to use the
    /// platform default. A requested device that is not enumerable is not an
    /// error here.
    pub fn resolve_input(
        &self,
        requested: Option<&DeviceId>,
    ) -> Result<Option<InputDevice>, SessionError> {
        let Some(requested) = requested else {
            return Ok(None);
        };

        let inputs = self
            .platform
            .available_inputs()
            .map_err(|e| SessionError::DeviceEnumerationFailed(e.to_string()))?;
        let count = inputs.len();

        let found = inputs.into_iter().find(|input| &input.id == requested);
        if found.is_none() {
            log::warn!(
                "Requested input {} not among {} available inputs, using platform default",
                requested,
                count
            );
        }
        Ok(found)
    }
}
