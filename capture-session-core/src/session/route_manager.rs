use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;

use crate::models::config::CaptureConfiguration;
use crate::models::device::InputDevice;
use crate::models::error::{PlatformError, SessionError};
use crate::models::route::{ActiveRoute, AudioCategory, RouteId};
use crate::traits::audio_platform::AudioPlatform;

static NEXT_ROUTE_ID: AtomicU64 = AtomicU64::new(1);

/// Polled after every platform call; `true` aborts the pipeline.
pub type CancelCheck<'a> = &'a dyn Fn() -> bool;

/// Route extras that must be undone on rollback or release.
#[derive(Default)]
struct Extras {
    speakerphone: bool,
    bluetooth_sco: bool,
}

/// Applies a configuration to the platform audio subsystem and owns the
/// single active route.
///
/// Pipeline order:
/// ```text
/// category+mode → sample rate → [no-alert preference] → activate
///     → channels → preferred input → [speakerphone] → [bluetooth sco]
/// ```
/// Channel and input preferences are only accepted on an active session,
/// so activation comes first. Any failure or cancellation after activation
/// undoes the extras and deactivates again before returning.
pub struct RouteManager {
    platform: Arc<dyn AudioPlatform>,
    applying: AtomicBool,
    current: Mutex<Option<ActiveRoute>>,
}

impl RouteManager {
    pub fn new(platform: Arc<dyn AudioPlatform>) -> Self {
        Self {
            platform,
            applying: AtomicBool::new(false),
            current: Mutex::new(None),
        }
    }

    /// Snapshot of the route currently held, if any.
    pub fn current_route(&self) -> Option<ActiveRoute> {
        self.current.lock().clone()
    }

    /// Run the full pipeline and record the resulting route.
    ///
    /// Rejected with `SessionBusy` while another application is in flight
    /// or a route is still held. Returns `Cancelled` as soon as `cancelled`
    /// reports true; nothing after that point reaches the platform except
    /// the rollback.
    pub fn apply_configuration(
        &self,
        config: &CaptureConfiguration,
        device: Option<&InputDevice>,
        cancelled: CancelCheck<'_>,
    ) -> Result<ActiveRoute, SessionError> {
        if self
            .applying
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SessionError::SessionBusy(
                "route application already in progress".into(),
            ));
        }

        let result = if self.current.lock().is_some() {
            Err(SessionError::SessionBusy("a route is already active".into()))
        } else if config.manage_audio_session() {
            self.run_pipeline(config, device, cancelled)
        } else {
            Ok(self.unmanaged_route(config, device))
        };

        if let Ok(ref route) = result {
            *self.current.lock() = Some(route.clone());
        }
        self.applying.store(false, Ordering::SeqCst);
        result
    }

    /// Deactivate the route with `id`. Returns `false` when `id` is not the
    /// current route (already released or superseded).
    ///
    /// Every release step runs; the first failure is returned.
    pub fn release(&self, id: RouteId) -> Result<bool, PlatformError> {
        let route = {
            let mut current = self.current.lock();
            if current.as_ref().map(|r| r.id) != Some(id) {
                return Ok(false);
            }
            current.take()
        };

        let Some(route) = route else {
            return Ok(false);
        };
        if route.managed {
            self.deactivate(&Extras {
                speakerphone: route.speakerphone,
                bluetooth_sco: route.bluetooth_sco,
            })?;
        }
        log::info!("Route {} released", route.id.0);
        Ok(true)
    }

    fn run_pipeline(
        &self,
        config: &CaptureConfiguration,
        device: Option<&InputDevice>,
        cancelled: CancelCheck<'_>,
    ) -> Result<ActiveRoute, SessionError> {
        let category = category_for(config);
        let mode = config.audio_mode();
        self.platform
            .set_category(category, mode, config.category_options())
            .map_err(|e| SessionError::CategorySelectionFailed(e.to_string()))?;
        ensure_current(cancelled)?;

        let sample_rate = config.sample_rate().min(self.platform.max_sample_rate());
        self.platform
            .set_preferred_sample_rate(sample_rate)
            .map_err(|e| SessionError::SampleRateRejected(format!("{} Hz: {}", sample_rate, e)))?;
        ensure_current(cancelled)?;

        if config.prefers_no_system_alert_interruptions()
            && self.platform.supports_no_interruption_preference()
        {
            self.platform
                .set_prefers_no_interruptions_from_system_alerts(true)
                .map_err(|e| {
                    SessionError::CategorySelectionFailed(format!(
                        "no-interruption preference: {}",
                        e
                    ))
                })?;
            ensure_current(cancelled)?;
        }

        self.platform
            .set_active(true)
            .map_err(|e| SessionError::ActivationFailed(e.to_string()))?;

        let mut extras = Extras::default();
        match self.configure_active(config, device, cancelled, &mut extras) {
            Ok(channels) => Ok(ActiveRoute {
                id: RouteId(NEXT_ROUTE_ID.fetch_add(1, Ordering::Relaxed)),
                device: device.cloned(),
                category,
                mode,
                sample_rate,
                channels,
                active: true,
                managed: true,
                speakerphone: extras.speakerphone,
                bluetooth_sco: extras.bluetooth_sco,
                activated_at: Utc::now(),
            }),
            Err(err) => {
                if let Err(e) = self.deactivate(&extras) {
                    log::error!("Failed to deactivate after route failure: {}", e);
                }
                Err(err)
            }
        }
    }

    /// Steps that need an active session. Returns the applied channel count;
    /// `extras` records what has to be undone if a later step fails.
    fn configure_active(
        &self,
        config: &CaptureConfiguration,
        device: Option<&InputDevice>,
        cancelled: CancelCheck<'_>,
        extras: &mut Extras,
    ) -> Result<u16, SessionError> {
        ensure_current(cancelled)?;

        let preferred = config.channels().min(self.platform.max_input_channels());
        let channels = if preferred > 0 {
            self.platform
                .set_preferred_input_channels(preferred)
                .map_err(|e| {
                    SessionError::ActivationFailed(format!("input channels {}: {}", preferred, e))
                })?;
            ensure_current(cancelled)?;
            preferred
        } else {
            log::debug!("Route reports no input channels, keeping platform channel preference");
            config.channels()
        };

        if let Some(device) = device {
            self.platform
                .set_preferred_input(device)
                .map_err(|e| SessionError::InputRoutingFailed(format!("{}: {}", device.id, e)))?;
            ensure_current(cancelled)?;
        }

        if config.speakerphone() {
            self.platform
                .set_speakerphone(true)
                .map_err(|e| SessionError::ActivationFailed(format!("speakerphone: {}", e)))?;
            extras.speakerphone = true;
            ensure_current(cancelled)?;
        }

        if config.manage_bluetooth() {
            extras.bluetooth_sco = self
                .platform
                .start_bluetooth_sco()
                .map_err(|e| SessionError::InputRoutingFailed(format!("bluetooth sco: {}", e)))?;
            if extras.bluetooth_sco {
                log::debug!("Bluetooth SCO link up");
            }
            ensure_current(cancelled)?;
        }

        Ok(channels)
    }

    /// Undo the extras in reverse order, then deactivate. All steps run.
    fn deactivate(&self, extras: &Extras) -> Result<(), PlatformError> {
        let mut result = Ok(());
        if extras.bluetooth_sco {
            result = result.and(self.platform.stop_bluetooth_sco());
        }
        if extras.speakerphone {
            result = result.and(self.platform.set_speakerphone(false));
        }
        result.and(self.platform.set_active(false))
    }

    /// The host manages the audio session itself; describe what is there
    /// without touching it.
    fn unmanaged_route(
        &self,
        config: &CaptureConfiguration,
        device: Option<&InputDevice>,
    ) -> ActiveRoute {
        if let Some(device) = device {
            log::warn!(
                "Audio session is host-managed, input {} is not applied",
                device.id
            );
        }
        ActiveRoute {
            id: RouteId(NEXT_ROUTE_ID.fetch_add(1, Ordering::Relaxed)),
            device: None,
            category: category_for(config),
            mode: config.audio_mode(),
            sample_rate: self.platform.current_sample_rate(),
            channels: config.channels(),
            active: true,
            managed: false,
            speakerphone: false,
            bluetooth_sco: false,
            activated_at: Utc::now(),
        }
    }
}

fn category_for(config: &CaptureConfiguration) -> AudioCategory {
    if config.background_recording() {
        AudioCategory::Record
    } else {
        AudioCategory::PlayAndRecord
    }
}

fn ensure_current(cancelled: CancelCheck<'_>) -> Result<(), SessionError> {
    if cancelled() {
        log::info!("Route application superseded, unwinding");
        return Err(SessionError::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::CaptureRequest;
    use crate::models::route::AudioMode;
    use crate::test_support::FakePlatform;

    fn config(build: impl FnOnce(&mut CaptureRequest)) -> CaptureConfiguration {
        let mut request = CaptureRequest {
            output: Some("out.m4a".into()),
            ..Default::default()
        };
        build(&mut request);
        CaptureConfiguration::from_request(request).unwrap()
    }

    fn never() -> bool {
        false
    }

    fn manager(platform: FakePlatform) -> (Arc<FakePlatform>, RouteManager) {
        let platform = Arc::new(platform);
        (platform.clone(), RouteManager::new(platform))
    }

    #[test]
    fn pipeline_runs_in_order() {
        let (platform, routes) = manager(FakePlatform::new());
        let mic = InputDevice::new("usb", "USB Mic", 2);

        let route = routes
            .apply_configuration(&config(|r| r.sample_rate = Some(96_000)), Some(&mic), &never)
            .unwrap();

        assert_eq!(
            platform.calls(),
            vec![
                "set_category(PlayAndRecord)",
                "set_preferred_sample_rate(48000)",
                "set_active(true)",
                "set_preferred_input_channels(2)",
                "set_preferred_input(usb)",
            ]
        );
        assert_eq!(route.sample_rate, 48_000);
        assert_eq!(route.device, Some(mic));
        assert!(route.active);
        assert_eq!(routes.current_route(), Some(route));
    }

    #[test]
    fn background_recording_selects_capture_only() {
        let (_, routes) = manager(FakePlatform::new());

        let route = routes
            .apply_configuration(&config(|r| r.enable_background_recording = true), None, &never)
            .unwrap();

        assert_eq!(route.category, AudioCategory::Record);
    }

    #[test]
    fn channels_limited_by_route() {
        let (platform, routes) = manager(FakePlatform::new().with_max_input_channels(1));

        let route = routes
            .apply_configuration(&config(|r| r.num_channels = Some(2)), None, &never)
            .unwrap();

        assert_eq!(route.channels, 1);
        assert!(platform
            .calls()
            .contains(&"set_preferred_input_channels(1)".to_string()));
    }

    #[test]
    fn channel_preference_skipped_without_input_capability() {
        let (platform, routes) = manager(FakePlatform::new().with_max_input_channels(0));

        let route = routes
            .apply_configuration(&config(|r| r.num_channels = Some(5)), None, &never)
            .unwrap();

        assert_eq!(route.channels, 2);
        assert!(!platform
            .calls()
            .iter()
            .any(|c| c.starts_with("set_preferred_input_channels")));
    }

    #[test]
    fn failures_before_activation_never_activate() {
        for (op, expected) in [
            ("set_category", "category"),
            ("set_preferred_sample_rate", "sample rate"),
        ] {
            let (platform, routes) = manager(FakePlatform::new());
            platform.fail(op);

            let err = routes.apply_configuration(&config(|_| {}), None, &never).unwrap_err();
            assert!(err.to_string().contains(expected), "{}", err);
            assert!(!platform.calls().contains(&"set_active(true)".to_string()));
            assert!(routes.current_route().is_none());
        }
    }

    #[test]
    fn activation_failure() {
        let (platform, routes) = manager(FakePlatform::new());
        platform.fail("set_active");

        let err = routes.apply_configuration(&config(|_| {}), None, &never).unwrap_err();
        assert!(matches!(err, SessionError::ActivationFailed(_)));
        assert!(!platform.is_active());
        assert!(routes.current_route().is_none());
    }

    #[test]
    fn input_routing_failure_rolls_back_activation() {
        let (platform, routes) = manager(FakePlatform::new());
        platform.fail("set_preferred_input");
        let mic = InputDevice::new("usb", "USB Mic", 1);

        let err = routes
            .apply_configuration(&config(|_| {}), Some(&mic), &never)
            .unwrap_err();

        assert!(matches!(err, SessionError::InputRoutingFailed(_)));
        assert!(!platform.is_active());
        assert_eq!(platform.calls().last().map(String::as_str), Some("set_active(false)"));
        assert!(routes.current_route().is_none());
    }

    #[test]
    fn single_route_at_a_time() {
        let (_, routes) = manager(FakePlatform::new());
        let first = routes.apply_configuration(&config(|_| {}), None, &never).unwrap();

        let err = routes.apply_configuration(&config(|_| {}), None, &never).unwrap_err();
        assert!(matches!(err, SessionError::SessionBusy(_)));

        assert!(routes.release(first.id).unwrap());
        assert!(routes.apply_configuration(&config(|_| {}), None, &never).is_ok());
    }

    #[test]
    fn stale_release_is_ignored() {
        let (platform, routes) = manager(FakePlatform::new());
        let first = routes.apply_configuration(&config(|_| {}), None, &never).unwrap();
        routes.release(first.id).unwrap();
        let second = routes.apply_configuration(&config(|_| {}), None, &never).unwrap();

        assert!(!routes.release(first.id).unwrap());
        assert!(platform.is_active());
        assert_eq!(routes.current_route().map(|r| r.id), Some(second.id));
    }

    #[test]
    fn unmanaged_session_is_left_alone() {
        let (platform, routes) = manager(FakePlatform::new());

        let route = routes
            .apply_configuration(&config(|r| r.manage_audio_session = Some(false)), None, &never)
            .unwrap();

        assert!(!route.managed);
        assert!(platform.calls().is_empty());
        assert!(routes.release(route.id).unwrap());
        assert!(platform.calls().is_empty());
    }

    #[test]
    fn unmanaged_route_reports_hardware_rate() {
        let (_, routes) = manager(FakePlatform::new());

        let route = routes
            .apply_configuration(
                &config(|r| {
                    r.manage_audio_session = Some(false);
                    r.sample_rate = Some(16_000);
                }),
                None,
                &never,
            )
            .unwrap();

        assert_eq!(route.sample_rate, 44_100);
    }

    #[test]
    fn cancellation_after_activation_skips_input_steps() {
        let (platform, routes) = manager(FakePlatform::new());
        let mic = InputDevice::new("usb", "USB Mic", 2);
        let cancel_once_active = {
            let platform = Arc::clone(&platform);
            move || platform.is_active()
        };

        let err = routes
            .apply_configuration(&config(|_| {}), Some(&mic), &cancel_once_active)
            .unwrap_err();

        assert_eq!(err, SessionError::Cancelled);
        assert_eq!(
            platform.calls(),
            vec![
                "set_category(PlayAndRecord)",
                "set_preferred_sample_rate(44100)",
                "set_active(true)",
                "set_active(false)",
            ]
        );
        assert!(routes.current_route().is_none());
    }

    #[test]
    fn cancellation_before_activation_never_activates() {
        let (platform, routes) = manager(FakePlatform::new());

        let err = routes
            .apply_configuration(&config(|_| {}), None, &|| true)
            .unwrap_err();

        assert_eq!(err, SessionError::Cancelled);
        assert_eq!(platform.calls(), vec!["set_category(PlayAndRecord)"]);
    }

    #[test]
    fn communication_settings_applied_and_released() {
        let (platform, routes) = manager(FakePlatform::new().with_bluetooth_headset());

        let route = routes
            .apply_configuration(
                &config(|r| {
                    r.audio_manager_mode = AudioMode::InCommunication;
                    r.speakerphone = true;
                }),
                None,
                &never,
            )
            .unwrap();

        assert_eq!(route.mode, AudioMode::InCommunication);
        assert!(route.speakerphone);
        assert!(route.bluetooth_sco);
        assert_eq!(platform.calls()[0], "set_category(PlayAndRecord, InCommunication)");

        assert!(routes.release(route.id).unwrap());
        let calls = platform.calls();
        assert_eq!(
            calls[calls.len() - 3..].to_vec(),
            vec!["stop_bluetooth_sco()", "set_speakerphone(false)", "set_active(false)"]
        );
    }

    #[test]
    fn bluetooth_left_alone_when_unmanaged() {
        let (platform, routes) = manager(FakePlatform::new().with_bluetooth_headset());

        let route = routes
            .apply_configuration(&config(|r| r.manage_bluetooth = Some(false)), None, &never)
            .unwrap();

        assert!(!route.bluetooth_sco);
        assert!(!platform.calls().iter().any(|c| c.contains("bluetooth")));
    }

    #[test]
    fn sco_failure_undoes_speakerphone() {
        let (platform, routes) = manager(FakePlatform::new().with_bluetooth_headset());
        platform.fail("start_bluetooth_sco");

        let err = routes
            .apply_configuration(&config(|r| r.speakerphone = true), None, &never)
            .unwrap_err();

        assert!(matches!(err, SessionError::InputRoutingFailed(_)));
        let calls = platform.calls();
        assert_eq!(
            calls[calls.len() - 2..].to_vec(),
            vec!["set_speakerphone(false)", "set_active(false)"]
        );
        assert!(!platform.is_active());
    }
}
