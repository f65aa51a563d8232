//! Audio Engine Module
//!
//! This module provides real-time audio mixing and playback capabilities.
//! It is organized into sub-modules, each with a specific responsibility:
//!
//! - [`audio_stream`]: CPAL audio stream management and real-time callback
//! - [`constants`]: Configuration constants and limits
//! - [`errors`]: Audio-specific error types
//! - [`mixer`]: Real-time mixing engine
//! - [`sample_loader`]: Audio file loading and decoding
//!
//! The main [`PadController`] struct orchestrates these components to
//! provide the high-level pad interface front ends talk to: trigger pads,
//! change the global volume and replay mode, and observe status text and
//! voice-completion events.

use std::time::Instant;

use crate::audio_engine::audio_stream::{AudioStreamHandle, create_audio_stream, start_stream};
use crate::audio_engine::constants::{NUM_PADS, PULSE_DURATION, VOLUME_MAX, VOLUME_MIN};
use crate::audio_engine::errors::EngineError;
use crate::audio_engine::sample_loader::decode_audio_file_to_sample_buffer;
use crate::messages::{ControlMessage, EngineMessage};
use crate::pads::{PadId, PadKit};
use crate::settings::{NO_OVERLAP_KEY, PlaybackSettings, SettingsStore, VOLUME_KEY};

mod audio_stream;
pub mod constants;
pub mod errors;
mod mixer;
mod sample_loader;

/// High-level pad controller.
///
/// Owns the playback settings, the settings store, and (once initialized)
/// the real-time audio stream. Settings are read from the store at
/// construction time, before any audio resources exist, so a persisted
/// volume applies to the very first trigger.
///
/// Every user-facing operation degrades instead of failing: unknown pad
/// names, samples that failed to load, and dispatch problems are logged and
/// otherwise ignored.
pub struct PadController {
    stream_handle: Option<AudioStreamHandle>,
    settings: PlaybackSettings,
    store: Box<dyn SettingsStore>,
    loaded: [bool; NUM_PADS],
    last_status: Option<String>,
    last_trigger: [Option<Instant>; NUM_PADS],
}

impl PadController {
    /// Creates a controller over the given settings store.
    ///
    /// Persisted settings are applied immediately; the audio engine is not
    /// started until [`initialize`](Self::initialize).
    pub fn new(store: Box<dyn SettingsStore>) -> Self {
        let settings = PlaybackSettings::load(store.as_ref());

        Self {
            stream_handle: None,
            settings,
            store,
            loaded: [false; NUM_PADS],
            last_status: None,
            last_trigger: [None; NUM_PADS],
        }
    }

    /// Starts the audio stream and preloads the kit samples.
    ///
    /// The persisted volume and replay mode are pushed to the real-time
    /// thread before any sample can play. A pad whose file fails to decode
    /// is logged and skipped; the remaining pads still load.
    pub fn initialize(&mut self, kit: &PadKit) -> Result<(), EngineError> {
        if self.stream_handle.is_some() {
            return Err(EngineError::AlreadyRunning);
        }

        let mut handle = create_audio_stream()?;
        start_stream(&handle.stream)?;

        let _ = handle
            .producer
            .push(ControlMessage::SetVolume(self.settings.volume));
        let _ = handle
            .producer
            .push(ControlMessage::SetNoOverlap(self.settings.no_overlap));

        for (pad, path) in kit.entries() {
            match decode_audio_file_to_sample_buffer(
                path,
                handle.output_channels,
                handle.output_sample_rate,
            ) {
                Ok(sample) => {
                    let pushed = handle.producer.push(ControlMessage::LoadSample {
                        id: pad.index(),
                        sample,
                    });
                    if pushed.is_err() {
                        log::error!("failed to publish sample for pad {pad}: channel full");
                        continue;
                    }
                    self.loaded[pad.index()] = true;
                    log::info!("loaded {pad} from {}", path.display());
                }
                Err(err) => {
                    log::warn!("failed to load {}: {err}", path.display());
                }
            }
        }

        self.stream_handle = Some(handle);
        Ok(())
    }

    /// Triggers a pad by identifier string.
    ///
    /// Unknown identifiers are a logged no-op.
    pub fn play(&mut self, name: &str) {
        match PadId::from_name(name) {
            Some(pad) => self.trigger(pad),
            None => log::warn!("unknown pad: {name}"),
        }
    }

    /// Triggers a pad.
    ///
    /// Records the trigger instant for the visual pulse, dispatches the
    /// play request, and announces. Dispatch failures (engine not running,
    /// channel full) are logged, never surfaced.
    pub fn trigger(&mut self, pad: PadId) {
        self.last_trigger[pad.index()] = Some(Instant::now());

        if let Err(err) = self.send(ControlMessage::PlaySample { id: pad.index() }) {
            log::error!("failed to trigger {pad}: {err}");
        }

        let status = if self.settings.no_overlap {
            format!("Reproduciendo {pad}")
        } else {
            format!("Capa añadida de {pad}")
        };
        self.announce(status);
    }

    /// Sets the global volume, pushing it to the engine and persisting it.
    ///
    /// Finite input is clamped to [0.0, 1.0]; non-finite input is rejected.
    pub fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            log::warn!("ignoring non-finite volume");
            return;
        }

        let volume = volume.clamp(VOLUME_MIN, VOLUME_MAX);
        self.settings.volume = volume;

        if let Err(err) = self.send(ControlMessage::SetVolume(volume)) {
            log::debug!("volume not delivered to engine: {err}");
        }

        self.persist(VOLUME_KEY, &volume.to_string());
        self.announce(format!("Volumen {}%", (volume * 100.0).round() as u32));
    }

    /// Sets the replay mode, pushing it to the engine and persisting it.
    pub fn set_no_overlap(&mut self, enabled: bool) {
        self.settings.no_overlap = enabled;

        if let Err(err) = self.send(ControlMessage::SetNoOverlap(enabled)) {
            log::debug!("replay mode not delivered to engine: {err}");
        }

        self.persist(NO_OVERLAP_KEY, if enabled { "1" } else { "0" });
        self.announce(if enabled {
            "Solapamiento desactivado".to_string()
        } else {
            "Solapamiento permitido".to_string()
        });
    }

    /// Current playback settings.
    pub fn settings(&self) -> PlaybackSettings {
        self.settings
    }

    /// The last announced status line, if any.
    pub fn last_status(&self) -> Option<&str> {
        self.last_status.as_deref()
    }

    /// Whether the pad was triggered within the visual pulse window.
    pub fn is_pulsing(&self, pad: PadId) -> bool {
        self.last_trigger[pad.index()]
            .is_some_and(|instant| instant.elapsed() < PULSE_DURATION)
    }

    /// Whether the pad's sample was successfully loaded.
    pub fn pad_loaded(&self, pad: PadId) -> bool {
        self.loaded[pad.index()]
    }

    /// Whether the audio engine is running.
    pub fn is_running(&self) -> bool {
        self.stream_handle.is_some()
    }

    /// The settings store backing this controller.
    pub fn store(&self) -> &dyn SettingsStore {
        self.store.as_ref()
    }

    /// Receives one pending message from the audio thread, if any.
    pub fn poll_event(&mut self) -> Option<EngineMessage> {
        let handle = self.stream_handle.as_mut()?;
        handle.consumer.pop().ok()
    }

    /// Send a ping message to the audio thread.
    pub fn ping(&mut self) -> Result<(), EngineError> {
        self.send(ControlMessage::Ping())
    }

    /// Stops all voices and shuts the engine down.
    pub fn shut_down(&mut self) {
        if let Some(mut handle) = self.stream_handle.take() {
            let _ = handle.producer.push(ControlMessage::StopAll());
        }
        self.loaded = [false; NUM_PADS];
    }

    fn send(&mut self, message: ControlMessage) -> Result<(), EngineError> {
        let handle = self.stream_handle.as_mut().ok_or(EngineError::NotRunning)?;
        handle
            .producer
            .push(message)
            .map_err(|_| EngineError::ControlChannelFull)
    }

    fn persist(&mut self, key: &str, value: &str) {
        if let Err(err) = self.store.set(key, value) {
            log::warn!("failed to persist {key}: {err}");
        }
    }

    fn announce(&mut self, status: String) {
        log::debug!("{status}");
        self.last_status = Some(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemoryStore;

    fn controller() -> PadController {
        PadController::new(Box::new(MemoryStore::new()))
    }

    fn controller_over(store: MemoryStore) -> PadController {
        PadController::new(Box::new(store))
    }

    #[test]
    fn test_defaults_without_persisted_state() {
        let ctl = controller();
        let settings = ctl.settings();

        assert!((settings.volume - 0.9).abs() < f32::EPSILON);
        assert!(settings.no_overlap);
        assert_eq!(ctl.last_status(), None);
        assert!(!ctl.is_running());
    }

    #[test]
    fn test_persisted_settings_applied_at_construction() {
        let mut store = MemoryStore::new();
        store.set(VOLUME_KEY, "0.5").unwrap();
        store.set(NO_OVERLAP_KEY, "0").unwrap();

        let ctl = controller_over(store);
        assert!((ctl.settings().volume - 0.5).abs() < f32::EPSILON);
        assert!(!ctl.settings().no_overlap);
    }

    #[test]
    fn test_play_announces_and_pulses() {
        let mut ctl = controller();

        ctl.play("kick");

        assert_eq!(ctl.last_status(), Some("Reproduciendo kick"));
        assert!(ctl.is_pulsing(PadId::Kick));
        assert!(!ctl.is_pulsing(PadId::Snare));
    }

    #[test]
    fn test_play_unknown_pad_is_noop() {
        let mut ctl = controller();

        ctl.play("cowbell");

        assert_eq!(ctl.last_status(), None);
        assert!(!ctl.is_pulsing(PadId::Kick));
    }

    #[test]
    fn test_overlap_mode_announcement() {
        let mut ctl = controller();
        ctl.set_no_overlap(false);

        ctl.play("hihat");

        assert_eq!(ctl.last_status(), Some("Capa añadida de hihat"));
    }

    #[test]
    fn test_set_volume_persists_and_announces() {
        let mut ctl = controller();

        ctl.set_volume(0.5);

        assert!((ctl.settings().volume - 0.5).abs() < f32::EPSILON);
        assert_eq!(ctl.store().get(VOLUME_KEY).as_deref(), Some("0.5"));
        assert_eq!(ctl.last_status(), Some("Volumen 50%"));
    }

    #[test]
    fn test_set_volume_clamps() {
        let mut ctl = controller();

        ctl.set_volume(1.8);
        assert!((ctl.settings().volume - 1.0).abs() < f32::EPSILON);
        assert_eq!(ctl.store().get(VOLUME_KEY).as_deref(), Some("1"));

        ctl.set_volume(-0.3);
        assert!((ctl.settings().volume - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_set_volume_rejects_non_finite() {
        let mut ctl = controller();

        ctl.set_volume(f32::NAN);

        assert!((ctl.settings().volume - 0.9).abs() < f32::EPSILON);
        assert_eq!(ctl.store().get(VOLUME_KEY), None);
        assert_eq!(ctl.last_status(), None);
    }

    #[test]
    fn test_set_no_overlap_persists_and_announces() {
        let mut ctl = controller();

        ctl.set_no_overlap(false);
        assert_eq!(ctl.store().get(NO_OVERLAP_KEY).as_deref(), Some("0"));
        assert_eq!(ctl.last_status(), Some("Solapamiento permitido"));

        ctl.set_no_overlap(true);
        assert_eq!(ctl.store().get(NO_OVERLAP_KEY).as_deref(), Some("1"));
        assert_eq!(ctl.last_status(), Some("Solapamiento desactivado"));
    }

    #[test]
    fn test_settings_round_trip_through_store() {
        let mut store = MemoryStore::new();
        store.set(VOLUME_KEY, "0.35").unwrap();

        let mut ctl = controller_over(store);
        ctl.set_no_overlap(false);

        // A second controller over an equivalent store sees both values.
        let mut replay = MemoryStore::new();
        replay
            .set(VOLUME_KEY, &ctl.settings().volume.to_string())
            .unwrap();
        replay.set(NO_OVERLAP_KEY, "0").unwrap();

        let ctl2 = controller_over(replay);
        assert!((ctl2.settings().volume - 0.35).abs() < f32::EPSILON);
        assert!(!ctl2.settings().no_overlap);
    }

    #[test]
    fn test_trigger_without_engine_does_not_panic() {
        let mut ctl = controller();

        // Engine never started; triggers degrade to announcements only.
        ctl.trigger(PadId::Snare);
        assert_eq!(ctl.last_status(), Some("Reproduciendo snare"));
        assert!(!ctl.pad_loaded(PadId::Snare));
    }

    #[test]
    fn test_poll_event_without_engine() {
        let mut ctl = controller();
        assert_eq!(ctl.poll_event(), None);
    }

    #[test]
    fn test_ping_without_engine_errors() {
        let mut ctl = controller();
        assert!(matches!(ctl.ping(), Err(EngineError::NotRunning)));
    }

    #[test]
    fn test_shut_down_idempotent() {
        let mut ctl = controller();
        ctl.shut_down();
        ctl.shut_down();
        assert!(!ctl.is_running());
    }
}
