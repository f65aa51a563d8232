//! Real-time audio mixer implementation.
//!
//! This module provides the [`RtMixer`] struct which mixes the active pad
//! voices into the output buffer and implements the two replay policies:
//!
//! - no-overlap: retriggering a pad restarts its playing voice at frame 0,
//! - overlap: every trigger claims a fresh voice over the same shared
//!   [`SampleBuffer`](crate::messages::SampleBuffer), so layers play
//!   independently and end independently.
//!
//! Voices read from an `Arc`'d buffer and keep only their own frame
//! position, so the base sample is never mutated by playback.

use crate::audio_engine::constants::{MAX_VOICES, NUM_PADS, VOLUME_MAX, VOLUME_MIN};
use crate::messages::SampleBuffer;
use cpal::Sample;

struct VoiceSlot {
    active: bool,
    pad_id: usize,
    sample: Option<SampleBuffer>,
    frame_pos: usize,
}

impl VoiceSlot {
    fn new() -> Self {
        Self {
            active: false,
            pad_id: 0,
            sample: None,
            frame_pos: 0,
        }
    }

    fn start(&mut self, pad_id: usize, sample: SampleBuffer) {
        self.active = true;
        self.pad_id = pad_id;
        self.sample = Some(sample);
        self.frame_pos = 0;
    }

    fn stop(&mut self) {
        self.active = false;
        self.sample = None;
        self.frame_pos = 0;
    }

    /// Rewind to frame 0 without releasing the slot. Used by no-overlap
    /// retriggers.
    fn restart(&mut self) {
        self.frame_pos = 0;
    }

    fn is_playing_pad(&self, pad_id: usize) -> bool {
        self.active && self.pad_id == pad_id
    }
}

/// Real-time mixer that owns the pad sample bank and the voice pool.
///
/// All operations are lock-free and real-time safe; invalid ids and values
/// are silently ignored so the audio callback can never fail.
pub struct RtMixer {
    /// Number of output channels (1 for mono, 2 for stereo).
    channels: usize,

    /// Global volume multiplier, applied at render time so changes take
    /// effect on already-playing voices.
    volume: f32,

    /// Replay policy: restart-in-place vs. layered voices.
    no_overlap: bool,

    /// Sample storage with one slot per pad.
    sample_bank: [Option<SampleBuffer>; NUM_PADS],

    /// Active voices with MAX_VOICES slots.
    voices: [VoiceSlot; MAX_VOICES],
}

impl RtMixer {
    /// Creates a new RtMixer with the specified number of channels.
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            volume: VOLUME_MAX,
            no_overlap: true,
            sample_bank: std::array::from_fn(|_| None),
            voices: std::array::from_fn(|_| VoiceSlot::new()),
        }
    }

    /// Loads a sample into the bank at the specified pad slot.
    ///
    /// The sample must have the same number of channels as the mixer.
    /// Invalid ids and mismatched channel counts are silently ignored.
    pub fn load_sample(&mut self, id: usize, sample: SampleBuffer) {
        if id >= NUM_PADS {
            return;
        }

        if sample.channels != self.channels {
            return;
        }

        self.sample_bank[id] = Some(sample);
    }

    /// Triggers playback of a loaded pad sample.
    ///
    /// In no-overlap mode a voice already playing this pad is restarted at
    /// frame 0 instead of claiming a second slot. Otherwise a free voice
    /// slot is claimed; if none is available the trigger is silently
    /// dropped.
    pub fn play_pad(&mut self, id: usize) {
        if id >= NUM_PADS {
            return;
        }

        let Some(sample) = self.sample_bank[id].as_ref() else {
            return;
        };
        let sample = sample.clone();

        if self.no_overlap {
            for voice_slot in &mut self.voices {
                if voice_slot.is_playing_pad(id) {
                    voice_slot.restart();
                    return;
                }
            }
        }

        for voice_slot in &mut self.voices {
            if !voice_slot.active {
                voice_slot.start(id, sample);
                return;
            }
        }

        // No free voice slot: drop deterministically.
    }

    /// Stops all active voices.
    pub fn stop_all(&mut self) {
        for voice in &mut self.voices {
            voice.stop();
        }
    }

    /// Sets the global volume multiplier.
    ///
    /// Invalid values (NaN, infinite, or out of range) are silently ignored.
    pub fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() || !(VOLUME_MIN..=VOLUME_MAX).contains(&volume) {
            return;
        }

        self.volume = volume;
    }

    /// Switches between restart-in-place and layered replay.
    pub fn set_no_overlap(&mut self, enabled: bool) {
        self.no_overlap = enabled;
    }

    /// Renders audio frames to the output buffer.
    ///
    /// Mixes all active voices into the interleaved output buffer and
    /// advances them. Voices play one-shot: a voice that consumes its final
    /// frame is released and reported through `on_ended` with its pad id.
    pub fn render(&mut self, output: &mut [f32], mut on_ended: impl FnMut(usize)) {
        output.fill(Sample::EQUILIBRIUM);

        if self.channels == 0 {
            return;
        }

        let frames = output.len() / self.channels;
        if frames == 0 {
            return;
        }

        for voice in &mut self.voices {
            if !voice.active {
                continue;
            }

            let Some(sample) = voice.sample.clone() else {
                voice.stop();
                continue;
            };

            let sample_frames = sample.samples.len() / self.channels;
            if sample_frames == 0 || voice.frame_pos >= sample_frames {
                let pad_id = voice.pad_id;
                voice.stop();
                on_ended(pad_id);
                continue;
            }

            let take = frames.min(sample_frames - voice.frame_pos);
            for frame in 0..take {
                let src_base = (voice.frame_pos + frame) * self.channels;
                let out_base = frame * self.channels;
                for channel in 0..self.channels {
                    output[out_base + channel] +=
                        sample.samples[src_base + channel] * self.volume;
                }
            }

            voice.frame_pos += take;
            if voice.frame_pos >= sample_frames {
                let pad_id = voice.pad_id;
                voice.stop();
                on_ended(pad_id);
            }
        }
    }

    /// Gets the number of channels configured for this mixer.
    pub fn channels(&self) -> usize {
        self.channels
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn create_test_sample(channels: usize, frames: usize, value: f32) -> SampleBuffer {
        let samples = vec![value; channels * frames];
        SampleBuffer {
            channels,
            samples: Arc::from(samples.into_boxed_slice()),
        }
    }

    fn active_voices(mixer: &RtMixer) -> usize {
        mixer.voices.iter().filter(|v| v.active).count()
    }

    #[test]
    fn test_mixer_creation() {
        let mixer = RtMixer::new(2);
        assert_eq!(mixer.channels(), 2);
    }

    #[test]
    fn test_load_sample() {
        let mut mixer = RtMixer::new(2);
        let sample = create_test_sample(2, 100, 0.5);

        mixer.load_sample(0, sample);

        assert!(mixer.sample_bank[0].is_some());
    }

    #[test]
    fn test_load_sample_invalid_id() {
        let mut mixer = RtMixer::new(2);
        let sample = create_test_sample(2, 100, 0.5);

        mixer.load_sample(NUM_PADS + 100, sample);

        assert!(mixer.sample_bank.iter().all(|s| s.is_none()));
    }

    #[test]
    fn test_load_sample_wrong_channels() {
        let mut mixer = RtMixer::new(2);
        let sample = create_test_sample(1, 100, 0.5);

        mixer.load_sample(0, sample);

        assert!(mixer.sample_bank[0].is_none());
    }

    #[test]
    fn test_play_pad() {
        let mut mixer = RtMixer::new(2);
        mixer.load_sample(0, create_test_sample(2, 100, 0.5));

        mixer.play_pad(0);

        assert_eq!(active_voices(&mixer), 1);
    }

    #[test]
    fn test_play_pad_not_loaded() {
        let mut mixer = RtMixer::new(2);

        mixer.play_pad(0);

        assert_eq!(active_voices(&mixer), 0);
    }

    #[test]
    fn test_play_pad_invalid_id() {
        let mut mixer = RtMixer::new(2);

        mixer.play_pad(NUM_PADS);

        assert_eq!(active_voices(&mixer), 0);
    }

    #[test]
    fn test_no_overlap_retrigger_restarts_in_place() {
        let mut mixer = RtMixer::new(1);
        mixer.load_sample(0, create_test_sample(1, 100, 0.5));
        mixer.set_no_overlap(true);

        mixer.play_pad(0);
        let mut output = vec![0.0; 30];
        mixer.render(&mut output, |_| {});
        assert_eq!(mixer.voices[0].frame_pos, 30);

        // The retrigger rewinds the same voice instead of taking a new slot.
        mixer.play_pad(0);
        assert_eq!(active_voices(&mixer), 1);
        assert_eq!(mixer.voices[0].frame_pos, 0);
    }

    #[test]
    fn test_no_overlap_retrigger_always_resets() {
        let mut mixer = RtMixer::new(1);
        mixer.load_sample(0, create_test_sample(1, 100, 0.5));
        mixer.set_no_overlap(true);

        for _ in 0..5 {
            mixer.play_pad(0);
            let mut output = vec![0.0; 10];
            mixer.render(&mut output, |_| {});
            mixer.play_pad(0);
            assert_eq!(mixer.voices[0].frame_pos, 0);
        }
    }

    #[test]
    fn test_overlap_layers_new_voice() {
        let mut mixer = RtMixer::new(1);
        mixer.load_sample(0, create_test_sample(1, 100, 0.5));
        mixer.set_no_overlap(false);

        mixer.play_pad(0);
        let mut output = vec![0.0; 30];
        mixer.render(&mut output, |_| {});
        mixer.play_pad(0);

        // Two independent voices; the first keeps its position.
        assert_eq!(active_voices(&mixer), 2);
        assert_eq!(mixer.voices[0].frame_pos, 30);
        assert_eq!(mixer.voices[1].frame_pos, 0);
    }

    #[test]
    fn test_overlap_voices_end_independently() {
        let mut mixer = RtMixer::new(1);
        mixer.load_sample(0, create_test_sample(1, 50, 0.5));
        mixer.set_no_overlap(false);

        mixer.play_pad(0);
        let mut output = vec![0.0; 30];
        mixer.render(&mut output, |_| {});
        mixer.play_pad(0);

        // First voice has 20 frames left, second has 50.
        let mut ended = Vec::new();
        let mut output = vec![0.0; 30];
        mixer.render(&mut output, |id| ended.push(id));
        assert_eq!(ended, vec![0]);
        assert_eq!(active_voices(&mixer), 1);

        let mut output = vec![0.0; 30];
        mixer.render(&mut output, |id| ended.push(id));
        assert_eq!(ended, vec![0, 0]);
        assert_eq!(active_voices(&mixer), 0);
    }

    #[test]
    fn test_different_pads_always_layer() {
        let mut mixer = RtMixer::new(2);
        mixer.load_sample(0, create_test_sample(2, 100, 0.5));
        mixer.load_sample(1, create_test_sample(2, 100, 0.3));
        mixer.set_no_overlap(true);

        mixer.play_pad(0);
        mixer.play_pad(1);

        assert_eq!(active_voices(&mixer), 2);
    }

    #[test]
    fn test_stop_all() {
        let mut mixer = RtMixer::new(2);
        mixer.load_sample(0, create_test_sample(2, 100, 0.5));
        mixer.play_pad(0);
        assert_eq!(active_voices(&mixer), 1);

        mixer.stop_all();

        assert_eq!(active_voices(&mixer), 0);
    }

    #[test]
    fn test_set_volume_rejects_invalid() {
        let mut mixer = RtMixer::new(2);
        mixer.set_volume(0.4);

        mixer.set_volume(f32::NAN);
        assert!((mixer.volume - 0.4).abs() < f32::EPSILON);

        mixer.set_volume(1.5);
        assert!((mixer.volume - 0.4).abs() < f32::EPSILON);

        mixer.set_volume(-0.1);
        assert!((mixer.volume - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_render_silence() {
        let mut mixer = RtMixer::new(2);
        let mut output = vec![1.0; 200]; // 100 frames of stereo

        mixer.render(&mut output, |_| {});

        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_render_applies_volume() {
        let mut mixer = RtMixer::new(2);
        mixer.load_sample(0, create_test_sample(2, 10, 0.5));
        mixer.set_volume(0.5);
        mixer.play_pad(0);

        let mut output = vec![0.0; 20]; // 10 frames of stereo
        mixer.render(&mut output, |_| {});

        assert!(output.iter().all(|&s| (s - 0.25).abs() < f32::EPSILON));
    }

    #[test]
    fn test_volume_change_affects_playing_voice() {
        let mut mixer = RtMixer::new(1);
        mixer.load_sample(0, create_test_sample(1, 40, 0.5));
        mixer.set_volume(1.0);
        mixer.play_pad(0);

        let mut output = vec![0.0; 10];
        mixer.render(&mut output, |_| {});
        assert!((output[0] - 0.5).abs() < f32::EPSILON);

        mixer.set_volume(0.2);
        let mut output = vec![0.0; 10];
        mixer.render(&mut output, |_| {});
        assert!((output[0] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_render_one_shot_ends_voice() {
        let mut mixer = RtMixer::new(1);
        mixer.load_sample(0, create_test_sample(1, 5, 0.5));
        mixer.play_pad(0);

        let mut ended = Vec::new();
        let mut output = vec![0.0; 20];
        mixer.render(&mut output, |id| ended.push(id));

        // Five frames of sample, then silence; no looping.
        assert!(output[..5].iter().all(|&s| (s - 0.5).abs() < f32::EPSILON));
        assert!(output[5..].iter().all(|&s| s == 0.0));
        assert_eq!(ended, vec![0]);
        assert_eq!(active_voices(&mixer), 0);
    }

    #[test]
    fn test_render_exact_boundary_ends_voice() {
        let mut mixer = RtMixer::new(1);
        mixer.load_sample(0, create_test_sample(1, 10, 0.5));
        mixer.play_pad(0);

        let mut ended = Vec::new();
        let mut output = vec![0.0; 10];
        mixer.render(&mut output, |id| ended.push(id));

        assert_eq!(ended, vec![0]);
        assert_eq!(active_voices(&mixer), 0);
    }

    #[test]
    fn test_multiple_voices_mixing() {
        let mut mixer = RtMixer::new(2);
        mixer.load_sample(0, create_test_sample(2, 10, 0.3));
        mixer.load_sample(1, create_test_sample(2, 10, 0.2));

        mixer.play_pad(0);
        mixer.play_pad(1);

        let mut output = vec![0.0; 20]; // 10 frames of stereo
        mixer.render(&mut output, |_| {});

        // Output should contain mixed samples (0.3 + 0.2 = 0.5 per channel)
        assert!(output.iter().all(|&s| (s - 0.5).abs() < f32::EPSILON));
    }

    #[test]
    fn test_voice_limit() {
        let mut mixer = RtMixer::new(1);
        mixer.load_sample(0, create_test_sample(1, 10, 0.5));
        mixer.set_no_overlap(false);

        for _ in 0..(MAX_VOICES + 5) {
            mixer.play_pad(0);
        }

        assert_eq!(active_voices(&mixer), MAX_VOICES);
    }
}
