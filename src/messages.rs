//! Message definitions for communication with the real-time audio thread.
//!
//! This module defines the enums that serve as the wire format for messages passed through the
//! ring buffers between the control thread and the real-time audio thread.

use std::sync::Arc;

/// Immutable interleaved f32 sample data shared between voices.
///
/// Cloning a `SampleBuffer` is cheap (an `Arc` bump) and never copies or
/// mutates the underlying audio, so any number of voices can read the same
/// sample concurrently.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    pub channels: usize,
    pub samples: Arc<[f32]>,
}

/// Message that is emitted from the audio thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineMessage {
    /// Response to a Ping message.
    Pong(),

    /// A voice finished playing its sample.
    ///
    /// One message per voice; overlapping voices of the same pad each emit
    /// their own when they reach the end of the buffer.
    VoiceEnded { id: usize },
}

/// Message that is emitted from the control side.
#[derive(Debug, Clone)]
pub enum ControlMessage {
    /// Used for testing message passing functionality.
    Ping(),

    /// Set the global volume level.
    ///
    /// # Parameters
    /// * `volume` - Volume level (0.0 to 1.0)
    SetVolume(f32),

    /// Enable or disable no-overlap replay mode.
    ///
    /// When enabled, retriggering a pad restarts its playing voice in place
    /// instead of layering a new one.
    SetNoOverlap(bool),

    /// Publish a decoded sample into an audio-thread slot.
    ///
    /// # Parameters
    /// * `id` - Pad slot for the sample (0..NUM_PADS)
    /// * `sample` - Pre-decoded immutable sample buffer (shared handle)
    LoadSample { id: usize, sample: SampleBuffer },

    /// Trigger playback of a loaded pad sample.
    ///
    /// # Parameters
    /// * `id` - Pad slot to play
    PlaySample { id: usize },

    /// Stop all currently active voices.
    StopAll(),
}
