//! Audio engine configuration constants and limits.

use std::time::Duration;

/// Number of drum pads (kick, snare, hihat).
pub const NUM_PADS: usize = 3;

/// Maximum number of voices that can be active simultaneously.
pub const MAX_VOICES: usize = 16;

/// Minimum volume level (silence).
pub const VOLUME_MIN: f32 = 0.0;

/// Maximum volume level (100%).
pub const VOLUME_MAX: f32 = 1.0;

/// Volume applied when no persisted value exists.
pub const DEFAULT_VOLUME: f32 = 0.9;

/// How long a pad counts as "just triggered" for visual feedback.
pub const PULSE_DURATION: Duration = Duration::from_millis(90);

/// Capacity of each control/feedback ring buffer.
pub const RING_CAPACITY: usize = 1024;
