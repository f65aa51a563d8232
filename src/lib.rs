//! padkit — a small native drum-pad sample engine.
//!
//! Three fixed pads (kick, snare, hihat) trigger preloaded one-shot samples
//! through a real-time cpal output stream. A global volume and an optional
//! "no-overlap" replay mode are persisted across runs through a pluggable
//! key-value store.
//!
//! The public surface is [`PadController`]: a front end (such as the `pads`
//! binary) resolves its own input events into `play`/`set_volume`/
//! `set_no_overlap` calls and polls [`EngineMessage`]s for voice-completion
//! feedback.

mod audio_engine;
mod messages;
mod pads;
mod settings;

pub use audio_engine::PadController;
pub use audio_engine::constants::{DEFAULT_VOLUME, NUM_PADS, PULSE_DURATION};
pub use audio_engine::errors::{EngineError, SampleLoadError};
pub use messages::EngineMessage;
pub use pads::{PadId, PadKit, pad_for_key};
pub use settings::{
    FileStore, MemoryStore, NO_OVERLAP_KEY, PlaybackSettings, SettingsStore, VOLUME_KEY,
};
