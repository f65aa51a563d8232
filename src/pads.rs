//! The fixed pad registry: pad identifiers, the sample kit, and the
//! keyboard map.

use std::path::{Path, PathBuf};

use crate::audio_engine::constants::NUM_PADS;

/// Identifier of one drum pad.
///
/// The set is fixed at startup; playback requests use `from_name` and treat
/// unknown names as a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadId {
    Kick,
    Snare,
    Hihat,
}

impl PadId {
    /// All pads, in slot order.
    pub const ALL: [PadId; NUM_PADS] = [PadId::Kick, PadId::Snare, PadId::Hihat];

    /// Canonical lowercase name, as used in status announcements.
    pub fn name(self) -> &'static str {
        match self {
            PadId::Kick => "kick",
            PadId::Snare => "snare",
            PadId::Hihat => "hihat",
        }
    }

    /// Resolves an identifier string. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "kick" => Some(PadId::Kick),
            "snare" => Some(PadId::Snare),
            "hihat" => Some(PadId::Hihat),
            _ => None,
        }
    }

    /// Stable slot index used by the mixer and message ids.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl std::fmt::Display for PadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Keyboard layout of the pads: `a` / `s` / `d`.
pub fn pad_for_key(key: char) -> Option<PadId> {
    match key.to_ascii_lowercase() {
        'a' => Some(PadId::Kick),
        's' => Some(PadId::Snare),
        'd' => Some(PadId::Hihat),
        _ => None,
    }
}

/// Mapping from pads to sample files, set up once before the engine starts.
#[derive(Debug, Clone)]
pub struct PadKit {
    paths: [PathBuf; NUM_PADS],
}

impl PadKit {
    /// The standard kit: `kick.wav`, `snare.wav` and `hihat.wav` under `dir`.
    pub fn standard(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let paths = PadId::ALL.map(|pad| dir.join(format!("{}.wav", pad.name())));
        Self { paths }
    }

    /// Overrides the sample file for one pad.
    pub fn with_sample(mut self, pad: PadId, path: impl Into<PathBuf>) -> Self {
        self.paths[pad.index()] = path.into();
        self
    }

    pub fn path(&self, pad: PadId) -> &Path {
        &self.paths[pad.index()]
    }

    pub fn entries(&self) -> impl Iterator<Item = (PadId, &Path)> {
        PadId::ALL.iter().map(|pad| (*pad, self.path(*pad)))
    }
}
