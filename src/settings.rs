//! Global playback settings and their persistence.
//!
//! Two fixed keys survive across runs: the global volume as a decimal string
//! and the no-overlap flag as `"1"`/`"0"`. There is no versioning and no
//! migration; unparseable values simply fall back to the defaults.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::audio_engine::constants::{DEFAULT_VOLUME, VOLUME_MAX, VOLUME_MIN};

/// Storage key for the persisted volume.
pub const VOLUME_KEY: &str = "drum.vol";

/// Storage key for the persisted no-overlap flag.
pub const NO_OVERLAP_KEY: &str = "drum.noOverlap";

/// Process-wide playback settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSettings {
    /// Global volume multiplier (0.0 to 1.0).
    pub volume: f32,

    /// When true, retriggering a pad restarts the playing voice instead of
    /// layering a new one.
    pub no_overlap: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            no_overlap: true,
        }
    }
}

impl PlaybackSettings {
    /// Reads persisted settings, keeping defaults for absent or invalid
    /// values.
    pub fn load(store: &dyn SettingsStore) -> Self {
        let mut settings = Self::default();

        if let Some(raw) = store.get(VOLUME_KEY) {
            match raw.trim().parse::<f32>() {
                Ok(volume) if volume.is_finite() => {
                    settings.volume = volume.clamp(VOLUME_MIN, VOLUME_MAX);
                }
                _ => log::warn!("ignoring persisted volume {raw:?}"),
            }
        }

        if let Some(raw) = store.get(NO_OVERLAP_KEY) {
            settings.no_overlap = raw == "1";
        }

        settings
    }
}

/// Durable key-value storage for [`PlaybackSettings`].
///
/// The controller takes this as an injected seam so tests run against an
/// in-memory store and front ends pick the location.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: &str) -> io::Result<()>;
}

/// Volatile in-memory store. Used in tests and as a fallback when no config
/// directory is available.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// File-backed store: one `key=value` pair per line, rewritten on every set.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens the store, reading any existing file. A missing file is an
    /// empty store.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let mut values = BTreeMap::new();

        match fs::read_to_string(&path) {
            Ok(contents) => {
                for line in contents.lines() {
                    if let Some((key, value)) = line.split_once('=') {
                        values.insert(key.to_string(), value.to_string());
                    }
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }

        Ok(Self { path, values })
    }

    /// Default settings file location under the platform config directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "padkit").map(|dirs| dirs.config_dir().join("settings.conf"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut contents = String::new();
        for (key, value) in &self.values {
            contents.push_str(key);
            contents.push('=');
            contents.push_str(value);
            contents.push('\n');
        }
        fs::write(&self.path, contents)
    }
}

impl SettingsStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }
}
