//! Audio-specific error types.

use thiserror::Error;

/// Errors that can occur while loading audio files.
#[derive(Debug, Error)]
pub enum SampleLoadError {
    /// Failed to open the audio file.
    #[error("failed to open file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode the audio file.
    #[error("failed to decode audio file: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    /// Failed to create resampler.
    #[error("failed to create resampler: {0}")]
    ResamplerConstruction(#[from] rubato::ResamplerConstructionError),

    /// Failed to resample audio.
    #[error("failed to resample audio: {0}")]
    Resample(#[from] rubato::ResampleError),

    /// Audio file has no default track.
    #[error("audio file has no default track")]
    NoDefaultTrack,

    /// Audio file is missing sample rate information.
    #[error("audio file is missing a sample rate")]
    MissingSampleRate,

    /// Audio file is missing channel information.
    #[error("audio file is missing channel information")]
    MissingChannels,

    /// Unsupported channel mapping configuration.
    #[error(
        "unsupported channel mapping: file has {file_channels} channels, output has {output_channels} channels (only mono↔stereo supported)"
    )]
    UnsupportedChannels {
        /// Number of channels in the source file.
        file_channels: usize,
        /// Number of channels expected for output.
        output_channels: usize,
    },
}

/// Errors that can occur while starting or talking to the audio engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine was initialized twice.
    #[error("audio engine already running")]
    AlreadyRunning,

    /// An operation needed a running stream.
    #[error("audio engine not running")]
    NotRunning,

    /// No usable output device on this host.
    #[error("no audio output device found")]
    NoOutputDevice,

    /// Could not query the default stream configuration.
    #[error("failed to query output config: {0}")]
    OutputConfig(#[from] cpal::DefaultStreamConfigError),

    /// Could not build the output stream.
    #[error("failed to create audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    /// Could not start the output stream.
    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    /// The control ring buffer is full.
    #[error("control channel full")]
    ControlChannelFull,
}
