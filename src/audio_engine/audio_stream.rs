//! Audio Stream Module
//!
//! This module handles CPAL audio stream management including:
//! - Stream initialization and configuration
//! - Audio callback setup
//! - Real-time message processing
//! - Error handling for audio stream operations

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Stream, StreamConfig};
use env_logger::{Builder, Env};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::audio_engine::constants::RING_CAPACITY;
use crate::audio_engine::errors::EngineError;
use crate::audio_engine::mixer::RtMixer;
use crate::messages::{ControlMessage, EngineMessage};

/// Handle to the audio stream with associated message channels.
///
/// The control side is single-threaded, so the ring buffer endpoints are
/// owned directly by the handle.
pub struct AudioStreamHandle {
    pub stream: Stream,
    pub producer: Producer<ControlMessage>,
    pub consumer: Consumer<EngineMessage>,
    pub output_channels: usize,
    pub output_sample_rate: u32,
}

/// Setup and configure the logger for audio operations
pub fn setup_logger() {
    // Default to `info`; users can override via `RUST_LOG`, e.g.
    // `RUST_LOG=debug` when troubleshooting.
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .try_init()
        .unwrap_or(()); // Ignore initialization errors
}

/// Create and configure the audio stream
///
/// This function:
/// 1. Sets up the default audio device
/// 2. Configures the stream with appropriate parameters
/// 3. Creates ring buffers for message passing
/// 4. Initializes the mixer
/// 5. Builds and returns the audio stream
pub fn create_audio_stream() -> Result<AudioStreamHandle, EngineError> {
    setup_logger();

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(EngineError::NoOutputDevice)?;

    let config = device.default_output_config()?;
    let sample_rate = config.sample_rate();
    let channels = config.channels();

    log::info!("Starting pad engine... ({} ch@{} Hz)", channels, sample_rate);

    // Ring buffer for control messages into the audio thread
    let (producer_in, mut consumer_in) = RingBuffer::new(RING_CAPACITY);

    // Ring buffer for feedback out of the audio thread
    let (mut producer_out, consumer_out) = RingBuffer::new(RING_CAPACITY);

    let mut mixer = RtMixer::new(channels as usize);

    // Create stream config
    let stream_config = StreamConfig {
        channels,
        sample_rate,
        buffer_size: BufferSize::Fixed(512),
    };

    // Create audio stream with callback
    let stream = device.build_output_stream(
        &stream_config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            // Process incoming messages in real-time
            while let Ok(message) = consumer_in.pop() {
                match message {
                    ControlMessage::Ping() => {
                        let _ = producer_out.push(EngineMessage::Pong());
                    }
                    ControlMessage::LoadSample { id, sample } => {
                        mixer.load_sample(id, sample);
                    }
                    ControlMessage::PlaySample { id } => {
                        mixer.play_pad(id);
                    }
                    ControlMessage::StopAll() => {
                        mixer.stop_all();
                    }
                    ControlMessage::SetVolume(volume) => {
                        mixer.set_volume(volume);
                    }
                    ControlMessage::SetNoOverlap(enabled) => {
                        mixer.set_no_overlap(enabled);
                    }
                }
            }

            // Render audio; finished voices are reported back as the native
            // "ended" signal.
            mixer.render(data, |id| {
                let _ = producer_out.push(EngineMessage::VoiceEnded { id });
            });
        },
        |err| {
            log::error!("Audio stream error: {}", err);
        },
        None,
    )?;

    Ok(AudioStreamHandle {
        stream,
        producer: producer_in,
        consumer: consumer_out,
        output_channels: channels as usize,
        output_sample_rate: sample_rate,
    })
}

/// Start playing the audio stream
pub fn start_stream(stream: &Stream) -> Result<(), EngineError> {
    stream.play()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_setup() {
        // This test just verifies that logger setup doesn't panic
        // Multiple calls should be safe (though only the first takes effect)
        setup_logger();
        setup_logger(); // Should not panic
    }

    #[test]
    fn test_audio_stream_creation() {
        // This is a basic smoke test to ensure the function signature is correct
        // Actual stream creation requires audio hardware
        if cpal::default_host().default_output_device().is_none() {
            return; // Skip test if no audio device available
        }

        let result = create_audio_stream();
        // We expect this to potentially fail in test environments,
        // but we want to ensure the function exists and has the right signature
        match result {
            Ok(_) => {
                // If it works, that's great
            }
            Err(_) => {
                // Expected in many test environments
            }
        }
    }
}
