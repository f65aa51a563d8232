//! Audio file loading and decoding functionality.
//!
//! This module provides functions for loading and decoding audio files into sample buffers
//! that can be used by the real-time mixer. Files whose sample rate differs
//! from the output stream rate are resampled; mono and stereo sources are
//! mapped to the output channel layout.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use rubato::{FftFixedIn, Resampler};
use symphonia::core::{
    audio::SampleBuffer as SymphoniaSampleBuffer, codecs::DecoderOptions,
    errors::Error as SymphoniaError, formats::FormatOptions, io::MediaSourceStream,
    meta::MetadataOptions, probe::Hint,
};
use symphonia::default::{get_codecs, get_probe};

use crate::audio_engine::errors::SampleLoadError;
use crate::messages::SampleBuffer;

const RESAMPLE_CHUNK_FRAMES: usize = 1024;

/// Decodes an audio file into a sample buffer with the specified output configuration.
///
/// This function loads an audio file from disk, decodes it using the Symphonia library,
/// and converts it to a floating-point sample buffer with the requested channel count
/// and sample rate.
///
/// # Parameters
///
/// - `path`: Path to the audio file to load
/// - `output_channels`: Number of output channels (1 for mono, 2 for stereo)
/// - `output_rate_hz`: Output sample rate in Hz
///
/// # Errors
///
/// This function may return errors for various conditions:
/// - File not found or cannot be opened
/// - Audio format not recognized or corrupted
/// - Unsupported channel count
/// - Resampler construction or processing failure
pub fn decode_audio_file_to_sample_buffer(
    path: &Path,
    output_channels: usize,
    output_rate_hz: u32,
) -> Result<SampleBuffer, SampleLoadError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or(SampleLoadError::NoDefaultTrack)?;
    let file_rate_hz = track
        .codec_params
        .sample_rate
        .ok_or(SampleLoadError::MissingSampleRate)?;
    let file_channels = track
        .codec_params
        .channels
        .ok_or(SampleLoadError::MissingChannels)?
        .count();

    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut decoded: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(SampleLoadError::Decode(err)),
        };

        let audio_buf = decoder.decode(&packet)?;
        let spec = *audio_buf.spec();
        let duration = audio_buf.capacity() as u64;

        let mut sample_buf = SymphoniaSampleBuffer::<f32>::new(duration, spec);
        sample_buf.copy_interleaved_ref(audio_buf);
        decoded.extend_from_slice(sample_buf.samples());
    }

    let decoded = if file_rate_hz != output_rate_hz {
        resample(decoded, file_channels, file_rate_hz, output_rate_hz)?
    } else {
        decoded
    };

    let mapped = map_channels(decoded, file_channels, output_channels)?;

    Ok(SampleBuffer {
        channels: output_channels,
        samples: Arc::from(mapped.into_boxed_slice()),
    })
}

/// Resamples interleaved audio from `from_hz` to `to_hz`.
///
/// Uses a fixed-input FFT resampler, feeding the sample through in chunks
/// plus one silent flush chunk, then drops the resampler's initial delay so
/// the result lines up with the source.
fn resample(
    samples: Vec<f32>,
    channels: usize,
    from_hz: u32,
    to_hz: u32,
) -> Result<Vec<f32>, SampleLoadError> {
    if samples.is_empty() || channels == 0 {
        return Ok(samples);
    }

    let frames = samples.len() / channels;

    let mut planar: Vec<Vec<f32>> = vec![Vec::with_capacity(frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (channel, value) in frame.iter().enumerate() {
            planar[channel].push(*value);
        }
    }

    let mut resampler = FftFixedIn::<f32>::new(
        from_hz as usize,
        to_hz as usize,
        RESAMPLE_CHUNK_FRAMES,
        2,
        channels,
    )?;
    let delay = resampler.output_delay();

    let mut out_planar: Vec<Vec<f32>> = vec![Vec::new(); channels];
    let mut pos = 0usize;
    while pos < frames {
        let needed = resampler.input_frames_next();
        let end = (pos + needed).min(frames);

        let mut chunk: Vec<Vec<f32>> = Vec::with_capacity(channels);
        for channel_data in &planar {
            let mut buf = channel_data[pos..end].to_vec();
            buf.resize(needed, 0.0);
            chunk.push(buf);
        }

        let processed = resampler.process(&chunk, None)?;
        for (channel, data) in processed.into_iter().enumerate() {
            out_planar[channel].extend(data);
        }

        pos += needed;
    }

    // One silent chunk flushes the tail through the FFT pipeline.
    let flush: Vec<Vec<f32>> = vec![vec![0.0; resampler.input_frames_next()]; channels];
    let processed = resampler.process(&flush, None)?;
    for (channel, data) in processed.into_iter().enumerate() {
        out_planar[channel].extend(data);
    }

    let expected = ((frames as f64) * f64::from(to_hz) / f64::from(from_hz)).round() as usize;
    let available = out_planar[0].len().saturating_sub(delay);
    let out_frames = expected.min(available);

    let mut out = Vec::with_capacity(out_frames * channels);
    for frame in 0..out_frames {
        for channel_data in &out_planar {
            out.push(channel_data[delay + frame]);
        }
    }

    Ok(out)
}

/// Maps audio samples from one channel configuration to another.
///
/// Currently supports:
/// - Mono (1 channel) → Stereo (2 channels): duplicates mono signal to both channels
/// - Stereo (2 channels) → Mono (1 channel): averages both channels
/// - Same channel count: no conversion needed
pub fn map_channels(
    samples: Vec<f32>,
    file_channels: usize,
    output_channels: usize,
) -> Result<Vec<f32>, SampleLoadError> {
    if file_channels == output_channels {
        return Ok(samples);
    }

    match (file_channels, output_channels) {
        // Mono → Stereo: duplicate each sample
        (1, 2) => {
            let mut out = Vec::with_capacity(samples.len() * 2);
            for s in samples {
                out.push(s);
                out.push(s);
            }
            Ok(out)
        }
        // Stereo → Mono: average each frame
        (2, 1) => {
            let mut out = Vec::with_capacity(samples.len() / 2);
            for frame in samples.chunks_exact(2) {
                out.push((frame[0] + frame[1]) * 0.5);
            }
            Ok(out)
        }
        // Unsupported mapping
        _ => Err(SampleLoadError::UnsupportedChannels {
            file_channels,
            output_channels,
        }),
    }
}
