//! Audio decoding behind the pipeline's opaque "read samples" call
//!
//! Uses symphonia for format-agnostic decoding. The merge engine only ever
//! needs mono f32 samples plus the sample rate; everything else about the
//! codec layer stays outside the pipeline.

use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

/// Decoded clip audio
#[derive(Debug, Clone)]
pub struct ClipAudio {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

/// The external audio decoder collaborator.
pub trait AudioDecoder {
    fn read(&self, path: &Path) -> Result<ClipAudio>;
}

/// Symphonia-backed decoder
#[derive(Debug, Default)]
pub struct SymphoniaDecoder;

impl AudioDecoder for SymphoniaDecoder {
    fn read(&self, path: &Path) -> Result<ClipAudio> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open audio file: {}", path.display()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .with_context(|| format!("Failed to probe audio file: {}", path.display()))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .context("No audio track found in file")?;
        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .context("Sample rate unknown")?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .with_context(|| format!("Failed to create decoder for: {}", path.display()))?;

        let mut samples: Vec<f32> = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(symphonia::core::errors::Error::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => return Err(anyhow::anyhow!("Error reading packet: {}", e)),
            };
            if packet.track_id() != track_id {
                continue;
            }
            let decoded = decoder
                .decode(&packet)
                .with_context(|| format!("Failed to decode packet in: {}", path.display()))?;
            mix_to_mono(&decoded, &mut samples);
        }

        tracing::debug!(
            path = %path.display(),
            samples = samples.len(),
            sample_rate = sample_rate,
            "decoded clip audio"
        );

        Ok(ClipAudio {
            samples,
            sample_rate,
        })
    }
}

/// Append a decoded buffer to `out`, averaging channels to mono.
fn mix_to_mono(decoded: &AudioBufferRef, out: &mut Vec<f32>) {
    fn mix<S: Sample>(buf: &symphonia::core::audio::AudioBuffer<S>, out: &mut Vec<f32>)
    where
        f32: FromSample<S>,
    {
        let channels = buf.spec().channels.count();
        let frames = buf.frames();
        out.reserve(frames);
        for frame in 0..frames {
            let mut sum = 0.0f32;
            for ch in 0..channels {
                sum += f32::from_sample(buf.chan(ch)[frame]);
            }
            out.push(sum / channels as f32);
        }
    }

    match decoded {
        AudioBufferRef::U8(buf) => mix(&**buf, out),
        AudioBufferRef::U16(buf) => mix(&**buf, out),
        AudioBufferRef::U24(buf) => mix(&**buf, out),
        AudioBufferRef::U32(buf) => mix(&**buf, out),
        AudioBufferRef::S8(buf) => mix(&**buf, out),
        AudioBufferRef::S16(buf) => mix(&**buf, out),
        AudioBufferRef::S24(buf) => mix(&**buf, out),
        AudioBufferRef::S32(buf) => mix(&**buf, out),
        AudioBufferRef::F32(buf) => mix(&**buf, out),
        AudioBufferRef::F64(buf) => mix(&**buf, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_missing_file_fails() {
        let result = SymphoniaDecoder.read(Path::new("/nonexistent/clip.wav"));
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to open audio file"));
    }
}
