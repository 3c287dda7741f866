//! WAV file I/O using hound.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavWriter};
use mixtree_core::{OutputSink, SinkError, check_frames};

/// Interleaved samples read from a WAV file.
#[derive(Debug, Clone)]
pub struct WavData {
    /// Interleaved samples in `[-1, 1]`.
    pub samples: Vec<f32>,
    /// Channel count of the file.
    pub channels: usize,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl WavData {
    /// Length in frames.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }
}

/// Read a WAV file, keeping its channel layout.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<WavData, hound::Error> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(WavData {
        samples,
        channels: usize::from(spec.channels.max(1)),
        sample_rate: spec.sample_rate,
    })
}

/// Output sink that streams interleaved frames into a WAV file.
///
/// 32-bit output is written as float, 16 and 24 bit as integers.
pub struct WavSink {
    writer: WavWriter<BufWriter<File>>,
    channels: usize,
    bits_per_sample: u16,
    frames: usize,
    peak: f32,
}

impl WavSink {
    /// Create `path` and write the header.
    pub fn create<P: AsRef<Path>>(
        path: P,
        channels: usize,
        sample_rate: u32,
        bits_per_sample: u16,
    ) -> Result<Self, hound::Error> {
        let spec = hound::WavSpec {
            channels: channels as u16,
            sample_rate,
            bits_per_sample,
            sample_format: if bits_per_sample == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        };
        Ok(Self {
            writer: WavWriter::create(path, spec)?,
            channels,
            bits_per_sample,
            frames: 0,
            peak: 0.0,
        })
    }

    /// Frames written so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Largest absolute sample written so far, before integer quantization.
    pub fn peak(&self) -> f32 {
        self.peak
    }

    /// Patch the header lengths and flush.
    pub fn finalize(self) -> Result<(), hound::Error> {
        self.writer.finalize()
    }

    fn write_samples(&mut self, interleaved: &[f32]) -> Result<(), hound::Error> {
        if self.bits_per_sample == 32 {
            for &sample in interleaved {
                self.writer.write_sample(sample)?;
            }
        } else {
            let max_val = (1i32 << (self.bits_per_sample - 1)) as f32;
            for &sample in interleaved {
                let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
                self.writer.write_sample(int_sample)?;
            }
        }
        Ok(())
    }
}

impl OutputSink for WavSink {
    fn write_frames(&mut self, interleaved: &[f32], channels: usize) -> Result<(), SinkError> {
        if channels != self.channels {
            return Err(SinkError::ChannelMismatch {
                expected: self.channels,
                found: channels,
            });
        }
        let frames = check_frames(interleaved, channels)?;
        self.write_samples(interleaved).map_err(SinkError::backend)?;
        self.frames += frames;
        self.peak = interleaved.iter().fold(self.peak, |peak, s| peak.max(s.abs()));
        Ok(())
    }
}
