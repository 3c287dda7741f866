//! Output sinks.
//!
//! The mixer hands each rendered chunk to an [`OutputSink`] as interleaved
//! `f32` frames. Device backends are out of scope here; the CLI writes WAV
//! files and tests collect into a [`VecSink`].

/// Error reported by an [`OutputSink`].
#[derive(Debug)]
pub enum SinkError {
    /// The interleaved slice length is not a multiple of the channel count.
    FrameMisaligned {
        /// Samples received.
        samples: usize,
        /// Channel count given.
        channels: usize,
    },
    /// The sink was built for a different channel count.
    ChannelMismatch {
        /// Channel count the sink was opened with.
        expected: usize,
        /// Channel count given.
        found: usize,
    },
    /// The underlying writer failed.
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl SinkError {
    /// Wraps a backend error.
    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend(err.into())
    }
}

impl core::fmt::Display for SinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::FrameMisaligned { samples, channels } => write!(
                f,
                "{samples} samples do not form whole frames of {channels} channels"
            ),
            Self::ChannelMismatch { expected, found } => {
                write!(f, "sink expects {expected} channels, got {found}")
            }
            Self::Backend(err) => write!(f, "sink backend error: {err}"),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Destination for rendered audio.
pub trait OutputSink {
    /// Consumes whole interleaved frames.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the frames are malformed or the backend fails.
    fn write_frames(&mut self, interleaved: &[f32], channels: usize) -> Result<(), SinkError>;

    /// Latency the sink itself adds, in frames. Default 0.
    fn delay_frames(&self) -> usize {
        0
    }
}

/// Checks that `interleaved` holds whole frames of `channels` channels.
///
/// # Errors
///
/// [`SinkError::FrameMisaligned`] otherwise.
pub fn check_frames(interleaved: &[f32], channels: usize) -> Result<usize, SinkError> {
    if channels == 0 || interleaved.len() % channels != 0 {
        return Err(SinkError::FrameMisaligned {
            samples: interleaved.len(),
            channels,
        });
    }
    Ok(interleaved.len() / channels)
}

/// In-memory sink that appends everything it receives.
#[derive(Debug, Default, Clone)]
pub struct VecSink {
    samples: Vec<f32>,
    channels: Option<usize>,
}

impl VecSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All samples written so far, interleaved.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Frames written so far.
    pub fn frames(&self) -> usize {
        self.channels.map_or(0, |c| self.samples.len() / c)
    }

    /// Consumes the sink, returning the interleaved samples.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

impl OutputSink for VecSink {
    fn write_frames(&mut self, interleaved: &[f32], channels: usize) -> Result<(), SinkError> {
        check_frames(interleaved, channels)?;
        match self.channels {
            Some(expected) if expected != channels => {
                return Err(SinkError::ChannelMismatch {
                    expected,
                    found: channels,
                });
            }
            _ => self.channels = Some(channels),
        }
        self.samples.extend_from_slice(interleaved);
        Ok(())
    }
}
