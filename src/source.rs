//! Media container access.
//!
//! The indexer never decodes video itself. It talks to a [`MediaSource`],
//! which lists the video tracks of a container and opens a sequential
//! [`SampleReader`] over one of them. The `ffmpeg` feature provides an
//! implementation backed by FFmpeg; tests and other platforms can supply
//! their own.

use crate::error::ReadError;
use crate::time::SampleTiming;

/// Identifies one track inside a media container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackId(pub usize);

/// What a sample reader should hand back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReaderOutput {
    /// Compressed samples as stored; only timing is needed.
    #[default]
    PassThrough,
    /// Decoded samples.
    Decoded,
}

/// A run of samples pulled from a [`SampleReader`].
///
/// `timings` holds either one entry per sample, or a single entry shared by
/// all `sample_count` samples (see
/// [`normalize_sample_timings`](crate::normalize_sample_timings)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBatch {
    /// Number of samples in the batch.
    pub sample_count: usize,
    /// Timing entries for the batch.
    pub timings: Vec<SampleTiming>,
}

impl SampleBatch {
    /// A batch with one timing entry per sample.
    pub fn from_timings(timings: Vec<SampleTiming>) -> Self {
        Self {
            sample_count: timings.len(),
            timings,
        }
    }

    /// A batch of `sample_count` samples described by one shared entry.
    pub fn shared(timing: SampleTiming, sample_count: usize) -> Self {
        Self {
            sample_count,
            timings: vec![timing],
        }
    }
}

/// State of a [`SampleReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderStatus {
    /// More batches may follow.
    Reading,
    /// Every sample was read.
    Completed,
    /// Reading stopped with an error.
    Failed(ReadError),
    /// [`SampleReader::cancel`] was called.
    Cancelled,
}

/// A sequential reader over the samples of one track.
pub trait SampleReader: Send {
    /// The next batch of samples, or `None` once the reader stops
    /// producing (finished, failed, or cancelled; see [`status`](Self::status)).
    fn next_batch(&mut self) -> Option<SampleBatch>;

    /// Current reader state.
    fn status(&self) -> ReaderStatus;

    /// Stop reading and release resources. Later calls to
    /// [`next_batch`](Self::next_batch) return `None`.
    fn cancel(&mut self);
}

/// A media container that can be indexed.
pub trait MediaSource: Send + Sync {
    /// Video tracks in the container, the primary one first.
    fn video_tracks(&self) -> Vec<TrackId>;

    /// Open a sequential sample reader over `track`.
    fn open_reader(
        &self,
        track: TrackId,
        output: ReaderOutput,
    ) -> Result<Box<dyn SampleReader>, ReadError>;
}
