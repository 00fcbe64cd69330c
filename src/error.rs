//! Error types for the `framegrab` crate.
//!
//! Indexing and export fail in unrelated ways, so each has its own error
//! type: [`IndexingError`] and [`ExportError`]. The media collaborators
//! report failures through [`ReadError`] and [`GenerateError`], which the
//! two main types carry as causes.

use std::{io::Error as IoError, path::PathBuf, sync::Arc};

use image::ImageError;
use thiserror::Error;

use crate::time::MediaTime;

/// A failure reported by a [`MediaSource`](crate::MediaSource) or
/// [`SampleReader`](crate::SampleReader).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ReadError {
    /// What went wrong.
    pub reason: String,
}

impl ReadError {
    /// Create a read error from any message.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A failure reported by a [`FrameGenerator`](crate::FrameGenerator).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct GenerateError {
    /// What went wrong.
    pub reason: String,
}

impl GenerateError {
    /// Create a generation error from any message.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Why a [`FrameIndexer`](crate::FrameIndexer) run did not produce an index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum IndexingError {
    /// The run was cancelled before it finished.
    #[error("Indexing cancelled")]
    Cancelled,

    /// The source has no video track.
    #[error("No video track found in source")]
    InvalidVideo,

    /// The track holds more samples than the configured limit allows.
    #[error("Video has more than {limit} frames")]
    FrameLimitReached {
        /// The limit that was exceeded.
        limit: usize,
    },

    /// Opening or reading the track failed, or a sample had no valid time.
    #[error("Failed to read sample times{}", .0.as_ref().map(|e| format!(": {e}")).unwrap_or_default())]
    ReadingFailed(Option<ReadError>),
}

/// Why a [`FrameExporter`](crate::FrameExporter) run failed.
///
/// Errors are stored in [`ExportStatus::Failed`](crate::ExportStatus) and
/// handed to every listener, so the type is cheaply cloneable and keeps
/// non-cloneable causes behind [`Arc`].
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ExportError {
    /// The output directory could not be created.
    #[error("Failed to create output directory {path}: {source}")]
    DirectoryCreationFailed {
        /// Directory that was requested, or the temporary root.
        path: PathBuf,
        /// Underlying I/O failure.
        source: Arc<IoError>,
    },

    /// No image could be generated at a requested time.
    #[error("Failed to generate frame at {time}: {source}")]
    FrameGenerationFailed {
        /// The requested time.
        time: MediaTime,
        /// Underlying generator failure.
        source: GenerateError,
    },

    /// A generated image could not be encoded.
    #[error("Failed to encode frame: {0}")]
    EncodingFailed(Arc<ImageError>),

    /// An encoded image could not be written.
    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        /// Destination file.
        path: PathBuf,
        /// Underlying I/O failure.
        source: Arc<IoError>,
    },

    /// The export was cancelled.
    #[error("Export cancelled")]
    Cancelled,
}

impl From<ImageError> for ExportError {
    fn from(error: ImageError) -> Self {
        ExportError::EncodingFailed(Arc::new(error))
    }
}

#[cfg(feature = "ffmpeg")]
impl From<ffmpeg_next::Error> for ReadError {
    fn from(error: ffmpeg_next::Error) -> Self {
        ReadError::new(format!("FFmpeg error: {error}"))
    }
}

#[cfg(feature = "ffmpeg")]
impl From<ffmpeg_next::Error> for GenerateError {
    fn from(error: ffmpeg_next::Error) -> Self {
        GenerateError::new(format!("FFmpeg error: {error}"))
    }
}
