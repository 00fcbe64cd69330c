//! Indexing and export configuration.
//!
//! [`IndexOptions`] and [`ExportRequest`] are builders that thread limits,
//! progress callbacks and cancellation through the indexer and exporter
//! without widening every signature.
//!
//! # Example
//!
//! ```
//! use std::path::PathBuf;
//!
//! use framegrab::{ExportRequest, ImageEncoding, IndexOptions, MediaTime};
//!
//! let index_options = IndexOptions::new().with_frame_limit(50_000);
//!
//! let request = ExportRequest::new(vec![MediaTime::new(0, 600), MediaTime::new(300, 600)])
//!     .with_encoding(ImageEncoding::Jpeg { quality: 90 })
//!     .with_output_directory(PathBuf::from("frames"))
//!     .with_chunk_size(2);
//! assert_eq!(request.chunk_size(), 2);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageFormat;

use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};
use crate::time::MediaTime;

/// Default upper bound on the number of samples an index may hold.
pub const DEFAULT_FRAME_LIMIT: usize = 100_000;

/// Default number of frames generated per export chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 5;

/// Default prefix of exported file names.
pub const DEFAULT_FILE_PREFIX: &str = "frame_";

/// Settings for one [`FrameIndexer`](crate::FrameIndexer) run.
#[derive(Clone)]
pub struct IndexOptions {
    pub(crate) frame_limit: usize,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl Debug for IndexOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("IndexOptions")
            .field("frame_limit", &self.frame_limit)
            .field("has_cancellation", &self.cancellation.is_some())
            .finish()
    }
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexOptions {
    /// Defaults: [`DEFAULT_FRAME_LIMIT`], no progress callback, no external
    /// cancellation token.
    pub fn new() -> Self {
        Self {
            frame_limit: DEFAULT_FRAME_LIMIT,
            progress: Arc::new(NoOpProgress),
            cancellation: None,
        }
    }

    /// Fail with [`FrameLimitReached`](crate::IndexingError::FrameLimitReached)
    /// once more than `limit` samples have been read.
    #[must_use]
    pub fn with_frame_limit(mut self, limit: usize) -> Self {
        self.frame_limit = limit;
        self
    }

    /// Attach a progress callback, fired after each sample batch.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token. Cancelling it has the same effect as
    /// [`IndexingTask::cancel`](crate::IndexingTask::cancel).
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The configured frame limit.
    pub fn frame_limit(&self) -> usize {
        self.frame_limit
    }
}

/// How exported frames are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    /// JPEG at the given quality (1–100).
    Jpeg {
        /// Compression quality, clamped to 1–100.
        quality: u8,
    },
    /// Lossless PNG.
    Png,
}

impl Default for ImageEncoding {
    fn default() -> Self {
        ImageEncoding::Jpeg { quality: 95 }
    }
}

impl ImageEncoding {
    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageEncoding::Jpeg { .. } => "jpg",
            ImageEncoding::Png => "png",
        }
    }

    /// The matching [`image::ImageFormat`].
    pub fn image_format(&self) -> ImageFormat {
        match self {
            ImageEncoding::Jpeg { .. } => ImageFormat::Jpeg,
            ImageEncoding::Png => ImageFormat::Png,
        }
    }
}

/// How a [`FrameGenerator`](crate::FrameGenerator) should produce images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Largest allowed `(width, height)`. `None` keeps the native size.
    pub maximum_size: Option<(u32, u32)>,
    /// How far before the requested time a frame may be. Zero asks for
    /// the frame on screen at the requested time.
    pub tolerance_before: MediaTime,
    /// How far after the requested time a frame may be.
    ///
    /// A generator may return any frame inside the window, whichever is
    /// cheapest to decode.
    pub tolerance_after: MediaTime,
    /// Rotate frames the way the track asks to be displayed.
    pub apply_preferred_orientation: bool,
}

impl Default for GeneratorOptions {
    /// Native size, exact frame times, display orientation applied.
    fn default() -> Self {
        Self {
            maximum_size: None,
            tolerance_before: MediaTime::ZERO,
            tolerance_after: MediaTime::ZERO,
            apply_preferred_orientation: true,
        }
    }
}

/// Everything one [`FrameExporter`](crate::FrameExporter) run needs.
#[derive(Clone)]
pub struct ExportRequest {
    pub(crate) times: Vec<MediaTime>,
    pub(crate) encoding: ImageEncoding,
    pub(crate) output_directory: Option<PathBuf>,
    pub(crate) chunk_size: usize,
    pub(crate) file_prefix: String,
    pub(crate) generator_options: GeneratorOptions,
    pub(crate) progress: Arc<dyn ProgressCallback>,
}

impl Debug for ExportRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExportRequest")
            .field("frames", &self.times.len())
            .field("encoding", &self.encoding)
            .field("output_directory", &self.output_directory)
            .field("chunk_size", &self.chunk_size)
            .field("file_prefix", &self.file_prefix)
            .finish()
    }
}

impl ExportRequest {
    /// Export one frame per entry of `times`, in that order.
    pub fn new(times: Vec<MediaTime>) -> Self {
        Self {
            times,
            encoding: ImageEncoding::default(),
            output_directory: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            generator_options: GeneratorOptions::default(),
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Set the image encoding. JPEG quality is clamped to 1–100.
    #[must_use]
    pub fn with_encoding(mut self, encoding: ImageEncoding) -> Self {
        self.encoding = match encoding {
            ImageEncoding::Jpeg { quality } => ImageEncoding::Jpeg {
                quality: quality.clamp(1, 100),
            },
            other => other,
        };
        self
    }

    /// Write into `directory` (created if missing) instead of a fresh
    /// temporary directory.
    #[must_use]
    pub fn with_output_directory(mut self, directory: PathBuf) -> Self {
        self.output_directory = Some(directory);
        self
    }

    /// Frames generated per chunk. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Prefix of each file name; the frame index and extension follow it.
    #[must_use]
    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    /// Override how images are generated.
    #[must_use]
    pub fn with_generator_options(mut self, options: GeneratorOptions) -> Self {
        self.generator_options = options;
        self
    }

    /// Attach a progress callback, fired for every written frame.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// The requested times.
    pub fn times(&self) -> &[MediaTime] {
        &self.times
    }

    /// The configured chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// The configured encoding.
    pub fn encoding(&self) -> ImageEncoding {
        self.encoding
    }

    /// The caller-supplied output directory, if any.
    pub fn output_directory(&self) -> Option<&Path> {
        self.output_directory.as_deref()
    }

    /// File name of frame `index`, zero-padded so names sort in export
    /// order.
    pub(crate) fn file_name(&self, index: usize) -> String {
        let width = self.times.len().saturating_sub(1).to_string().len().max(4);
        format!(
            "{}{index:0width$}.{}",
            self.file_prefix,
            self.encoding.extension()
        )
    }
}
