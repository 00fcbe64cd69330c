//! # framegrab
//!
//! Grab exact still frames from videos.
//!
//! `framegrab` does two things:
//!
//! - **Index** every frame of a video. [`FrameIndexer`] reads the
//!   presentation time of every sample of the primary video track into a
//!   sorted [`FrameIndex`], which maps any position (say, a scrubber) to the
//!   nearest real frame.
//! - **Export** frames. [`FrameExporter`] decodes one full-resolution image
//!   per requested time, in small chunks to bound memory, writes each to
//!   its own file and streams progress back. If any frame fails, or the
//!   export is cancelled, every file it wrote is removed again.
//!
//! Media access goes through the [`MediaSource`] and [`FrameGenerator`]
//! traits. The `ffmpeg` feature provides implementations of both, powered
//! by [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next).
//!
//! ## Quick Start
//!
//! ```no_run
//! # #[cfg(feature = "ffmpeg")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//!
//! use framegrab::ffmpeg::{FfmpegFrameGenerator, FfmpegSource};
//! use framegrab::{ExportRequest, ExportStatus, FrameExporter, FrameIndexer, IndexOptions, MediaTime};
//!
//! let source = Arc::new(FfmpegSource::open("input.mp4")?);
//! let index = FrameIndexer::new().index(source, IndexOptions::new()).await?;
//!
//! // Snap 2.5s to the nearest real frame and export it.
//! let frame = index.nearest_time(MediaTime::new(2_500, 1_000)).ok_or("empty video")?;
//!
//! let generator = Arc::new(FfmpegFrameGenerator::open("input.mp4")?);
//! let handle = FrameExporter::new(generator).start(ExportRequest::new(vec![frame.time]))?;
//!
//! if let ExportStatus::Succeeded(files) = handle.wait().await {
//!     println!("wrote {files:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Exact frame times**: rational [`MediaTime`] timestamps, no
//!   floating-point drift
//! - **Sorted-sequence search**: insertion points and nearest-match queries
//!   in [`search`]
//! - **Serialized indexing**: index requests queue and run one at a time,
//!   each independently cancellable
//! - **Chunked export**: bounded memory, ordered file names, JPEG or PNG
//! - **All-or-nothing output**: failures and cancellation roll back
//!   written files
//! - **Progress & cancellation**: [`ProgressCallback`] and
//!   [`CancellationToken`]
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ffmpeg` | FFmpeg-backed [`MediaSource`] and [`FrameGenerator`], plus the `framegrab` CLI |

pub mod configuration;
pub mod error;
pub mod export;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod filesystem;
pub mod frame_index;
pub mod generator;
pub mod indexer;
pub mod normalize;
pub mod progress;
mod queue;
pub mod search;
pub mod source;
pub mod time;

pub use configuration::{
    DEFAULT_CHUNK_SIZE, DEFAULT_FILE_PREFIX, DEFAULT_FRAME_LIMIT, ExportRequest, GeneratorOptions,
    ImageEncoding, IndexOptions,
};
pub use error::{ExportError, GenerateError, IndexingError, ReadError};
pub use export::{ExportHandle, ExportStatus, FrameExporter, encode_image};
pub use filesystem::{FileSystem, StdFileSystem, delete_files};
pub use frame_index::{FrameIndex, IndexedFrame};
pub use generator::{FrameGenerator, GeneratedFrame, Orientation, finish_frame};
pub use indexer::{FrameIndexer, IndexingTask, index_frames};
pub use normalize::normalize_sample_timings;
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use source::{MediaSource, ReaderOutput, ReaderStatus, SampleBatch, SampleReader, TrackId};
pub use time::{MediaTime, SampleTiming};
