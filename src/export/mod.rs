//! Chunked, cancellable frame export.
//!
//! [`FrameExporter`] generates one image per requested time and writes each
//! to its own file. Times are processed in chunks of
//! [`ExportRequest::with_chunk_size`] frames, one chunk at a time, so only a
//! handful of decoded images are alive at once. Progress arrives as a
//! sequence of [`ExportStatus`] values ending in exactly one terminal
//! status. An export that fails or is cancelled removes every file it wrote.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framegrab::{ExportRequest, ExportStatus, FrameExporter, FrameGenerator, MediaTime};
//!
//! # async fn example(generator: Arc<dyn FrameGenerator>) -> Result<(), framegrab::ExportError> {
//! let exporter = FrameExporter::new(generator);
//! let request = ExportRequest::new(vec![MediaTime::new(0, 1), MediaTime::new(5, 1)]);
//! let mut handle = exporter.start(request)?;
//!
//! while let Some(status) = handle.next_update().await {
//!     match status {
//!         ExportStatus::Progressed(files) => println!("{} written", files.len()),
//!         ExportStatus::Succeeded(files) => println!("done: {files:?}"),
//!         ExportStatus::Failed(error) => eprintln!("failed: {error}"),
//!         ExportStatus::Cancelled => eprintln!("cancelled"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod status;

pub use status::ExportStatus;

use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio_stream::Stream;

use crate::configuration::{ExportRequest, GeneratorOptions, ImageEncoding};
use crate::error::{ExportError, GenerateError};
use crate::filesystem::{FileSystem, StdFileSystem};
use crate::generator::FrameGenerator;
use crate::progress::{CancellationToken, OperationType, ProgressTracker};
use crate::queue::{SerialQueue, panic_message};
use crate::time::MediaTime;

use status::{ExportEvent, StatusAggregator};

/// Prefix of temporary output directories.
const TEMPORARY_DIRECTORY_PREFIX: &str = "framegrab-";

/// Exports still frames of one video. Each exporter runs one export.
pub struct FrameExporter {
    generator: Arc<dyn FrameGenerator>,
    file_system: Arc<dyn FileSystem>,
    runtime: Handle,
    started: AtomicBool,
}

impl FrameExporter {
    /// Create an exporter that writes through [`StdFileSystem`] and runs its
    /// worker on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn new(generator: Arc<dyn FrameGenerator>) -> Self {
        Self {
            generator,
            file_system: Arc::new(StdFileSystem),
            runtime: Handle::current(),
            started: AtomicBool::new(false),
        }
    }

    /// Write through `file_system` instead of [`std::fs`].
    #[must_use]
    pub fn with_file_system(mut self, file_system: Arc<dyn FileSystem>) -> Self {
        self.file_system = file_system;
        self
    }

    /// Run the worker on `runtime`.
    #[must_use]
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = runtime;
        self
    }

    /// Start exporting.
    ///
    /// Creates the output directory, queues one job per chunk and returns
    /// immediately. Frames are written on Tokio's blocking pool.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::DirectoryCreationFailed`] if the output
    /// directory cannot be created. No work is queued in that case.
    ///
    /// # Panics
    ///
    /// Panics if this exporter was already started.
    pub fn start(&self, request: ExportRequest) -> Result<ExportHandle, ExportError> {
        assert!(
            !self.started.swap(true, Ordering::AcqRel),
            "FrameExporter::start called twice; use a new exporter for each export"
        );

        let (output_directory, temporary) =
            self.prepare_output_directory(request.output_directory())?;
        let total = request.times.len();

        log::debug!(
            "Exporting {total} frames to {} (chunk size {})",
            output_directory.display(),
            request.chunk_size
        );

        let cancellation = CancellationToken::new();
        let (sender, receiver) = unbounded_channel();
        let tracker = ProgressTracker::new(
            request.progress.clone(),
            OperationType::FrameExport,
            Some(total as u64),
        );
        let aggregator = Arc::new(StatusAggregator::new(
            total,
            self.file_system.clone(),
            cancellation.clone(),
            tracker,
            sender,
            temporary.then(|| output_directory.clone()),
        ));

        if total == 0 {
            aggregator.finish_empty();
        } else {
            let queue = SerialQueue::new(&self.runtime, "frame-exporter");
            for (chunk_number, chunk) in request.times.chunks(request.chunk_size).enumerate() {
                let first_index = chunk_number * request.chunk_size;
                let frames: Vec<(MediaTime, PathBuf)> = chunk
                    .iter()
                    .enumerate()
                    .map(|(offset, &time)| {
                        let name = request.file_name(first_index + offset);
                        (time, output_directory.join(name))
                    })
                    .collect();

                let job = ChunkJob {
                    frames,
                    encoding: request.encoding,
                    generator_options: request.generator_options.clone(),
                    generator: self.generator.clone(),
                    file_system: self.file_system.clone(),
                    aggregator: aggregator.clone(),
                    cancellation: cancellation.clone(),
                };
                queue.submit(cancellation.clone(), move || job.run());
            }
        }

        Ok(ExportHandle {
            aggregator,
            updates: receiver,
            output_directory,
            total,
        })
    }

    /// The directory to write into, and whether it was created here as a
    /// temporary directory.
    fn prepare_output_directory(
        &self,
        requested: Option<&Path>,
    ) -> Result<(PathBuf, bool), ExportError> {
        match requested {
            Some(directory) => {
                self.file_system
                    .create_dir_all(directory)
                    .map_err(|error| ExportError::DirectoryCreationFailed {
                        path: directory.to_path_buf(),
                        source: Arc::new(error),
                    })?;
                Ok((directory.to_path_buf(), false))
            }
            None => tempfile::Builder::new()
                .prefix(TEMPORARY_DIRECTORY_PREFIX)
                .tempdir()
                .map(|directory| (directory.keep(), true))
                .map_err(|error| ExportError::DirectoryCreationFailed {
                    path: std::env::temp_dir(),
                    source: Arc::new(error),
                }),
        }
    }
}

/// The frames of one chunk and everything needed to write them.
struct ChunkJob {
    frames: Vec<(MediaTime, PathBuf)>,
    encoding: ImageEncoding,
    generator_options: GeneratorOptions,
    generator: Arc<dyn FrameGenerator>,
    file_system: Arc<dyn FileSystem>,
    aggregator: Arc<StatusAggregator>,
    cancellation: CancellationToken,
}

impl ChunkJob {
    fn run(self) {
        for (time, path) in self.frames {
            if self.cancellation.is_cancelled() {
                return;
            }

            // A panicking generator or encoder must still end the export.
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                write_frame(
                    self.generator.as_ref(),
                    self.file_system.as_ref(),
                    time,
                    &path,
                    self.encoding,
                    &self.generator_options,
                )
            }))
            .unwrap_or_else(|payload| {
                let _ = self.file_system.remove_file(&path);
                Err(ExportError::FrameGenerationFailed {
                    time,
                    source: GenerateError::new(format!(
                        "panicked while exporting frame: {}",
                        panic_message(payload.as_ref())
                    )),
                })
            });

            let event = match outcome {
                Ok(()) => ExportEvent::FrameSucceeded { path, time },
                Err(error) => ExportEvent::Failed(error),
            };

            let failed = matches!(event, ExportEvent::Failed(_));
            self.aggregator.handle(event);
            if failed {
                return;
            }
        }
    }
}

fn write_frame(
    generator: &dyn FrameGenerator,
    file_system: &dyn FileSystem,
    time: MediaTime,
    path: &Path,
    encoding: ImageEncoding,
    options: &GeneratorOptions,
) -> Result<(), ExportError> {
    let frame = generator
        .generate(time, options)
        .map_err(|source| ExportError::FrameGenerationFailed { time, source })?;

    let bytes = encode_image(&frame.image, encoding)?;

    if let Err(error) = file_system.write(path, &bytes) {
        // A failed write can leave a truncated file behind.
        let _ = file_system.remove_file(path);
        return Err(ExportError::WriteFailed {
            path: path.to_path_buf(),
            source: Arc::new(error),
        });
    }

    log::trace!("Wrote frame at {time} to {}", path.display());
    Ok(())
}

/// Encode `image` in memory.
///
/// JPEG only takes 8-bit RGB or grayscale, so other layouts are converted
/// to RGB first.
pub fn encode_image(image: &DynamicImage, encoding: ImageEncoding) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    match encoding {
        ImageEncoding::Jpeg { quality } => {
            let encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
            match image {
                DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => {
                    image.write_with_encoder(encoder)?;
                }
                other => DynamicImage::ImageRgb8(other.to_rgb8()).write_with_encoder(encoder)?,
            }
        }
        ImageEncoding::Png => {
            image.write_to(&mut Cursor::new(&mut bytes), encoding.image_format())?;
        }
    }
    Ok(bytes)
}

/// A running export.
///
/// Read status updates with [`next_update`](ExportHandle::next_update) or
/// as a [`Stream`]; the last item is always terminal. Dropping the handle
/// does not stop the export.
pub struct ExportHandle {
    aggregator: Arc<StatusAggregator>,
    updates: UnboundedReceiver<ExportStatus>,
    output_directory: PathBuf,
    total: usize,
}

impl ExportHandle {
    /// Cancel the export.
    ///
    /// Queued chunks never run, the running chunk stops before its next
    /// frame, and files written so far are removed. Has no effect once the
    /// export has reached a terminal status, so it is safe to call any
    /// number of times.
    pub fn cancel(&self) {
        self.aggregator.cancel();
    }

    /// The current status.
    pub fn status(&self) -> ExportStatus {
        self.aggregator.status()
    }

    /// Directory the frames are written to.
    ///
    /// A temporary directory created for this export is removed again if
    /// the export fails or is cancelled.
    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Number of frames requested.
    pub fn total(&self) -> usize {
        self.total
    }

    /// The next status update, or `None` after the terminal one.
    pub async fn next_update(&mut self) -> Option<ExportStatus> {
        self.updates.recv().await
    }

    /// Wait for the export to finish and return its terminal status.
    pub async fn wait(mut self) -> ExportStatus {
        let mut last = None;
        while let Some(status) = self.updates.recv().await {
            last = Some(status);
        }
        last.unwrap_or_else(|| self.aggregator.status())
    }
}

impl Stream for ExportHandle {
    type Item = ExportStatus;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.updates.poll_recv(cx)
    }
}
