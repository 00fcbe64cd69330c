//! Frame time indexing.
//!
//! [`FrameIndexer`] reads the presentation time of every sample of a video's
//! primary track and returns them as a sorted [`FrameIndex`]. Requests are
//! processed one at a time, in the order they were made, on a background
//! worker; each request can be cancelled independently.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framegrab::{FrameIndexer, IndexOptions, MediaSource, MediaTime};
//!
//! # async fn example(source: Arc<dyn MediaSource>) -> Result<(), framegrab::IndexingError> {
//! let indexer = FrameIndexer::new();
//! let index = indexer.index(source, IndexOptions::new()).await?;
//!
//! if let Some(frame) = index.nearest_time(MediaTime::new(2_500, 1_000)) {
//!     println!("frame {} is at {}", frame.index, frame.time);
//! }
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use tokio::runtime::Handle;
use tokio::sync::oneshot::{self, Receiver};

use crate::configuration::IndexOptions;
use crate::error::{IndexingError, ReadError};
use crate::frame_index::FrameIndex;
use crate::normalize::normalize_sample_timings;
use crate::progress::{CancellationToken, OperationType, ProgressTracker};
use crate::queue::{SerialQueue, panic_message};
use crate::source::{MediaSource, ReaderOutput, ReaderStatus};
use crate::time::MediaTime;

/// Builds [`FrameIndex`]es, one request at a time.
///
/// Starting a new request never interrupts the one that is running; it
/// waits its turn. Use [`IndexingTask::cancel`] to abandon a single request
/// or [`cancel_all`](FrameIndexer::cancel_all) to abandon everything
/// submitted so far.
pub struct FrameIndexer {
    queue: SerialQueue,
    submitted: Mutex<CancellationToken>,
}

impl FrameIndexer {
    /// Create an indexer whose worker runs on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn new() -> Self {
        Self::with_runtime(&Handle::current())
    }

    /// Create an indexer whose worker runs on `runtime`.
    pub fn with_runtime(runtime: &Handle) -> Self {
        Self {
            queue: SerialQueue::new(runtime, "frame-indexer"),
            submitted: Mutex::new(CancellationToken::new()),
        }
    }

    /// Queue an indexing run over `source`.
    ///
    /// The returned task resolves exactly once, with the index or the reason
    /// there is none.
    pub fn index(&self, source: Arc<dyn MediaSource>, options: IndexOptions) -> IndexingTask {
        let (sender, receiver) = oneshot::channel();
        let run_token = CancellationToken::new();
        let submitted = self
            .submitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut tokens = vec![run_token.clone(), submitted];
        tokens.extend(options.cancellation.clone());
        let cancellation = RunCancellation { tokens };

        self.queue.submit(run_token.clone(), move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                index_frames_with(source.as_ref(), &options, &cancellation)
            }))
            .unwrap_or_else(|payload| {
                Err(IndexingError::ReadingFailed(Some(ReadError::new(format!(
                    "panicked while reading samples: {}",
                    panic_message(payload.as_ref())
                )))))
            });
            let _ = sender.send(result);
        });

        IndexingTask {
            cancellation: run_token,
            receiver,
        }
    }

    /// Cancel every run submitted so far, queued or active. Runs submitted
    /// afterwards are unaffected.
    pub fn cancel_all(&self) {
        let mut submitted = self
            .submitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        submitted.cancel();
        *submitted = CancellationToken::new();
    }
}

impl Default for FrameIndexer {
    fn default() -> Self {
        Self::new()
    }
}

/// A pending [`FrameIndexer`] run.
///
/// Await it to get the result. Dropping it does not cancel the run.
pub struct IndexingTask {
    cancellation: CancellationToken,
    receiver: Receiver<Result<FrameIndex, IndexingError>>,
}

impl IndexingTask {
    /// Request cancellation. A queued run never starts; an active run stops
    /// before its next sample batch. Either way the task resolves to
    /// [`IndexingError::Cancelled`].
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }
}

impl Future for IndexingTask {
    type Output = Result<FrameIndex, IndexingError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(IndexingError::Cancelled)))
    }
}

struct RunCancellation {
    tokens: Vec<CancellationToken>,
}

impl RunCancellation {
    fn is_cancelled(&self) -> bool {
        self.tokens.iter().any(CancellationToken::is_cancelled)
    }
}

/// Index `source` on the calling thread.
///
/// This is the blocking core of [`FrameIndexer::index`], for callers that
/// manage their own threads. Cancellation comes from the token in
/// `options`.
pub fn index_frames(
    source: &dyn MediaSource,
    options: &IndexOptions,
) -> Result<FrameIndex, IndexingError> {
    let cancellation = RunCancellation {
        tokens: options.cancellation.iter().cloned().collect(),
    };
    index_frames_with(source, options, &cancellation)
}

fn index_frames_with(
    source: &dyn MediaSource,
    options: &IndexOptions,
    cancellation: &RunCancellation,
) -> Result<FrameIndex, IndexingError> {
    if cancellation.is_cancelled() {
        return Err(IndexingError::Cancelled);
    }

    let track = source
        .video_tracks()
        .first()
        .copied()
        .ok_or(IndexingError::InvalidVideo)?;

    log::debug!(
        "Indexing frames (track={}, limit={})",
        track.0,
        options.frame_limit
    );

    let mut reader = source
        .open_reader(track, ReaderOutput::PassThrough)
        .map_err(|error| IndexingError::ReadingFailed(Some(error)))?;

    let mut tracker =
        ProgressTracker::new(options.progress.clone(), OperationType::FrameIndexing, None);
    let mut times: Vec<MediaTime> = Vec::new();

    loop {
        if cancellation.is_cancelled() {
            reader.cancel();
            log::debug!("Indexing cancelled after {} samples", times.len());
            return Err(IndexingError::Cancelled);
        }

        let Some(batch) = reader.next_batch() else {
            break;
        };

        let timings = normalize_sample_timings(batch.timings, batch.sample_count);
        let added = timings.len();
        times.extend(timings.iter().map(|timing| timing.presentation_time));
        log::trace!("Read {added} samples ({} total)", times.len());

        if times.len() > options.frame_limit {
            reader.cancel();
            log::debug!("Frame limit of {} exceeded", options.frame_limit);
            return Err(IndexingError::FrameLimitReached {
                limit: options.frame_limit,
            });
        }

        tracker.advance(added as u64, times.last().copied());
    }

    match reader.status() {
        ReaderStatus::Completed => {}
        ReaderStatus::Cancelled => return Err(IndexingError::Cancelled),
        ReaderStatus::Failed(error) => return Err(IndexingError::ReadingFailed(Some(error))),
        ReaderStatus::Reading => {
            return Err(IndexingError::ReadingFailed(Some(ReadError::new(
                "reader stopped before reaching the end of the track",
            ))));
        }
    }

    if let Some(position) = times.iter().position(|time| !time.is_numeric()) {
        log::debug!("Sample {position} has no valid presentation time");
        return Err(IndexingError::ReadingFailed(None));
    }

    let index = FrameIndex::from_unsorted(times);
    log::debug!("Indexed {} frames", index.len());
    Ok(index)
}
