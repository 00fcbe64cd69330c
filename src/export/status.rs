//! Export status and its transition table.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::UnboundedSender;

use crate::error::ExportError;
use crate::filesystem::{FileSystem, delete_files};
use crate::progress::{CancellationToken, ProgressTracker};
use crate::time::MediaTime;

/// Where a running export stands.
///
/// An export starts in `Progressed` with no files and only moves forward:
/// once it is `Cancelled`, `Failed` or `Succeeded` it never changes again.
#[derive(Debug, Clone)]
pub enum ExportStatus {
    /// The export was cancelled; its files were removed.
    Cancelled,
    /// A frame failed; every file written so far was removed.
    Failed(ExportError),
    /// Files written so far, in request order.
    Progressed(Vec<PathBuf>),
    /// Every requested frame was written.
    Succeeded(Vec<PathBuf>),
}

impl ExportStatus {
    /// `true` for `Cancelled`, `Failed` and `Succeeded`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExportStatus::Progressed(_))
    }

    /// Files referenced by this status.
    pub fn files(&self) -> &[PathBuf] {
        match self {
            ExportStatus::Progressed(files) | ExportStatus::Succeeded(files) => files,
            ExportStatus::Cancelled | ExportStatus::Failed(_) => &[],
        }
    }
}

/// Something that happened to a running export.
#[derive(Debug, Clone)]
pub(crate) enum ExportEvent {
    FrameSucceeded { path: PathBuf, time: MediaTime },
    Cancelled,
    Failed(ExportError),
}

/// The status `event` moves `current` to, or `None` if the transition is
/// not allowed.
pub(crate) fn next_status(
    current: &ExportStatus,
    event: &ExportEvent,
    total: usize,
) -> Option<ExportStatus> {
    let ExportStatus::Progressed(files) = current else {
        return None;
    };

    let next = match event {
        ExportEvent::FrameSucceeded { path, .. } => {
            let mut files = files.clone();
            files.push(path.clone());
            if files.len() == total {
                ExportStatus::Succeeded(files)
            } else {
                ExportStatus::Progressed(files)
            }
        }
        ExportEvent::Cancelled => ExportStatus::Cancelled,
        ExportEvent::Failed(error) => ExportStatus::Failed(error.clone()),
    };

    Some(next)
}

struct AggregatorState {
    status: ExportStatus,
    tracker: ProgressTracker,
    updates: Option<UnboundedSender<ExportStatus>>,
}

/// The single point through which every export event passes.
///
/// Events are applied under one lock, so whichever of a late frame, a
/// failure or a cancellation arrives first decides the outcome.
pub(crate) struct StatusAggregator {
    state: Mutex<AggregatorState>,
    total: usize,
    file_system: Arc<dyn FileSystem>,
    cancellation: CancellationToken,
    temporary_directory: Option<PathBuf>,
}

impl StatusAggregator {
    pub(crate) fn new(
        total: usize,
        file_system: Arc<dyn FileSystem>,
        cancellation: CancellationToken,
        tracker: ProgressTracker,
        updates: UnboundedSender<ExportStatus>,
        temporary_directory: Option<PathBuf>,
    ) -> Self {
        Self {
            state: Mutex::new(AggregatorState {
                status: ExportStatus::Progressed(Vec::new()),
                tracker,
                updates: Some(updates),
            }),
            total,
            file_system,
            cancellation,
            temporary_directory,
        }
    }

    /// A snapshot of the current status.
    pub(crate) fn status(&self) -> ExportStatus {
        self.lock().status.clone()
    }

    /// Stop queued work and record a cancellation.
    pub(crate) fn cancel(&self) {
        self.cancellation.cancel();
        self.handle(ExportEvent::Cancelled);
    }

    /// Mark an export of zero frames as finished.
    pub(crate) fn finish_empty(&self) {
        let mut state = self.lock();
        if matches!(&state.status, ExportStatus::Progressed(files) if files.is_empty()) {
            let _closing = self.publish(&mut state, ExportStatus::Succeeded(Vec::new()));
        }
    }

    /// Apply `event`, cleaning up and notifying listeners as needed.
    ///
    /// The progress callback runs after the state lock is released, so it
    /// may query or cancel the export.
    pub(crate) fn handle(&self, event: ExportEvent) {
        let mut state = self.lock();
        let mut report = None;

        let Some(next) = next_status(&state.status, &event, self.total) else {
            // A frame that lands after the export already failed or was
            // cancelled must not outlive it.
            if matches!(state.status, ExportStatus::Cancelled | ExportStatus::Failed(_)) {
                if let ExportEvent::FrameSucceeded { path, .. } = &event {
                    if let Err(error) = self.file_system.remove_file(path) {
                        log::warn!("Could not remove late frame {}: {error}", path.display());
                    }
                }
                self.remove_temporary_directory();
            }
            log::trace!("Ignoring {event:?} in terminal export state");
            return;
        };

        match &next {
            ExportStatus::Cancelled | ExportStatus::Failed(_) => {
                self.cancellation.cancel();
                delete_files(&state.status, self.file_system.as_ref());
                self.remove_temporary_directory();
                log::debug!("Export ended early: {next:?}");
            }
            ExportStatus::Progressed(_) | ExportStatus::Succeeded(_) => {
                if let ExportEvent::FrameSucceeded { time, .. } = &event {
                    let info = state.tracker.record(1, Some(*time));
                    report = Some((state.tracker.callback(), info));
                }
            }
        }

        let closing = self.publish(&mut state, next);
        drop(state);

        // The last report lands before listeners see the channel close.
        if let Some((callback, info)) = report {
            callback.on_progress(&info);
        }
        drop(closing);
    }

    /// Record `next` and send it to the handle. On a terminal status the
    /// sender is handed back; the channel closes when it is dropped.
    #[must_use]
    fn publish(
        &self,
        state: &mut AggregatorState,
        next: ExportStatus,
    ) -> Option<UnboundedSender<ExportStatus>> {
        let terminal = next.is_terminal();
        state.status = next.clone();

        if let Some(updates) = &state.updates {
            // The handle may have been dropped; nobody is listening then.
            let _ = updates.send(next);
        }
        if !terminal {
            return None;
        }

        log::debug!(
            "Export finished with {} of {} frames",
            state.status.files().len(),
            self.total
        );
        state.updates.take()
    }

    /// Remove the directory the exporter created, once it is empty.
    ///
    /// A frame still being written keeps it alive; the late frame's event
    /// tries again.
    fn remove_temporary_directory(&self) {
        let Some(directory) = &self.temporary_directory else {
            return;
        };
        match std::fs::remove_dir(directory) {
            Ok(()) => log::debug!("Removed {}", directory.display()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => log::debug!("Keeping {}: {error}", directory.display()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AggregatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
