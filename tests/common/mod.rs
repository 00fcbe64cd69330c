//! In-memory media sources, frame generators and filesystems for tests.

#![allow(dead_code)]

use std::io::{Error as IoError, ErrorKind, Result as IoResult};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use framegrab::{
    FileSystem, FrameGenerator, GenerateError, GeneratedFrame, GeneratorOptions, MediaSource,
    MediaTime, ProgressCallback, ProgressInfo, ReadError, ReaderOutput, ReaderStatus,
    SampleBatch, SampleReader, SampleTiming, StdFileSystem, TrackId, finish_frame,
};
use image::{DynamicImage, Rgb, RgbImage};

pub const TIMESCALE: i32 = 600;

pub fn t(value: i64) -> MediaTime {
    MediaTime::new(value, TIMESCALE)
}

/// One timing entry per sample, at the given tick values.
pub fn batch_at(values: &[i64]) -> SampleBatch {
    SampleBatch::from_timings(
        values
            .iter()
            .map(|&value| SampleTiming::new(t(value), t(20)))
            .collect(),
    )
}

/// Counters shared between a [`FakeSource`] and the test.
#[derive(Debug, Default)]
pub struct SourceCounters {
    pub opened: AtomicUsize,
    pub pulls: AtomicUsize,
    pub cancelled: AtomicBool,
}

/// A scripted media source.
pub struct FakeSource {
    pub tracks: Vec<TrackId>,
    pub batches: Vec<SampleBatch>,
    pub final_status: ReaderStatus,
    pub open_error: Option<ReadError>,
    pub endless: Option<SampleBatch>,
    pub batch_delay: Duration,
    pub counters: Arc<SourceCounters>,
    pub on_open: Option<Box<dyn Fn() + Send + Sync>>,
}

impl FakeSource {
    pub fn new(batches: Vec<SampleBatch>) -> Self {
        Self {
            tracks: vec![TrackId(0)],
            batches,
            final_status: ReaderStatus::Completed,
            open_error: None,
            endless: None,
            batch_delay: Duration::ZERO,
            counters: Arc::new(SourceCounters::default()),
            on_open: None,
        }
    }

    /// A source that never runs out of samples.
    pub fn endless(batch: SampleBatch) -> Self {
        Self {
            endless: Some(batch),
            ..Self::new(Vec::new())
        }
    }

    pub fn without_video() -> Self {
        Self {
            tracks: Vec::new(),
            ..Self::new(Vec::new())
        }
    }

    pub fn with_final_status(mut self, status: ReaderStatus) -> Self {
        self.final_status = status;
        self
    }

    pub fn with_open_error(mut self, reason: &str) -> Self {
        self.open_error = Some(ReadError::new(reason));
        self
    }

    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    pub fn with_on_open(mut self, on_open: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_open = Some(Box::new(on_open));
        self
    }
}

impl MediaSource for FakeSource {
    fn video_tracks(&self) -> Vec<TrackId> {
        self.tracks.clone()
    }

    fn open_reader(
        &self,
        _track: TrackId,
        output: ReaderOutput,
    ) -> Result<Box<dyn SampleReader>, ReadError> {
        assert_eq!(output, ReaderOutput::PassThrough);
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        if let Some(on_open) = &self.on_open {
            on_open();
        }
        if let Some(error) = &self.open_error {
            return Err(error.clone());
        }

        Ok(Box::new(FakeReader {
            batches: self.batches.clone().into_iter(),
            endless: self.endless.clone(),
            final_status: self.final_status.clone(),
            status: ReaderStatus::Reading,
            delay: self.batch_delay,
            counters: self.counters.clone(),
        }))
    }
}

struct FakeReader {
    batches: std::vec::IntoIter<SampleBatch>,
    endless: Option<SampleBatch>,
    final_status: ReaderStatus,
    status: ReaderStatus,
    delay: Duration,
    counters: Arc<SourceCounters>,
}

impl SampleReader for FakeReader {
    fn next_batch(&mut self) -> Option<SampleBatch> {
        if self.status != ReaderStatus::Reading {
            return None;
        }
        self.counters.pulls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        if let Some(batch) = &self.endless {
            return Some(batch.clone());
        }
        match self.batches.next() {
            Some(batch) => Some(batch),
            None => {
                self.status = self.final_status.clone();
                None
            }
        }
    }

    fn status(&self) -> ReaderStatus {
        self.status.clone()
    }

    fn cancel(&mut self) {
        self.counters.cancelled.store(true, Ordering::SeqCst);
        self.status = ReaderStatus::Cancelled;
    }
}

/// Generates small solid-colour frames, optionally failing or panicking at
/// one time.
pub struct FakeGenerator {
    pub fail_at: Option<MediaTime>,
    pub panic_at: Option<MediaTime>,
    pub delay: Duration,
    pub calls: Mutex<Vec<MediaTime>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self {
            fail_at: None,
            panic_at: None,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_at(time: MediaTime) -> Self {
        Self {
            fail_at: Some(time),
            ..Self::new()
        }
    }

    pub fn panicking_at(time: MediaTime) -> Self {
        Self {
            panic_at: Some(time),
            ..Self::new()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<MediaTime> {
        self.calls.lock().unwrap().clone()
    }
}

impl FrameGenerator for FakeGenerator {
    fn generate(
        &self,
        time: MediaTime,
        options: &GeneratorOptions,
    ) -> Result<GeneratedFrame, GenerateError> {
        self.calls.lock().unwrap().push(time);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if self.panic_at == Some(time) {
            panic!("decoder crashed at {time}");
        }
        if self.fail_at == Some(time) {
            return Err(GenerateError::new(format!("no frame at {time}")));
        }

        let shade = (time.value % 256) as u8;
        let image = RgbImage::from_pixel(8, 4, Rgb([shade, 255 - shade, 128]));
        Ok(GeneratedFrame {
            requested_time: time,
            actual_time: time,
            image: finish_frame(
                DynamicImage::ImageRgb8(image),
                self.preferred_orientation(),
                options,
            ),
        })
    }
}

/// [`StdFileSystem`] with injectable failures.
#[derive(Default)]
pub struct FlakyFileSystem {
    pub fail_create: bool,
    pub fail_write_named: Option<String>,
    pub removed: Mutex<Vec<String>>,
}

impl FileSystem for FlakyFileSystem {
    fn create_dir_all(&self, path: &Path) -> IoResult<()> {
        if self.fail_create {
            return Err(IoError::new(ErrorKind::PermissionDenied, "read-only"));
        }
        StdFileSystem.create_dir_all(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> IoResult<()> {
        let name = path.file_name().and_then(|name| name.to_str());
        if name.is_some() && name == self.fail_write_named.as_deref() {
            // Leave a truncated file behind, as a real failed write might.
            StdFileSystem.write(path, &contents[..contents.len() / 2])?;
            return Err(IoError::new(ErrorKind::StorageFull, "disk full"));
        }
        StdFileSystem.write(path, contents)
    }

    fn remove_file(&self, path: &Path) -> IoResult<()> {
        if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
            self.removed.lock().unwrap().push(name.to_string());
        }
        StdFileSystem.remove_file(path)
    }
}

/// Records every progress report.
#[derive(Default)]
pub struct RecordingProgress {
    pub infos: Mutex<Vec<ProgressInfo>>,
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.infos.lock().unwrap().push(info.clone());
    }
}

/// Number of entries in `directory`.
pub fn file_count(directory: &Path) -> usize {
    std::fs::read_dir(directory)
        .map(|entries| entries.count())
        .unwrap_or(0)
}
