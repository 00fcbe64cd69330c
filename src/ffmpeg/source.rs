use std::path::{Path, PathBuf};

use ffmpeg_next::{Error as FfmpegError, Packet, Rational, format::context::Input, media::Type};

use crate::error::ReadError;
use crate::source::{MediaSource, ReaderOutput, ReaderStatus, SampleBatch, SampleReader, TrackId};
use crate::time::{MediaTime, SampleTiming};

/// Video packets collected per [`SampleBatch`].
const PACKETS_PER_BATCH: usize = 256;

/// A media file read through FFmpeg.
///
/// Opening inspects the container once to list its video streams. Every
/// reader opens its own demuxer, so readers are independent of each other.
#[derive(Debug, Clone)]
pub struct FfmpegSource {
    path: PathBuf,
    video_tracks: Vec<TrackId>,
}

impl FfmpegSource {
    /// Open `path` and list its video streams, best stream first.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReadError> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening media file: {}", path.display());

        let input = open_input(&path)?;
        let best = input.streams().best(Type::Video).map(|stream| stream.index());

        let mut video_tracks: Vec<TrackId> = input
            .streams()
            .filter(|stream| stream.parameters().medium() == Type::Video)
            .map(|stream| TrackId(stream.index()))
            .collect();
        if let Some(best) = best {
            video_tracks.sort_by_key(|track| track.0 != best);
        }

        Ok(Self { path, video_tracks })
    }

    /// Path of the media file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MediaSource for FfmpegSource {
    fn video_tracks(&self) -> Vec<TrackId> {
        self.video_tracks.clone()
    }

    fn open_reader(
        &self,
        track: TrackId,
        output: ReaderOutput,
    ) -> Result<Box<dyn SampleReader>, ReadError> {
        if output != ReaderOutput::PassThrough {
            return Err(ReadError::new("FFmpeg sample reader only supports pass-through output"));
        }

        let input = open_input(&self.path)?;
        let time_base = input
            .stream(track.0)
            .ok_or_else(|| ReadError::new(format!("stream {} does not exist", track.0)))?
            .time_base();

        Ok(Box::new(FfmpegSampleReader {
            input,
            stream_index: track.0,
            time_base,
            status: ReaderStatus::Reading,
        }))
    }
}

pub(crate) fn open_input(path: &Path) -> Result<Input, ReadError> {
    ffmpeg_next::init()
        .map_err(|error| ReadError::new(format!("FFmpeg initialisation failed: {error}")))?;
    ffmpeg_next::format::input(&path)
        .map_err(|error| ReadError::new(format!("Failed to open {}: {error}", path.display())))
}

/// Reads packet timing of one stream without decoding.
pub struct FfmpegSampleReader {
    input: Input,
    stream_index: usize,
    time_base: Rational,
    status: ReaderStatus,
}

impl FfmpegSampleReader {
    fn to_media_time(&self, ticks: Option<i64>) -> MediaTime {
        ticks_to_media_time(ticks, self.time_base)
    }
}

/// Convert a timestamp in `time_base` units to a [`MediaTime`].
///
/// Missing timestamps and overflowing conversions become
/// [`MediaTime::INVALID`].
pub(crate) fn ticks_to_media_time(ticks: Option<i64>, time_base: Rational) -> MediaTime {
    let numerator = i64::from(time_base.numerator());
    let denominator = time_base.denominator();
    ticks
        .and_then(|ticks| ticks.checked_mul(numerator))
        .map(|value| MediaTime::new(value, denominator))
        .unwrap_or(MediaTime::INVALID)
}

impl SampleReader for FfmpegSampleReader {
    fn next_batch(&mut self) -> Option<SampleBatch> {
        if self.status != ReaderStatus::Reading {
            return None;
        }

        let mut timings = Vec::with_capacity(PACKETS_PER_BATCH);
        let mut packet = Packet::empty();

        while timings.len() < PACKETS_PER_BATCH {
            match packet.read(&mut self.input) {
                Ok(()) => {
                    if packet.stream() != self.stream_index {
                        continue;
                    }
                    timings.push(SampleTiming {
                        presentation_time: self.to_media_time(packet.pts()),
                        decode_time: packet.dts().map(|dts| self.to_media_time(Some(dts))),
                        duration: self.to_media_time(Some(packet.duration())),
                    });
                }
                Err(FfmpegError::Eof) => {
                    self.status = ReaderStatus::Completed;
                    break;
                }
                Err(error) => {
                    self.status = ReaderStatus::Failed(ReadError::from(error));
                    break;
                }
            }
        }

        (!timings.is_empty()).then(|| SampleBatch::from_timings(timings))
    }

    fn status(&self) -> ReaderStatus {
        self.status.clone()
    }

    fn cancel(&mut self) {
        if self.status == ReaderStatus::Reading {
            self.status = ReaderStatus::Cancelled;
        }
    }
}
