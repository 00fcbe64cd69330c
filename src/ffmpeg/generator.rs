use std::path::Path;
use std::sync::{Mutex, PoisonError};

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    format::{Pixel, context::Input, stream::Stream},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use ffmpeg_sys_next::AVPacketSideDataType;
use image::{DynamicImage, RgbImage};

use crate::configuration::GeneratorOptions;
use crate::error::GenerateError;
use crate::ffmpeg::source::{open_input, ticks_to_media_time};
use crate::generator::{FrameGenerator, GeneratedFrame, Orientation, finish_frame};
use crate::time::MediaTime;

/// Microseconds per second, FFmpeg's container-level time base.
const AV_TIME_BASE: i128 = 1_000_000;

/// Decodes still frames from the best video stream of a file.
///
/// Each request seeks to a keyframe and decodes forward. With zero
/// tolerances the result is the frame on screen at the requested time,
/// regardless of keyframe spacing. With a tolerance window, the first
/// decoded frame inside the window is returned, which saves decoding up to
/// the exact frame.
pub struct FfmpegFrameGenerator {
    input: Mutex<Input>,
    stream_index: usize,
    time_base: Rational,
    orientation: Orientation,
}

impl FfmpegFrameGenerator {
    /// Open `path` and select its best video stream.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GenerateError> {
        let path = path.as_ref();
        let input = open_input(path).map_err(|error| GenerateError::new(error.reason))?;

        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or_else(|| GenerateError::new("No video stream found in file"))?;
        let stream_index = stream.index();
        let time_base = stream.time_base();
        let orientation = display_matrix_rotation(&stream)
            .or_else(|| rotate_tag(&stream))
            .map(Orientation::from_rotation_degrees)
            .unwrap_or_default();

        log::debug!(
            "Frame generator ready (stream={stream_index}, rotation={}°)",
            orientation.degrees()
        );

        Ok(Self {
            input: Mutex::new(input),
            stream_index,
            time_base,
            orientation,
        })
    }

    /// Convert `time` to a timestamp in `time_base` units, rounding down.
    fn to_stream_timestamp(&self, time: MediaTime, time_base: Rational) -> Option<i64> {
        if !time.is_numeric() {
            return None;
        }
        let numerator = i128::from(time.value) * i128::from(time_base.denominator());
        let denominator = i128::from(time.timescale) * i128::from(time_base.numerator());
        if denominator == 0 {
            return None;
        }
        i64::try_from(numerator.div_euclid(denominator)).ok()
    }

    /// A tolerance in stream ticks; negative and non-numeric ones are zero.
    fn tolerance_ticks(&self, tolerance: MediaTime, time_base: Rational) -> i64 {
        self.to_stream_timestamp(tolerance, time_base)
            .unwrap_or(0)
            .max(0)
    }

    fn decode_at(
        &self,
        time: MediaTime,
        options: &GeneratorOptions,
    ) -> Result<(DynamicImage, MediaTime), GenerateError> {
        let target = self
            .to_stream_timestamp(time, self.time_base)
            .ok_or_else(|| GenerateError::new(format!("Cannot seek to {time}")))?;
        let lower =
            target.saturating_sub(self.tolerance_ticks(options.tolerance_before, self.time_base));
        let upper =
            target.saturating_add(self.tolerance_ticks(options.tolerance_after, self.time_base));

        // Any keyframe up to the end of the window will do.
        let microseconds = Rational::new(1, AV_TIME_BASE as i32);
        let seek_target = self
            .to_stream_timestamp(time, microseconds)
            .ok_or_else(|| GenerateError::new(format!("Cannot seek to {time}")))?
            .saturating_add(self.tolerance_ticks(options.tolerance_after, microseconds));

        let mut input = self.input.lock().unwrap_or_else(PoisonError::into_inner);

        let stream = input
            .stream(self.stream_index)
            .ok_or_else(|| GenerateError::new("Video stream disappeared"))?;
        let decoder_context = CodecContext::from_parameters(stream.parameters())?;
        let mut decoder = decoder_context.decoder().video()?;
        let (width, height) = (decoder.width(), decoder.height());

        let mut scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;

        input.seek(seek_target, ..seek_target)?;

        // `candidate` holds the latest frame displayed at or before the end
        // of the window; decoding stops once it lands inside the window.
        let mut decoded = VideoFrame::empty();
        let mut candidate = VideoFrame::empty();
        let mut candidate_pts: Option<i64> = None;
        let mut overshoot_pts: Option<i64> = None;
        let mut done = false;

        'packets: for (stream, packet) in input.packets() {
            if stream.index() != self.stream_index {
                continue;
            }
            decoder.send_packet(&packet)?;
            while decoder.receive_frame(&mut decoded).is_ok() {
                let pts = decoded.timestamp().or(decoded.pts()).unwrap_or(i64::MIN);
                if pts > upper {
                    overshoot_pts = Some(pts);
                    done = true;
                    break 'packets;
                }
                std::mem::swap(&mut decoded, &mut candidate);
                candidate_pts = Some(pts);
                if pts >= lower {
                    done = true;
                    break 'packets;
                }
            }
        }

        if !done {
            decoder.send_eof()?;
            while decoder.receive_frame(&mut decoded).is_ok() {
                let pts = decoded.timestamp().or(decoded.pts()).unwrap_or(i64::MIN);
                if pts > upper {
                    overshoot_pts = Some(pts);
                    break;
                }
                std::mem::swap(&mut decoded, &mut candidate);
                candidate_pts = Some(pts);
                if pts >= lower {
                    break;
                }
            }
        }

        // Seeking before the first frame leaves no candidate; the first
        // decoded frame is then the one on screen.
        let (source_frame, pts) = match (candidate_pts, overshoot_pts) {
            (Some(pts), _) => (&candidate, pts),
            (None, Some(pts)) => (&decoded, pts),
            (None, None) => {
                return Err(GenerateError::new(format!("No frame decoded at {time}")));
            }
        };

        let mut rgb_frame = VideoFrame::empty();
        scaler.run(source_frame, &mut rgb_frame)?;
        let image = convert_frame_to_image(&rgb_frame, width, height)?;
        Ok((image, ticks_to_media_time(Some(pts), self.time_base)))
    }
}

impl FrameGenerator for FfmpegFrameGenerator {
    fn generate(
        &self,
        time: MediaTime,
        options: &GeneratorOptions,
    ) -> Result<GeneratedFrame, GenerateError> {
        let (image, actual_time) = self.decode_at(time, options)?;
        Ok(GeneratedFrame {
            requested_time: time,
            actual_time,
            image: finish_frame(image, self.orientation, options),
        })
    }

    fn preferred_orientation(&self) -> Orientation {
        self.orientation
    }
}

/// Clockwise rotation from the stream's display matrix side data.
fn display_matrix_rotation(stream: &Stream<'_>) -> Option<i64> {
    // A display matrix is nine 32-bit fixed-point values.
    const DISPLAY_MATRIX_SIZE: usize = 9 * std::mem::size_of::<i32>();

    let angle = unsafe {
        let parameters = stream.parameters().as_ptr();
        if parameters.is_null() {
            return None;
        }
        let side_data = ffmpeg_sys_next::av_packet_side_data_get(
            (*parameters).coded_side_data,
            (*parameters).nb_coded_side_data,
            AVPacketSideDataType::AV_PKT_DATA_DISPLAYMATRIX,
        );
        if side_data.is_null() || (*side_data).size < DISPLAY_MATRIX_SIZE {
            return None;
        }
        ffmpeg_sys_next::av_display_rotation_get((*side_data).data as *const i32)
    };

    // The matrix rotates counterclockwise.
    angle.is_finite().then(|| -(angle.round() as i64))
}

/// Clockwise rotation from the legacy `rotate` metadata tag.
fn rotate_tag(stream: &Stream<'_>) -> Option<i64> {
    stream
        .metadata()
        .get("rotate")
        .and_then(|value| value.trim().parse::<i64>().ok())
}

/// Copy a packed RGB24 frame into an image, dropping per-row padding.
fn convert_frame_to_image(
    rgb_frame: &VideoFrame,
    width: u32,
    height: u32,
) -> Result<DynamicImage, GenerateError> {
    let stride = rgb_frame.stride(0);
    let row_bytes = (width as usize) * 3;
    let data = rgb_frame.data(0);

    let buffer = if stride == row_bytes {
        data[..row_bytes * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_bytes]);
        }
        buffer
    };

    let rgb_image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        GenerateError::new("Failed to construct RGB image from decoded frame data")
    })?;
    Ok(DynamicImage::ImageRgb8(rgb_image))
}
