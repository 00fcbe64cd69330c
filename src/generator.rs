//! Still-image generation.
//!
//! The exporter asks a [`FrameGenerator`] for one decoded image per
//! requested time. Implementations are expected to honour the
//! [`GeneratorOptions`] they are given; [`finish_frame`] applies the
//! orientation and size parts so implementations only have to decode.

use image::DynamicImage;
use image::imageops::FilterType;

use crate::configuration::GeneratorOptions;
use crate::error::GenerateError;
use crate::time::MediaTime;

/// Display rotation a track asks players to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Stored upright.
    #[default]
    Up,
    /// Rotate 90° clockwise for display.
    Right,
    /// Rotate 180° for display.
    Down,
    /// Rotate 270° clockwise for display.
    Left,
}

impl Orientation {
    /// Map a clockwise rotation in degrees to an orientation. Values that
    /// are not multiples of 90 are treated as upright.
    pub fn from_rotation_degrees(degrees: i64) -> Self {
        match degrees.rem_euclid(360) {
            90 => Orientation::Right,
            180 => Orientation::Down,
            270 => Orientation::Left,
            _ => Orientation::Up,
        }
    }

    /// Clockwise rotation in degrees.
    pub fn degrees(self) -> u32 {
        match self {
            Orientation::Up => 0,
            Orientation::Right => 90,
            Orientation::Down => 180,
            Orientation::Left => 270,
        }
    }

    /// Rotate `image` for display.
    pub fn apply(self, image: DynamicImage) -> DynamicImage {
        match self {
            Orientation::Up => image,
            Orientation::Right => image.rotate90(),
            Orientation::Down => image.rotate180(),
            Orientation::Left => image.rotate270(),
        }
    }
}

/// An image produced for a requested time.
#[derive(Debug, Clone)]
pub struct GeneratedFrame {
    /// The time that was requested.
    pub requested_time: MediaTime,
    /// Presentation time of the frame that was actually decoded.
    pub actual_time: MediaTime,
    /// The decoded image, ready to encode.
    pub image: DynamicImage,
}

/// Produces decoded images at points in time of one video.
///
/// Generators are shared across the export's worker and must be
/// [`Send`] + [`Sync`]; calls are never made concurrently for one export.
pub trait FrameGenerator: Send + Sync {
    /// Decode the frame displayed at `time`.
    fn generate(
        &self,
        time: MediaTime,
        options: &GeneratorOptions,
    ) -> Result<GeneratedFrame, GenerateError>;

    /// The rotation the source asks to be displayed with.
    fn preferred_orientation(&self) -> Orientation {
        Orientation::Up
    }
}

/// Apply the orientation and size limits of `options` to a decoded image.
pub fn finish_frame(
    image: DynamicImage,
    orientation: Orientation,
    options: &GeneratorOptions,
) -> DynamicImage {
    let image = if options.apply_preferred_orientation {
        orientation.apply(image)
    } else {
        image
    };

    match options.maximum_size {
        Some((width, height)) if image.width() > width || image.height() > height => {
            image.resize(width, height, FilterType::Triangle)
        }
        _ => image,
    }
}
