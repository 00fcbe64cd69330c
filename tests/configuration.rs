//! Builder and default tests for indexing and export settings.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use framegrab::{
    CancellationToken, DEFAULT_CHUNK_SIZE, DEFAULT_FRAME_LIMIT, ExportRequest, GeneratorOptions,
    ImageEncoding, IndexOptions, MediaTime, ProgressCallback, ProgressInfo,
};
use image::ImageFormat;

struct Silent;

impl ProgressCallback for Silent {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

// ── IndexOptions ──────────────────────────────────────────────────

#[test]
fn index_options_defaults() {
    let options = IndexOptions::default();
    assert_eq!(options.frame_limit(), DEFAULT_FRAME_LIMIT);
    assert_eq!(options.frame_limit(), 100_000);
}

#[test]
fn index_options_builder() {
    let options = IndexOptions::new()
        .with_frame_limit(12)
        .with_progress(Arc::new(Silent))
        .with_cancellation(CancellationToken::new());

    assert_eq!(options.frame_limit(), 12);
    assert!(format!("{options:?}").contains("has_cancellation: true"));
}

// ── ImageEncoding ─────────────────────────────────────────────────

#[test]
fn encoding_defaults_to_high_quality_jpeg() {
    assert_eq!(ImageEncoding::default(), ImageEncoding::Jpeg { quality: 95 });
}

#[test]
fn encoding_extensions_and_formats() {
    let jpeg = ImageEncoding::Jpeg { quality: 50 };
    assert_eq!(jpeg.extension(), "jpg");
    assert_eq!(jpeg.image_format(), ImageFormat::Jpeg);
    assert_eq!(ImageEncoding::Png.extension(), "png");
    assert_eq!(ImageEncoding::Png.image_format(), ImageFormat::Png);
}

// ── GeneratorOptions ──────────────────────────────────────────────

#[test]
fn generator_options_default_to_exact_native_frames() {
    let options = GeneratorOptions::default();
    assert_eq!(options.maximum_size, None);
    assert_eq!(options.tolerance_before, MediaTime::ZERO);
    assert_eq!(options.tolerance_after, MediaTime::ZERO);
    assert!(options.apply_preferred_orientation);
}

// ── ExportRequest ─────────────────────────────────────────────────

#[test]
fn export_request_defaults() {
    let request = ExportRequest::new(vec![MediaTime::new(1, 1)]);
    assert_eq!(request.times(), &[MediaTime::new(1, 1)]);
    assert_eq!(request.chunk_size(), DEFAULT_CHUNK_SIZE);
    assert_eq!(request.encoding(), ImageEncoding::default());
    assert_eq!(request.output_directory(), None);
}

#[test]
fn jpeg_quality_is_clamped() {
    let low = ExportRequest::new(Vec::new()).with_encoding(ImageEncoding::Jpeg { quality: 0 });
    assert_eq!(low.encoding(), ImageEncoding::Jpeg { quality: 1 });

    let high = ExportRequest::new(Vec::new()).with_encoding(ImageEncoding::Jpeg { quality: 200 });
    assert_eq!(high.encoding(), ImageEncoding::Jpeg { quality: 100 });

    let png = ExportRequest::new(Vec::new()).with_encoding(ImageEncoding::Png);
    assert_eq!(png.encoding(), ImageEncoding::Png);
}

#[test]
fn chunk_size_is_at_least_one() {
    assert_eq!(ExportRequest::new(Vec::new()).with_chunk_size(0).chunk_size(), 1);
    assert_eq!(ExportRequest::new(Vec::new()).with_chunk_size(8).chunk_size(), 8);
}

#[test]
fn export_request_output_directory() {
    let request = ExportRequest::new(Vec::new()).with_output_directory(PathBuf::from("frames"));
    assert_eq!(request.output_directory(), Some(Path::new("frames")));
}

#[test]
fn export_request_debug_summarizes_times() {
    let request = ExportRequest::new(vec![MediaTime::ZERO; 3])
        .with_progress(Arc::new(Silent))
        .with_file_prefix("shot_");
    let debug = format!("{request:?}");
    assert!(debug.starts_with("ExportRequest"));
    assert!(debug.contains("frames: 3"));
    assert!(debug.contains("file_prefix: \"shot_\""));
}
