//! Image normalization for vision model input: fixed 512x512 frame,
//! three-channel color, fixed contrast boost, overwriting the file in
//! place.
//!
//! Failure is non-fatal by contract: the caller surfaces a warning and
//! forwards the untouched original downstream.

use std::io::Cursor;
use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageOutputFormat, Rgb, RgbImage};
use tracing::debug;

use super::NormalizeError;

/// Square frame the vision model receives. The resize is NOT
/// aspect-preserving; leaves are stretched to fill the frame.
pub const TARGET_SIZE: u32 = 512;

/// Fixed contrast boost applied after the resize.
pub const CONTRAST_FACTOR: f32 = 1.5;

/// Normalize the image at `path` and overwrite it with the result.
///
/// Steps: decode -> drop alpha (RGB8) -> resize to 512x512 ->
/// contrast x1.5 -> re-encode in the file's extension format
/// (jpeg fallback) -> overwrite.
///
/// All processing happens in memory; the file is only written after the
/// new encoding exists, so a decode or processing failure leaves the
/// original bytes untouched.
pub fn normalize_in_place(path: &Path) -> Result<(), NormalizeError> {
    let bytes = std::fs::read(path)?;

    let decoded = image::load_from_memory(&bytes)
        .map_err(|e| NormalizeError::Decode(e.to_string()))?;
    let (orig_w, orig_h) = decoded.dimensions();

    let rgb = decoded.to_rgb8();
    let resized = image::imageops::resize(&rgb, TARGET_SIZE, TARGET_SIZE, FilterType::CatmullRom);
    let adjusted = apply_contrast(&resized, CONTRAST_FACTOR);

    let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Jpeg);
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(adjusted)
        .write_to(&mut cursor, ImageOutputFormat::from(format))
        .map_err(|e| NormalizeError::Encode(e.to_string()))?;
    std::fs::write(path, cursor.into_inner())?;

    debug!(
        path = %path.display(),
        from = format!("{orig_w}x{orig_h}"),
        to = format!("{TARGET_SIZE}x{TARGET_SIZE}"),
        "Image normalized"
    );
    Ok(())
}

/// Mean-luminance contrast blend: `out = mean + factor * (px - mean)`,
/// clamped to the channel range.
///
/// Factor 1.0 is the identity; above 1.0 pushes pixels away from the
/// image's mean gray. Repeated application keeps spreading values, so
/// the operation is deliberately not idempotent.
pub fn apply_contrast(img: &RgbImage, factor: f32) -> RgbImage {
    let mean = mean_luminance(img);
    let mut out = RgbImage::new(img.width(), img.height());

    for (x, y, p) in img.enumerate_pixels() {
        let map = |c: u8| (mean + factor * (c as f32 - mean)).round().clamp(0.0, 255.0) as u8;
        out.put_pixel(x, y, Rgb([map(p.0[0]), map(p.0[1]), map(p.0[2])]));
    }
    out
}

/// Mean image luminance per ITU-R BT.601, rounded to the nearest level.
pub fn mean_luminance(img: &RgbImage) -> f32 {
    let count = (img.width() as u64) * (img.height() as u64);
    if count == 0 {
        return 0.0;
    }

    let mut sum = 0.0f64;
    for p in img.pixels() {
        sum += 0.299 * p.0[0] as f64 + 0.587 * p.0[1] as f64 + 0.114 * p.0[2] as f64;
    }
    (sum / count as f64).round() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    use image::RgbaImage;

    fn write_jpeg(path: &Path, width: u32, height: u32) {
        let img = gradient_image(width, height);
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, ImageOutputFormat::Jpeg(90))
            .unwrap();
        std::fs::write(path, cursor.into_inner()).unwrap();
    }

    fn write_png_with_alpha(path: &Path, width: u32, height: u32) {
        let img = RgbaImage::from_fn(width, height, |x, _| {
            image::Rgba([(x % 256) as u8, 80, 160, 128])
        });
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .unwrap();
        std::fs::write(path, cursor.into_inner()).unwrap();
    }

    /// Horizontal gradient, non-uniform so contrast has something to do.
    fn gradient_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, _| {
            let level = ((x * 255) / width.max(1)) as u8;
            Rgb([level, level, level])
        })
    }

    fn decoded(path: &Path) -> DynamicImage {
        image::load_from_memory(&std::fs::read(path).unwrap()).unwrap()
    }

    // ── normalize_in_place ──

    #[test]
    fn large_jpeg_becomes_512_square_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaf.jpg");
        write_jpeg(&path, 3000, 2000);

        normalize_in_place(&path).unwrap();

        let img = decoded(&path);
        assert_eq!(img.width(), TARGET_SIZE);
        assert_eq!(img.height(), TARGET_SIZE);
        assert_eq!(img.color().channel_count(), 3);
    }

    #[test]
    fn png_alpha_channel_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaf.png");
        write_png_with_alpha(&path, 640, 480);

        normalize_in_place(&path).unwrap();

        let img = decoded(&path);
        assert_eq!(img.width(), TARGET_SIZE);
        assert_eq!(img.height(), TARGET_SIZE);
        assert!(!img.color().has_alpha());
        assert_eq!(img.color().channel_count(), 3);
    }

    #[test]
    fn renormalizing_keeps_dimensions_but_not_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaf.png");
        write_png_with_alpha(&path, 512, 512);

        normalize_in_place(&path).unwrap();
        let first = decoded(&path).to_rgb8();

        // Dimensions are idempotent; the contrast boost is not: a second
        // pass keeps spreading pixel values. Expected, not a bug.
        normalize_in_place(&path).unwrap();
        let second = decoded(&path).to_rgb8();

        assert_eq!(second.width(), TARGET_SIZE);
        assert_eq!(second.height(), TARGET_SIZE);
        assert_ne!(first.as_raw(), second.as_raw());
    }

    #[test]
    fn undecodable_file_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.jpg");
        let garbage = [0xDE, 0xAD, 0xBE, 0xEF].repeat(32);
        std::fs::write(&path, &garbage).unwrap();

        let result = normalize_in_place(&path);

        assert!(matches!(result, Err(NormalizeError::Decode(_))));
        assert_eq!(std::fs::read(&path).unwrap(), garbage);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = normalize_in_place(&dir.path().join("absent.jpg"));
        assert!(matches!(result, Err(NormalizeError::Io(_))));
    }

    // ── apply_contrast ──

    #[test]
    fn contrast_pushes_values_away_from_mean() {
        let mut img = RgbImage::from_pixel(4, 2, Rgb([100, 100, 100]));
        for x in 0..4 {
            img.put_pixel(x, 1, Rgb([160, 160, 160]));
        }
        // mean = 130; dark half moves down, light half moves up.
        let out = apply_contrast(&img, 1.5);
        assert_eq!(out.get_pixel(0, 0).0, [85, 85, 85]);
        assert_eq!(out.get_pixel(0, 1).0, [175, 175, 175]);
    }

    #[test]
    fn contrast_clamps_to_channel_range() {
        let mut img = RgbImage::from_pixel(2, 1, Rgb([5, 5, 5]));
        img.put_pixel(1, 0, Rgb([250, 250, 250]));

        let out = apply_contrast(&img, 3.0);
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(out.get_pixel(1, 0).0, [255, 255, 255]);
    }

    #[test]
    fn contrast_factor_one_is_identity() {
        let img = gradient_image(16, 16);
        let out = apply_contrast(&img, 1.0);
        assert_eq!(img.as_raw(), out.as_raw());
    }

    #[test]
    fn contrast_is_not_idempotent() {
        let img = gradient_image(16, 16);
        let once = apply_contrast(&img, CONTRAST_FACTOR);
        let twice = apply_contrast(&once, CONTRAST_FACTOR);
        assert_ne!(once.as_raw(), twice.as_raw());
    }

    // ── mean_luminance ──

    #[test]
    fn mean_luminance_of_uniform_gray() {
        let img = RgbImage::from_pixel(8, 8, Rgb([128, 128, 128]));
        assert_eq!(mean_luminance(&img), 128.0);
    }

    #[test]
    fn mean_luminance_of_empty_image_is_zero() {
        let img = RgbImage::new(0, 0);
        assert_eq!(mean_luminance(&img), 0.0);
    }
}
