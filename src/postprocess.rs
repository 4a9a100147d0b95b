use image::{imageops, DynamicImage, GrayImage, Luma, Pixel, Rgba, RgbaImage};
use ndarray::prelude::*;

use crate::errors::{GlacierSegError, Result};
use crate::preprocess::RESIZE_FILTER;

/// Probabilities strictly below this value are glacier.
pub const GLACIER_THRESHOLD: f32 = 0.5;

/// Translucent blue laid over glacier pixels.
pub const OVERLAY_TINT: Rgba<u8> = Rgba([0, 0, 255, 100]);

pub const MASK_GLACIER: u8 = 255;
pub const MASK_BACKGROUND: u8 = 0;

#[inline]
pub fn is_glacier(probability: f32) -> bool {
    probability < GLACIER_THRESHOLD
}

/// Extract the `(H, W)` probability map of batch item `index` from a `(B, H, W, 1)` output.
pub fn probability_map(batch: &Array4<f32>, index: usize) -> Result<ArrayView2<'_, f32>> {
    let (items, _, _, channels) = batch.dim();
    if index >= items || channels == 0 {
        return Err(GlacierSegError::model(
            "probability map extraction",
            format!("item {index} out of range for output shape {:?}", batch.shape()),
        ));
    }
    Ok(batch.slice(s![index, .., .., 0]))
}

/// Threshold a probability map into a white-on-black glacier mask.
pub fn to_binary_mask(probabilities: ArrayView2<f32>) -> GrayImage {
    let (height, width) = probabilities.dim();
    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        if is_glacier(probabilities[[y as usize, x as usize]]) {
            Luma([MASK_GLACIER])
        } else {
            Luma([MASK_BACKGROUND])
        }
    })
}

/// Resize `original` to the map's resolution and tint every glacier pixel with
/// [`OVERLAY_TINT`] using "over" compositing. Other pixels keep the resized original.
pub fn to_overlay(original: &DynamicImage, probabilities: ArrayView2<f32>) -> RgbaImage {
    let (height, width) = probabilities.dim();
    let mut overlay = imageops::resize(
        &original.to_rgba8(),
        width as u32,
        height as u32,
        RESIZE_FILTER,
    );

    for (x, y, pixel) in overlay.enumerate_pixels_mut() {
        if is_glacier(probabilities[[y as usize, x as usize]]) {
            // channels are truncated, not rounded, on the way back to u8
            pixel.blend(&OVERLAY_TINT);
        }
    }
    overlay
}

pub fn glacier_pixel_count(probabilities: ArrayView2<f32>) -> usize {
    probabilities.iter().filter(|&&p| is_glacier(p)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn mask_as_probabilities(mask: &GrayImage) -> Array2<f32> {
        let (width, height) = mask.dimensions();
        Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
            if mask.get_pixel(x as u32, y as u32)[0] == MASK_GLACIER {
                0.0
            } else {
                1.0
            }
        })
    }

    #[test]
    fn test_threshold_boundary() {
        assert!(is_glacier(0.0));
        assert!(is_glacier(0.4999));
        assert!(!is_glacier(0.5));
        assert!(!is_glacier(1.0));
    }

    #[test]
    fn test_binary_mask_values() {
        let probabilities = Array2::from_shape_fn((8, 6), |(y, x)| (y * 6 + x) as f32 / 47.0);
        let mask = to_binary_mask(probabilities.view());

        assert_eq!(mask.dimensions(), (6, 8));
        assert!(mask
            .pixels()
            .all(|p| p[0] == MASK_GLACIER || p[0] == MASK_BACKGROUND));
        assert_eq!(mask.get_pixel(0, 0)[0], MASK_GLACIER);
        assert_eq!(mask.get_pixel(5, 7)[0], MASK_BACKGROUND);
    }

    #[test]
    fn test_binary_mask_idempotent() {
        let probabilities = Array2::from_shape_fn((16, 16), |(y, x)| {
            ((x * 31 + y * 17) % 100) as f32 / 100.0
        });
        let once = to_binary_mask(probabilities.view());
        let twice = to_binary_mask(mask_as_probabilities(&once).view());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_overlay_only_tints_glacier() {
        let original = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([200, 100, 0])));
        let mut probabilities = Array2::<f32>::ones((4, 4));
        probabilities[[1, 2]] = 0.1;

        let overlay = to_overlay(&original, probabilities.view());

        assert_eq!(overlay.dimensions(), (4, 4));
        assert_eq!(*overlay.get_pixel(0, 0), Rgba([200, 100, 0, 255]));

        let tinted = overlay.get_pixel(2, 1);
        assert!(tinted[0] < 200);
        assert!(tinted[2] > 0);
        assert_eq!(tinted[3], 255);
    }

    #[test]
    fn test_overlay_tint_truncates_channels() {
        let original = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([200, 100, 0])));
        let probabilities = Array2::<f32>::zeros((1, 1));

        let overlay = to_overlay(&original, probabilities.view());
        // 121.57 and 60.78 before the cast
        assert_eq!(*overlay.get_pixel(0, 0), Rgba([121, 60, 100, 255]));
    }

    #[test]
    fn test_overlay_deterministic() {
        let original = DynamicImage::ImageRgb8(RgbImage::from_fn(32, 24, |x, y| {
            Rgb([(x * 8) as u8, (y * 10) as u8, 128])
        }));
        let probabilities =
            Array2::from_shape_fn((16, 16), |(y, x)| if x > y { 0.2 } else { 0.8 });

        let first = to_overlay(&original, probabilities.view());
        let second = to_overlay(&original, probabilities.view());
        assert_eq!(first, second);
    }

    #[test]
    fn test_probability_map_slicing() -> Result<()> {
        let mut batch = Array4::<f32>::ones((2, 3, 3, 1));
        batch[[1, 0, 2, 0]] = 0.25;

        let map = probability_map(&batch, 1)?;
        assert_eq!(map.dim(), (3, 3));
        assert_eq!(map[[0, 2]], 0.25);
        assert_eq!(glacier_pixel_count(map), 1);

        assert!(probability_map(&batch, 2).is_err());
        Ok(())
    }
}
