use std::path::Path;

use image::{imageops, imageops::FilterType, DynamicImage};
use ndarray::prelude::*;
use nshare::AsNdarray3;

use crate::errors::{GlacierSegError, Result};

/// Resampling filter shared by the model input and the overlay background.
pub const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

pub fn load_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|source| GlacierSegError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })
}

/// Resize to `size`x`size` RGB and scale to `[0, 1]`, laid out as `(H, W, 3)`.
pub fn to_canonical(image: &DynamicImage, size: u32) -> Array3<f32> {
    let rgb = imageops::resize(&image.to_rgb8(), size, size, RESIZE_FILTER);
    // nshare views the buffer channel-first
    rgb.as_ndarray3()
        .permuted_axes([1, 2, 0])
        .mapv(|v| f32::from(v) / 255.0)
}

/// Stack canonical images along a new leading batch axis.
pub fn stack_batch(images: &[ArrayView3<f32>]) -> Result<Array4<f32>> {
    Ok(ndarray::stack(Axis(0), images)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn test_canonical_shape_and_range() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 200, Rgb([255, 0, 51])));
        let canonical = to_canonical(&image, 64);

        assert_eq!(canonical.shape(), &[64, 64, 3]);
        assert!(canonical.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!((canonical[[10, 10, 0]] - 1.0).abs() < 1e-6);
        assert!(canonical[[10, 10, 1]].abs() < 1e-6);
        assert!((canonical[[10, 10, 2]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_canonical_keeps_pixel_orientation() {
        let mut rgb = RgbImage::new(4, 4);
        rgb.put_pixel(3, 0, Rgb([255, 255, 255]));
        let canonical = to_canonical(&DynamicImage::ImageRgb8(rgb), 4);

        // row 0, column 3
        assert!((canonical[[0, 3, 0]] - 1.0).abs() < 1e-6);
        assert!(canonical[[3, 0, 0]].abs() < 1e-6);
    }

    #[test]
    fn test_alpha_channel_dropped() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 255, 0, 10])));
        let canonical = to_canonical(&image, 8);
        assert_eq!(canonical.shape(), &[8, 8, 3]);
        assert!((canonical[[0, 0, 1]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_stack_batch_preserves_order() -> Result<()> {
        let first = Array3::<f32>::zeros((4, 4, 3));
        let second = Array3::<f32>::ones((4, 4, 3));
        let batch = stack_batch(&[first.view(), second.view()])?;

        assert_eq!(batch.shape(), &[2, 4, 4, 3]);
        assert_eq!(batch[[0, 1, 1, 0]], 0.0);
        assert_eq!(batch[[1, 1, 1, 0]], 1.0);
        Ok(())
    }

    #[test]
    fn test_load_image_reports_decode_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();

        let err = load_image(&path).unwrap_err();
        assert!(matches!(err, GlacierSegError::ImageDecode { .. }));
        assert!(err.is_skippable());
    }
}
