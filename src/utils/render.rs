use std::path::Path;

use anyhow::{Context, Result};
use image::GrayImage;
use ndarray::Array2;
use rayon::prelude::*;

use crate::model::Origin;

/// Maps `v` into `0..=255` between the contrast limits. Non-finite pixels are black.
#[inline]
pub fn scale_to_byte(v: f32, vmin: f64, vmax: f64) -> u8 {
    if !v.is_finite() {
        return 0;
    }
    let range = (vmax - vmin).max(1e-30);
    (((v as f64 - vmin) / range) * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Writes the contrast-stretched image alone as an 8-bit grayscale PNG.
pub fn render_scaled(data: &Array2<f32>, lims: (f64, f64), origin: Origin, path: &Path) -> Result<()> {
    let (rows, cols) = data.dim();
    let (vmin, vmax) = lims;

    let bytes: Vec<u8> = (0..rows * cols)
        .into_par_iter()
        .map(|i| {
            let (out_row, col) = (i / cols, i % cols);
            // Images are stored top row first; lower origin puts data row 0 at the bottom.
            let row = match origin {
                Origin::Lower => rows - 1 - out_row,
                Origin::Upper => out_row,
            };
            scale_to_byte(data[[row, col]], vmin, vmax)
        })
        .collect();

    let img = GrayImage::from_raw(cols as u32, rows as u32, bytes)
        .context("Pixel buffer does not match image size")?;
    img.save(path)
        .with_context(|| format!("Failed to save grayscale image to {:?}", path))?;
    log::info!("wrote {}x{} scaled image to {:?}", cols, rows, path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_scale_to_byte_clips() {
        assert_eq!(scale_to_byte(-5.0, 0.0, 10.0), 0);
        assert_eq!(scale_to_byte(10.0, 0.0, 10.0), 255);
        assert_eq!(scale_to_byte(50.0, 0.0, 10.0), 255);
        assert_eq!(scale_to_byte(f32::NAN, 0.0, 10.0), 0);
    }

    #[test]
    fn test_render_scaled_flips_lower_origin() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("stretched.png");
        let data = Array2::from_shape_vec((2, 2), vec![0.0f32, 0.0, 10.0, 10.0]).unwrap();

        render_scaled(&data, (0.0, 10.0), Origin::Lower, &path).unwrap();

        let img = image::open(&path).unwrap().to_luma8();
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(0, 0), &Luma([255u8]));
        assert_eq!(img.get_pixel(0, 1), &Luma([0u8]));
    }
}
