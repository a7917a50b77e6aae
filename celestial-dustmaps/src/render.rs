//! Conversion of reddening grids to 8-bit grayscale images.
//!
//! Values are scaled linearly from `[vmin, vmax]` onto `0..=254` and written
//! as PNG. PNG output needs the `png` feature (on by default); without it the
//! encoding functions return [`DustMapError::ImageSupportMissing`].

use crate::{DustMapError, DustMapResult};
use ndarray::{s, Array2};
use std::path::Path;

/// Top of the output range. Just below 255 so that `vmax` lands on 254.
const GRAY_SCALE: f64 = 254.99;

/// Linear display range for reddening values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    pub vmin: f64,
    pub vmax: f64,
}

impl ColorScale {
    pub fn new(vmin: f64, vmax: f64) -> DustMapResult<Self> {
        if !vmin.is_finite() || !vmax.is_finite() || vmax <= vmin {
            return Err(DustMapError::invalid_query(format!(
                "Color scale needs finite vmin < vmax, got [{}, {}]",
                vmin, vmax
            )));
        }
        Ok(Self { vmin, vmax })
    }

    /// Maps one value to a gray level. NaN maps to 0.
    pub fn gray(&self, value: f64) -> u8 {
        if value.is_nan() {
            return 0;
        }
        let x = ((value - self.vmin) / (self.vmax - self.vmin)).clamp(0.0, 1.0);
        (GRAY_SCALE * x) as u8
    }
}

impl Default for ColorScale {
    fn default() -> Self {
        Self {
            vmin: 0.0,
            vmax: 1.5,
        }
    }
}

/// Scales `values` into gray levels with [`ColorScale::gray`].
pub fn normalize(values: &Array2<f64>, vmin: f64, vmax: f64) -> DustMapResult<Array2<u8>> {
    let scale = ColorScale::new(vmin, vmax)?;
    Ok(values.mapv(|v| scale.gray(v)))
}

/// Reverses both axes, so the last row comes first and each row runs
/// right to left.
pub fn flip_both<T: Clone>(values: &Array2<T>) -> Array2<T> {
    values.slice(s![..;-1, ..;-1]).to_owned()
}

#[cfg(feature = "png")]
fn to_gray_image(pixels: &Array2<u8>) -> DustMapResult<image::GrayImage> {
    let (rows, cols) = pixels.dim();
    let raw: Vec<u8> = pixels.iter().copied().collect();
    image::GrayImage::from_raw(cols as u32, rows as u32, raw).ok_or_else(|| {
        DustMapError::ImageEncoding {
            message: format!("buffer does not match {}x{} image", cols, rows),
        }
    })
}

/// Encodes the pixels as an in-memory PNG (width = columns, height = rows).
#[cfg(feature = "png")]
pub fn encode_png(pixels: &Array2<u8>) -> DustMapResult<Vec<u8>> {
    let img = to_gray_image(pixels)?;
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Writes the pixels to `path` as a grayscale PNG.
#[cfg(feature = "png")]
pub fn save_png(pixels: &Array2<u8>, path: &Path) -> DustMapResult<()> {
    let img = to_gray_image(pixels)?;
    img.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn encode_png(_pixels: &Array2<u8>) -> DustMapResult<Vec<u8>> {
    Err(DustMapError::ImageSupportMissing)
}

#[cfg(not(feature = "png"))]
pub fn save_png(_pixels: &Array2<u8>, _path: &Path) -> DustMapResult<()> {
    Err(DustMapError::ImageSupportMissing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_gray_levels() {
        let scale = ColorScale::default();
        assert_eq!(scale.gray(0.0), 0);
        assert_eq!(scale.gray(1.5), 254);
        assert_eq!(scale.gray(0.75), 127);
        assert_eq!(scale.gray(-3.0), 0);
        assert_eq!(scale.gray(40.0), 254);
        assert_eq!(scale.gray(f64::NAN), 0);
    }

    #[test]
    fn test_scale_validation() {
        assert!(ColorScale::new(1.0, 1.0).is_err());
        assert!(ColorScale::new(2.0, 1.0).is_err());
        assert!(ColorScale::new(0.0, f64::INFINITY).is_err());
        assert!(normalize(&array![[0.0]], 1.0, 0.5).is_err());
    }

    #[test]
    fn test_normalize_grid() {
        let values = array![[0.0, 0.5], [1.0, 2.0]];
        let gray = normalize(&values, 0.0, 1.0).unwrap();
        assert_eq!(gray, array![[0u8, 127], [254, 254]]);
    }

    #[test]
    fn test_flip_both() {
        let values = array![[1, 2, 3], [4, 5, 6]];
        assert_eq!(flip_both(&values), array![[6, 5, 4], [3, 2, 1]]);
    }

    #[cfg(feature = "png")]
    #[test]
    fn test_encode_png_dimensions() {
        let pixels = Array2::from_shape_fn((37, 73), |(r, c)| ((r + c) % 255) as u8);
        let bytes = encode_png(&pixels).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&bytes).unwrap().to_luma8();
        assert_eq!(decoded.dimensions(), (73, 37));
        assert_eq!(decoded.get_pixel(5, 2).0[0], 7);
    }

    #[cfg(feature = "png")]
    #[test]
    fn test_save_png_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flipped.png");
        let pixels = flip_both(&array![[0u8, 10], [20, 30]]);
        save_png(&pixels, &path).unwrap();

        let decoded = image::open(&path).unwrap().to_luma8();
        assert_eq!(decoded.get_pixel(0, 0).0[0], 30);
        assert_eq!(decoded.get_pixel(1, 1).0[0], 0);
    }

    #[cfg(not(feature = "png"))]
    #[test]
    fn test_png_requires_feature() {
        let err = encode_png(&array![[0u8]]).unwrap_err();
        assert!(matches!(err, DustMapError::ImageSupportMissing));
    }
}
