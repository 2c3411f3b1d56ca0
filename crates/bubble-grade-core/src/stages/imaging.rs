//! Grayscale conversion and luminance statistics.

use image::{DynamicImage, GrayImage, Luma};

/// Luma of an RGB triple using the standard `0.299 R + 0.587 G + 0.114 B` weights.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.114f32.mul_add(
        f32::from(b),
        0.299f32.mul_add(f32::from(r), 0.587 * f32::from(g)),
    );
    y.round().clamp(0.0, 255.0) as u8
}

/// Converts any decoded image to a flat gray buffer.
#[must_use]
pub fn to_gray(image: &DynamicImage) -> GrayImage {
    let rgba = image.to_rgba8();
    GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, _] = rgba.get_pixel(x, y).0;
        Luma([luma(r, g, b)])
    })
}

/// 256-bin histogram of luminance values.
#[derive(Debug, Clone)]
pub struct Histogram {
    bins: [u64; 256],
    total: u64,
}

impl Histogram {
    /// Counts every pixel of a gray buffer.
    #[must_use]
    pub fn from_luma(image: &GrayImage) -> Self {
        let mut bins = [0u64; 256];
        for pixel in image.pixels() {
            bins[usize::from(pixel.0[0])] += 1;
        }
        let total = bins.iter().sum();
        Self { bins, total }
    }

    /// Mean luminance, 0 for an empty image.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let sum: u64 = self
            .bins
            .iter()
            .enumerate()
            .map(|(i, &count)| (i as u64) * count)
            .sum();
        sum as f64 / self.total as f64
    }

    /// Count pixels strictly below a level.
    #[must_use]
    pub fn count_below(&self, level: u8) -> u64 {
        self.bins[..usize::from(level)].iter().sum()
    }

    /// Fraction of pixels strictly below a level.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn fraction_below(&self, level: u8) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count_below(level) as f64 / self.total as f64
    }
}

#[cfg(test)]
#[allow(clippy::cast_possible_truncation)]
mod tests {
    use super::*;

    #[test]
    fn test_luma_weights() {
        assert_eq!(luma(0, 0, 0), 0);
        assert_eq!(luma(255, 255, 255), 255);
        assert_eq!(luma(255, 0, 0), 76);
        assert_eq!(luma(0, 255, 0), 150);
        assert_eq!(luma(0, 0, 255), 29);
    }

    #[test]
    fn test_to_gray_uses_standard_weights() {
        let rgb = image::RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([0, 0, 255])
            }
        });
        let gray = to_gray(&DynamicImage::ImageRgb8(rgb));
        assert_eq!(gray.get_pixel(0, 0).0[0], 76);
        assert_eq!(gray.get_pixel(1, 0).0[0], 29);
    }

    #[test]
    fn test_histogram_from_uniform() {
        let img = GrayImage::from_fn(256, 1, |x, _| Luma([x as u8]));
        let hist = Histogram::from_luma(&img);
        assert_eq!(hist.total, 256);
        assert!(hist.bins.iter().all(|&count| count == 1));
        assert_eq!(hist.count_below(128), 128);
    }

    #[test]
    fn test_histogram_mean() {
        let img = GrayImage::from_fn(100, 100, |_, _| Luma([128u8]));
        let mean = Histogram::from_luma(&img).mean();
        assert!((mean - 128.0).abs() < 0.001, "mean should be 128, got {mean}");
    }

    #[test]
    fn test_fraction_below_is_strict() {
        let img = GrayImage::from_fn(4, 1, |x, _| Luma([[0u8, 79, 80, 255][x as usize]]));
        let hist = Histogram::from_luma(&img);
        assert_eq!(hist.count_below(80), 2);
        assert!((hist.fraction_below(80) - 0.5).abs() < f64::EPSILON);
        assert_eq!(hist.count_below(0), 0);
    }

    #[test]
    fn test_empty_histogram() {
        let hist = Histogram::from_luma(&GrayImage::new(0, 0));
        assert_eq!(hist.count_below(255), 0);
        assert!(hist.mean().abs() < f64::EPSILON);
        assert!(hist.fraction_below(128).abs() < f64::EPSILON);
    }
}
