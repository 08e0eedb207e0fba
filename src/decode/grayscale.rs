//! NTSC-weighted grayscale conversion.
//!
//! `Y = 0.299 R + 0.587 G + 0.114 B`, rounded half up and clamped to
//! `[0, 255]`. The weights are applied in fixed point (thousandths), which
//! is the exact decimal value of the formula, so every pixel matches the
//! reference definition bit for bit. Alpha passes through untouched.

use image::RgbaImage;

const WEIGHT_R: u32 = 299;
const WEIGHT_G: u32 = 587;
const WEIGHT_B: u32 = 114;
const SCALE: u32 = 1000;

/// Luminance of a single pixel.
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let sum = WEIGHT_R * r as u32 + WEIGHT_G * g as u32 + WEIGHT_B * b as u32;
    ((sum + SCALE / 2) / SCALE).min(255) as u8
}

/// Converts an RGBA image to grayscale, keeping it RGBA.
///
/// Each output pixel is `(Y, Y, Y, A)`. Rows are processed as contiguous
/// slices.
pub fn to_grayscale(src: &RgbaImage) -> RgbaImage {
    let (width, height) = src.dimensions();
    let mut out = RgbaImage::new(width, height);
    let stride = width as usize * 4;
    if stride == 0 {
        return out;
    }
    for (src_row, dst_row) in src
        .as_raw()
        .chunks_exact(stride)
        .zip(out.chunks_exact_mut(stride))
    {
        convert_row(src_row, dst_row);
    }
    out
}

fn convert_row(src: &[u8], dst: &mut [u8]) {
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let y = luminance(s[0], s[1], s[2]);
        d[0] = y;
        d[1] = y;
        d[2] = y;
        d[3] = s[3];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use proptest::prelude::*;

    #[test]
    fn test_reference_values() {
        assert_eq!(luminance(0, 0, 0), 0);
        assert_eq!(luminance(255, 255, 255), 255);
        assert_eq!(luminance(255, 0, 0), 76);
        assert_eq!(luminance(0, 255, 0), 150);
        assert_eq!(luminance(0, 0, 255), 29);
        // 0.299*20 + 0.587*178 + 0.114*10 = 111.606
        assert_eq!(luminance(20, 178, 10), 112);
        // 0.299*255 + 0.587*250 + 0.114*205 = 246.365
        assert_eq!(luminance(255, 250, 205), 246);
    }

    #[test]
    fn test_rounds_to_nearest() {
        // 2.99 + 2.935 = 5.925
        assert_eq!(luminance(10, 5, 0), 6);
        // 0.587 + 0.912 = 1.499
        assert_eq!(luminance(0, 1, 8), 1);
        // 0.598 + 0.912 = 1.51
        assert_eq!(luminance(2, 0, 8), 2);
    }

    #[test]
    fn test_alpha_preserved() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 10]));
        img.put_pixel(1, 0, Rgba([0, 0, 255, 0]));

        let gray = to_grayscale(&img);
        assert_eq!(gray.get_pixel(0, 0), &Rgba([76, 76, 76, 10]));
        assert_eq!(gray.get_pixel(1, 0), &Rgba([29, 29, 29, 0]));
    }

    #[test]
    fn test_empty_image() {
        let gray = to_grayscale(&RgbaImage::new(0, 5));
        assert_eq!(gray.dimensions(), (0, 5));
    }

    proptest! {
        #[test]
        fn prop_matches_exact_formula(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
            // Exact rational reference: Y*1000 = 299R + 587G + 114B.
            let exact = 299 * r as i64 + 587 * g as i64 + 114 * b as i64;
            let y = luminance(r, g, b) as i64;
            prop_assert!(y * 1000 - 500 <= exact);
            prop_assert!(exact < y * 1000 + 500);
        }

        #[test]
        fn prop_image_matches_pixel_formula(
            pixels in prop::collection::vec(any::<[u8; 4]>(), 1..64),
            width in 1u32..8,
        ) {
            let height = (pixels.len() as u32 / width).max(1);
            let mut img = RgbaImage::new(width, height);
            for (i, px) in img.pixels_mut().enumerate() {
                *px = Rgba(pixels[i % pixels.len()]);
            }

            let gray = to_grayscale(&img);
            for (src, dst) in img.pixels().zip(gray.pixels()) {
                let y = luminance(src[0], src[1], src[2]);
                prop_assert_eq!(dst, &Rgba([y, y, y, src[3]]));
            }
        }
    }
}
