use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};

const EDGE_ENHANCE_MORE: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0];
const SHARPEN: [f32; 9] = [-2.0, -2.0, -2.0, -2.0, 32.0, -2.0, -2.0, -2.0, -2.0];
const THAI_UPSCALE: u32 = 3;
const THAI_THRESHOLD: u8 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreprocessProfile {
    /// Grayscale, contrast, sharpen, denoise, brighten.
    Standard,
    /// Thai vowels and tone marks are thin strokes: upscale and binarise before
    /// edge enhancement.
    Thai,
}

impl PreprocessProfile {
    pub fn for_languages(thai: bool) -> Self {
        if thai {
            Self::Thai
        } else {
            Self::Standard
        }
    }
}

pub fn preprocess(image: &DynamicImage, profile: PreprocessProfile) -> GrayImage {
    let gray = image.to_luma8();
    match profile {
        PreprocessProfile::Thai => {
            let (width, height) = gray.dimensions();
            let upscaled = imageops::resize(
                &gray,
                width * THAI_UPSCALE,
                height * THAI_UPSCALE,
                FilterType::Lanczos3,
            );
            let contrasted = imageops::contrast(&upscaled, contrast_percent(2.5));
            let binary = threshold(&contrasted, THAI_THRESHOLD);
            filter_keeping_border(&binary, &EDGE_ENHANCE_MORE)
        }
        PreprocessProfile::Standard => {
            let contrasted = imageops::contrast(&gray, contrast_percent(2.0));
            let sharpened = filter_keeping_border(&contrasted, &SHARPEN);
            let denoised = median3x3(&sharpened);
            brighten(&denoised, 1.2)
        }
    }
}

/// `imageops::contrast` takes a percentage that is squared internally; this
/// converts a plain multiplication factor.
fn contrast_percent(factor: f32) -> f32 {
    (factor.sqrt() - 1.0) * 100.0
}

fn threshold(image: &GrayImage, cutoff: u8) -> GrayImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = if pixel.0[0] < cutoff { 0 } else { 255 };
    }
    out
}

fn brighten(image: &GrayImage, factor: f32) -> GrayImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = (pixel.0[0] as f32 * factor).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// `imageops::filter3x3` leaves the one-pixel border black; copy it from the
/// source instead.
fn filter_keeping_border(image: &GrayImage, kernel: &[f32; 9]) -> GrayImage {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return image.clone();
    }

    let mut out: GrayImage = imageops::filter3x3(image, kernel);
    for x in 0..width {
        out.put_pixel(x, 0, *image.get_pixel(x, 0));
        out.put_pixel(x, height - 1, *image.get_pixel(x, height - 1));
    }
    for y in 0..height {
        out.put_pixel(0, y, *image.get_pixel(0, y));
        out.put_pixel(width - 1, y, *image.get_pixel(width - 1, y));
    }
    out
}

fn median3x3(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut out = image.clone();
    if width < 3 || height < 3 {
        return out;
    }

    let mut window = [0u8; 9];
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut slot = 0;
            for dy in 0..3 {
                for dx in 0..3 {
                    window[slot] = image.get_pixel(x + dx - 1, y + dy - 1).0[0];
                    slot += 1;
                }
            }
            window.sort_unstable();
            out.put_pixel(x, y, Luma([window[4]]));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn sample_page() -> DynamicImage {
        let mut page = RgbImage::from_pixel(12, 8, image::Rgb([240, 240, 240]));
        for x in 3..9 {
            page.put_pixel(x, 4, image::Rgb([20, 20, 20]));
        }
        DynamicImage::ImageRgb8(page)
    }

    #[test]
    fn thai_profile_upscales_and_binarises() {
        let out = preprocess(&sample_page(), PreprocessProfile::Thai);
        assert_eq!(out.dimensions(), (36, 24));
        assert!(out.pixels().all(|pixel| pixel.0[0] == 0 || pixel.0[0] == 255));
        assert!(out.pixels().any(|pixel| pixel.0[0] == 0));
    }

    #[test]
    fn standard_profile_keeps_dimensions() {
        let out = preprocess(&sample_page(), PreprocessProfile::Standard);
        assert_eq!(out.dimensions(), (12, 8));
    }

    #[test]
    fn tiny_images_do_not_panic() {
        let tiny = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([128])));
        assert_eq!(preprocess(&tiny, PreprocessProfile::Standard).dimensions(), (2, 2));
        assert_eq!(preprocess(&tiny, PreprocessProfile::Thai).dimensions(), (6, 6));
    }

    #[test]
    fn median_removes_salt_noise() {
        let mut image = GrayImage::from_pixel(5, 5, Luma([10]));
        image.put_pixel(2, 2, Luma([255]));
        assert_eq!(median3x3(&image).get_pixel(2, 2).0[0], 10);
    }

    #[test]
    fn contrast_factor_maps_to_percent() {
        assert!(contrast_percent(1.0).abs() < 1e-6);
        assert!((contrast_percent(4.0) - 100.0).abs() < 1e-4);
    }
}
