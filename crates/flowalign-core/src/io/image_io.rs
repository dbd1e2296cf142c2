use std::path::Path;

use image::{ImageFormat, Rgb};
use ndarray::Array4;

use crate::consts::COLOR_CHANNEL_COUNT;
use crate::error::Result;

/// Load an image file into a (1, 3, H, W) tensor with values in [0, 1].
/// 8-bit sources are widened before normalization.
pub fn load_image(path: &Path) -> Result<Array4<f32>> {
    let img = image::open(path)?;
    let rgb = img.to_rgb16();
    let (w, h) = rgb.dimensions();
    let mut data = Array4::<f32>::zeros((1, COLOR_CHANNEL_COUNT, h as usize, w as usize));

    for row in 0..h as usize {
        for col in 0..w as usize {
            let pixel = rgb.get_pixel(col as u32, row as u32);
            for channel in 0..COLOR_CHANNEL_COUNT {
                data[[0, channel, row, col]] = pixel.0[channel] as f32 / 65535.0;
            }
        }
    }

    Ok(data)
}

/// Save the first batch element of a (B, 3, H, W) tensor as 8-bit RGB PNG.
pub fn save_png(tensor: &Array4<f32>, path: &Path) -> Result<()> {
    let (_, channels, h, w) = tensor.dim();
    debug_assert_eq!(channels, COLOR_CHANNEL_COUNT);

    let mut img = image::RgbImage::new(w as u32, h as u32);
    for row in 0..h {
        for col in 0..w {
            let r = (tensor[[0, 0, row, col]].clamp(0.0, 1.0) * 255.0) as u8;
            let g = (tensor[[0, 1, row, col]].clamp(0.0, 1.0) * 255.0) as u8;
            let b = (tensor[[0, 2, row, col]].clamp(0.0, 1.0) * 255.0) as u8;
            img.put_pixel(col as u32, row as u32, Rgb([r, g, b]));
        }
    }

    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save the first batch element of a (B, 3, H, W) tensor as 16-bit RGB TIFF.
pub fn save_tiff(tensor: &Array4<f32>, path: &Path) -> Result<()> {
    let (_, channels, h, w) = tensor.dim();
    debug_assert_eq!(channels, COLOR_CHANNEL_COUNT);

    let mut pixels: Vec<u16> = Vec::with_capacity(h * w * COLOR_CHANNEL_COUNT);
    for row in 0..h {
        for col in 0..w {
            for channel in 0..COLOR_CHANNEL_COUNT {
                pixels.push((tensor[[0, channel, row, col]].clamp(0.0, 1.0) * 65535.0) as u16);
            }
        }
    }

    let img = image::ImageBuffer::<Rgb<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels)
        .expect("buffer size matches dimensions");
    img.save(path)?;
    Ok(())
}

/// Save a tensor, choosing the format from the file extension.
pub fn save_image(tensor: &Array4<f32>, path: &Path) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("tiff" | "tif") => save_tiff(tensor, path),
        _ => save_png(tensor, path),
    }
}
