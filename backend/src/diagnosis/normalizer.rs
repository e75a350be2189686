use image::imageops::{self, FilterType};
use ndarray::Array4;

use super::DiagnosisError;

/// Side length the classifier was trained on.
pub const INPUT_SIZE: u32 = 128;
pub const CHANNELS: usize = 3;

pub fn input_shape() -> (usize, usize, usize, usize) {
    (1, INPUT_SIZE as usize, INPUT_SIZE as usize, CHANNELS)
}

/// Decodes raw upload bytes into a `[1, 128, 128, 3]` NHWC batch scaled to `[0, 1]`.
///
/// Any colour mode is flattened to 8-bit RGB (alpha is dropped, not composited)
/// and the image is stretched to the input size without keeping aspect ratio.
pub fn normalize(raw: &[u8]) -> Result<Array4<f32>, DiagnosisError> {
    let rgb = image::load_from_memory(raw)?.to_rgb8();
    let resized = imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom);

    Ok(Array4::from_shape_fn(input_shape(), |(_, y, x, c)| {
        f32::from(resized.get_pixel(x as u32, y as u32).0[c]) / 255.0
    }))
}
