//! Fakes and fixtures shared by the unit tests.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::Array4;
use std::io::Cursor;

use crate::model::{Classifier, ModelError};

/// Returns the same score vector for every input.
pub struct FixedScores(pub Vec<f32>);

impl Classifier for FixedScores {
    fn classify(&self, input: &Array4<f32>) -> Result<Vec<f32>, ModelError> {
        assert_eq!(input.shape(), &[1, 128, 128, 3]);
        Ok(self.0.clone())
    }
}

pub struct FailingClassifier;

impl Classifier for FailingClassifier {
    fn classify(&self, _input: &Array4<f32>) -> Result<Vec<f32>, ModelError> {
        Err(ModelError::Inference("device lost".to_string()))
    }
}

/// Panics inside the model call, as a crashed native backend would.
pub struct PanickingClassifier;

impl Classifier for PanickingClassifier {
    fn classify(&self, _input: &Array4<f32>) -> Result<Vec<f32>, ModelError> {
        panic!("native backend aborted");
    }
}

pub fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("encode test image");
    bytes
}

pub fn solid_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb(color));
    encode(DynamicImage::ImageRgb8(image), ImageFormat::Png)
}
