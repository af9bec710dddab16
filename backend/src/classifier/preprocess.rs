use image::imageops::FilterType;
use tch::Tensor;

use crate::classifier::model::InferenceError;

pub const INPUT_SIZE: u32 = 224;

const CHANNEL_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const CHANNEL_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Decodes an uploaded image and builds the `1x3x224x224` input tensor.
///
/// Mirrors the transform the network was trained with: RGB conversion,
/// bilinear resize to 224x224, scale to `[0, 1]`, then per-channel
/// ImageNet normalization.
pub fn preprocess(image_data: &[u8]) -> Result<Tensor, InferenceError> {
    let decoded = image::load_from_memory(image_data)?;
    let resized = image::imageops::resize(
        &decoded.to_rgb8(),
        INPUT_SIZE,
        INPUT_SIZE,
        FilterType::Triangle,
    );

    let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
    let mut chw = vec![0.0f32; 3 * plane];
    for (idx, pixel) in resized.pixels().enumerate() {
        for channel in 0..3 {
            chw[channel * plane + idx] = (f32::from(pixel.0[channel]) / 255.0
                - CHANNEL_MEAN[channel])
                / CHANNEL_STD[channel];
        }
    }

    Ok(Tensor::from_slice(&chw).view([1, 3, INPUT_SIZE as i64, INPUT_SIZE as i64]))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgb, RgbImage};

    use super::*;

    fn encode_png(image: &RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn preprocess_emits_fixed_shape() {
        let bytes = encode_png(&RgbImage::from_pixel(50, 75, Rgb([10, 200, 30])));
        let tensor = preprocess(&bytes).unwrap();
        assert_eq!(tensor.size(), vec![1, 3, 224, 224]);
    }

    #[test]
    fn preprocess_applies_channel_normalization() {
        // A solid-color image survives the bilinear resize unchanged, so
        // every position must hold the normalized channel value.
        let bytes = encode_png(&RgbImage::from_pixel(32, 32, Rgb([255, 0, 128])));
        let tensor = preprocess(&bytes).unwrap();
        let raw = [255.0f64, 0.0, 128.0];
        for channel in 0..3 {
            let expected = (raw[channel] / 255.0 - CHANNEL_MEAN[channel] as f64)
                / CHANNEL_STD[channel] as f64;
            let got = tensor.double_value(&[0, channel as i64, 112, 112]);
            assert!(
                (got - expected).abs() < 1e-4,
                "channel {channel}: got {got}, expected {expected}"
            );
        }
    }

    #[test]
    fn undecodable_bytes_are_an_inference_error() {
        let err = preprocess(b"not an image").unwrap_err();
        assert!(matches!(err, InferenceError::Decode(_)));
    }
}
