use std::sync::{Arc, Mutex};

use shared::{HealthClass, Prediction};
use tch::{CModule, Device, Kind, Tensor};
use thiserror::Error;

use crate::classifier::preprocess::{INPUT_SIZE, preprocess};

#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("Failed to load model weights from {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: tch::TchError,
    },
    #[error("Model verification forward pass failed: {0}")]
    Probe(#[source] tch::TchError),
    #[error("Model emits {got} outputs, expected {expected}")]
    HeadShape { got: i64, expected: i64 },
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Model forward pass failed: {0}")]
    Forward(#[from] tch::TchError),
    #[error("Model returned {0} class probabilities, expected {1}")]
    OutputShape(usize, usize),
}

#[derive(Clone)]
pub struct Classifier {
    model: Arc<Mutex<CModule>>,
    device: Device,
}

impl Classifier {
    /// Loads the TorchScript artifact and probes it with one zero-tensor
    /// forward pass. The artifact must emit exactly 3 logits.
    pub fn load(model_path: &str) -> Result<Self, ModelLoadError> {
        let device = Device::cuda_if_available();
        let model =
            CModule::load_on_device(model_path, device).map_err(|e| ModelLoadError::Load {
                path: model_path.to_string(),
                source: e,
            })?;

        let probe = Tensor::zeros(
            [1, 3, INPUT_SIZE as i64, INPUT_SIZE as i64],
            (Kind::Float, device),
        );
        let logits = tch::no_grad(|| model.forward_ts(&[&probe])).map_err(ModelLoadError::Probe)?;
        let emitted = logits.size().iter().product::<i64>();
        let expected = HealthClass::ALL.len() as i64;
        if emitted != expected {
            return Err(ModelLoadError::HeadShape {
                got: emitted,
                expected,
            });
        }

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            device,
        })
    }

    pub fn predict(&self, image: &[u8]) -> Result<Prediction, InferenceError> {
        let input = preprocess(image)?.to_device(self.device);
        let output = {
            let model = self.model.lock().unwrap();
            tch::no_grad(|| model.forward_ts(&[&input]))?
        };

        let probabilities = output.softmax(-1, Kind::Float).view([-1]);
        let count = probabilities.size()[0] as usize;
        let mut confidences = vec![0.0f32; count];
        probabilities.copy_data(&mut confidences, count);

        postprocess(&confidences)
    }
}

/// Resolves softmax confidences to a label. Ties go to the earliest class.
pub fn postprocess(confidences: &[f32]) -> Result<Prediction, InferenceError> {
    if confidences.len() != HealthClass::ALL.len() {
        return Err(InferenceError::OutputShape(
            confidences.len(),
            HealthClass::ALL.len(),
        ));
    }

    let mut best = 0;
    for (idx, &probability) in confidences.iter().enumerate() {
        if probability > confidences[best] {
            best = idx;
        }
    }

    Ok(Prediction {
        label: HealthClass::ALL[best],
        confidence: confidences[best],
        all_confidences: [confidences[0], confidences[1], confidences[2]],
    })
}
