use ndarray::Array4;
use std::sync::Mutex;
use tch::{CModule, Device, Kind, Tensor};

use super::{Classifier, ModelError, softmax};
use crate::config::{InputLayout, ModelConfig};

/// TorchScript export of the trained leaf classifier.
pub struct TorchClassifier {
    module: Mutex<CModule>,
    device: Device,
    layout: InputLayout,
    apply_softmax: bool,
}

impl TorchClassifier {
    pub fn load(config: &ModelConfig) -> Result<Self, ModelError> {
        if !config.path.exists() {
            return Err(ModelError::NotFound(config.path.clone()));
        }

        let device = Device::cuda_if_available();
        let mut module = CModule::load_on_device(&config.path, device)?;
        module.set_eval();
        log::info!(
            "Loaded TorchScript model {} on {:?} ({:?} input)",
            config.path.display(),
            device,
            config.input_layout
        );

        Ok(Self {
            module: Mutex::new(module),
            device,
            layout: config.input_layout,
            apply_softmax: config.apply_softmax,
        })
    }
}

/// Copies a normalized NHWC batch onto `device`, permuted to NCHW if asked.
fn to_tensor(
    input: &Array4<f32>,
    layout: InputLayout,
    device: Device,
) -> Result<Tensor, ModelError> {
    let shape: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
    let contiguous = input.as_standard_layout();
    let data = contiguous
        .as_slice()
        .ok_or_else(|| ModelError::Inference("input tensor is not contiguous".to_string()))?;

    let tensor = Tensor::from_slice(data)
        .view(shape.as_slice())
        .to_device(device);
    Ok(match layout {
        InputLayout::Nhwc => tensor,
        InputLayout::Nchw => tensor.permute([0, 3, 1, 2]).contiguous(),
    })
}

impl Classifier for TorchClassifier {
    fn classify(&self, input: &Array4<f32>) -> Result<Vec<f32>, ModelError> {
        let tensor = to_tensor(input, self.layout, self.device)?;
        let output = {
            let module = self
                .module
                .lock()
                .map_err(|_| ModelError::Inference("model lock poisoned".to_string()))?;
            tch::no_grad(|| module.forward_ts(&[tensor]))?
        };

        let output_flat = output
            .to_kind(Kind::Float)
            .to_device(Device::Cpu)
            .view([-1]);
        let num_elements = output_flat.size()[0] as usize;
        let mut scores = vec![0.0f32; num_elements];
        output_flat.copy_data(&mut scores, num_elements);

        if self.apply_softmax {
            Ok(softmax(&scores))
        } else {
            Ok(scores)
        }
    }
}
