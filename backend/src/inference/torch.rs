use std::path::Path;
use std::sync::Mutex;
use tch::{CModule, Device, Kind, Tensor};

use super::classifier::{Classifier, ClassifierError};
use super::provider::LoadError;
use crate::preprocess::{InputSize, NormalizedTensor};

/// TorchScript classifier taking NHWC float input and emitting one sigmoid
/// unit per batch element.
pub struct TorchClassifier {
    module: Mutex<CModule>,
    device: Device,
    input_size: InputSize,
}

impl TorchClassifier {
    pub fn load(path: &Path, input_size: InputSize) -> Result<Self, LoadError> {
        let device = Device::cuda_if_available();
        let mut module = CModule::load_on_device(path, device)
            .map_err(|e| LoadError::Backend(e.to_string()))?;
        module.set_eval();
        log::info!("TorchScript module loaded on {:?}", device);

        Ok(Self {
            module: Mutex::new(module),
            device,
            input_size,
        })
    }
}

impl Classifier for TorchClassifier {
    fn predict(&self, tensor: &NormalizedTensor) -> Result<f32, ClassifierError> {
        let shape: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
        if tensor.input_size() != self.input_size {
            log::warn!(
                "Tensor size {} differs from configured model input {}",
                tensor.input_size(),
                self.input_size
            );
        }

        let input = Tensor::f_from_slice(tensor.as_slice())
            .and_then(|t| t.f_view(shape.as_slice()))
            .map_err(|e| ClassifierError::Runtime(e.to_string()))?
            .to_device(self.device);

        let output = {
            let module = self.module.lock().map_err(|_| ClassifierError::Poisoned)?;
            tch::no_grad(|| module.forward_ts(&[input]))
                .map_err(|e| ClassifierError::Runtime(e.to_string()))?
        };

        let output_flat = output.to_kind(Kind::Float).view([-1]);
        if output_flat.size().first().copied().unwrap_or(0) == 0 {
            return Err(ClassifierError::EmptyOutput);
        }
        let score = output_flat
            .f_double_value(&[0])
            .map_err(|e| ClassifierError::Runtime(e.to_string()))?;
        Ok(score as f32)
    }
}
