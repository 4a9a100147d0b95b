use std::path::Path;

use ndarray::prelude::*;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
};
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    errors::{GlacierSegError, Result},
    traits::SegmentationModel,
};

/// Side length of the square input the glacier model was exported with.
pub const MODEL_IMAGE_SIZE: u32 = 512;

/// ONNX Runtime backed glacier segmentation model.
pub struct Model {
    pub image_size: u32,
    input_name: String,
    output_name: String,
    session: Mutex<Session>,
}

impl Model {
    /// Load the model and warm it up with an all-zero batch.
    ///
    /// TensorRT and CUDA are registered for `device_id`; ort falls back to the CPU provider
    /// when neither is available.
    pub fn new(model_path: &Path, device_id: i32) -> Result<Self> {
        let session = SessionBuilder::new()
            .map_err(|e| GlacierSegError::Model {
                operation: "session builder init".to_string(),
                source: Box::new(e),
            })?
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ])
            .map_err(|e| GlacierSegError::Model {
                operation: "execution provider registration".to_string(),
                source: Box::new(e),
            })?
            .with_memory_pattern(true)
            .map_err(|e| GlacierSegError::Model {
                operation: "memory pattern setup".to_string(),
                source: Box::new(e),
            })?
            .commit_from_file(model_path)
            .map_err(|e| GlacierSegError::Model {
                operation: format!("model load: {}", model_path.display()),
                source: Box::new(e),
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| GlacierSegError::model("model input lookup", "model has no inputs"))?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| GlacierSegError::model("model output lookup", "model has no outputs"))?;
        debug!(%input_name, %output_name, "model loaded");

        let model = Self {
            image_size: MODEL_IMAGE_SIZE,
            input_name,
            output_name,
            session: Mutex::new(session),
        };

        // initialize model
        let size = MODEL_IMAGE_SIZE as usize;
        let warmup = Array4::<f32>::zeros((1, size, size, 3));
        model.run(warmup.view())?;

        Ok(model)
    }

    fn run(&self, batch: ArrayView4<f32>) -> Result<Array4<f32>> {
        let mut binding = self.session.lock();
        let outputs = binding.run(ort::inputs![
            self.input_name.as_str() => TensorRef::from_array_view(&batch.as_standard_layout())?
        ])?;
        let output = outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix4>()?
            .to_owned();

        let (items, height, width, _) = batch.dim();
        if output.shape() != [items, height, width, 1] {
            return Err(GlacierSegError::model(
                "output shape check",
                format!(
                    "expected [{items}, {height}, {width}, 1], got {:?}",
                    output.shape()
                ),
            ));
        }
        Ok(output)
    }
}

impl SegmentationModel for Model {
    fn image_size(&self) -> u32 {
        self.image_size
    }

    fn predict(&self, batch: ArrayView4<f32>) -> Result<Array4<f32>> {
        self.run(batch)
    }
}
