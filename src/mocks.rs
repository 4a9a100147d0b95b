use crate::errors::Result;
use crate::traits::SegmentationModel;
use ndarray::prelude::*;

/// Deterministic stand-in for the ONNX model.
#[derive(Debug, Clone)]
pub enum MockSegmentationModel {
    /// Every pixel gets the same probability.
    Constant { image_size: u32, probability: f32 },
    /// The probability is the red channel of the input pixel, so black is glacier and
    /// white is background.
    RedChannel { image_size: u32 },
}

impl MockSegmentationModel {
    pub const fn constant(image_size: u32, probability: f32) -> Self {
        Self::Constant {
            image_size,
            probability,
        }
    }

    pub const fn red_channel(image_size: u32) -> Self {
        Self::RedChannel { image_size }
    }
}

impl SegmentationModel for MockSegmentationModel {
    fn image_size(&self) -> u32 {
        match self {
            Self::Constant { image_size, .. } | Self::RedChannel { image_size } => *image_size,
        }
    }

    fn predict(&self, batch: ArrayView4<f32>) -> Result<Array4<f32>> {
        let (items, height, width, _) = batch.dim();
        let output = match self {
            Self::Constant { probability, .. } => {
                Array4::<f32>::from_elem((items, height, width, 1), *probability)
            }
            Self::RedChannel { .. } => batch.slice(s![.., .., .., 0..1]).to_owned(),
        };
        Ok(output)
    }
}
