use crate::errors::Result;
use ndarray::prelude::*;

/// Glacier segmentation model abstraction.
///
/// The pipeline only depends on this trait, so the ONNX Runtime session can be swapped for
/// any other backend, or a deterministic stub in tests.
pub trait SegmentationModel: Send + Sync {
    /// Side length of the square input the model expects.
    fn image_size(&self) -> u32;

    /// Batched forward pass.
    ///
    /// Input is `(B, H, W, 3)` with channels in `[0, 1]`, output is `(B, H, W, 1)`.
    /// Output item `i` always corresponds to input item `i`.
    fn predict(&self, batch: ArrayView4<f32>) -> Result<Array4<f32>>;
}
