use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for the glacier segmentation pipeline.
///
/// Variants split into two classes. Skippable errors ([`is_skippable`](Self::is_skippable))
/// only cost the pipeline a single year; everything else aborts the run before the zone
/// configuration is rewritten.
#[derive(Error, Debug)]
pub enum GlacierSegError {
    #[error("Configuration format error in {path:?}")]
    ConfigFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image decode error: {path:?}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("No source image found for year {year}")]
    MissingImage { year: i32 },

    #[error("Image processing error: {operation} failed (file: {path})")]
    ImageProcessing {
        path: String,
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Model error: {operation} failed")]
    Model {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {field} {reason}")]
    Validation { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, GlacierSegError>;

impl GlacierSegError {
    /// Whether the error only affects a single tracked year.
    pub const fn is_skippable(&self) -> bool {
        matches!(self, Self::ImageDecode { .. } | Self::MissingImage { .. })
    }

    pub(crate) fn model(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason: String = reason.into();
        Self::Model {
            operation: operation.into(),
            source: reason.into(),
        }
    }
}

/// Convert I/O errors to filesystem errors.
///
/// Code that knows the path and operation should build `GlacierSegError::FileSystem`
/// directly; this is the fallback for bare `?`.
impl From<std::io::Error> for GlacierSegError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

impl From<image::ImageError> for GlacierSegError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageProcessing {
            path: "unknown".to_string(),
            operation: "image processing".to_string(),
            source: Box::new(err),
        }
    }
}

impl From<ort::Error> for GlacierSegError {
    fn from(err: ort::Error) -> Self {
        Self::Model {
            operation: "ort operation".to_string(),
            source: Box::new(err),
        }
    }
}

/// Shape errors only show up around tensors going in and out of the model, so they
/// are reported as model errors.
impl From<ndarray::ShapeError> for GlacierSegError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Model {
            operation: "tensor shape conversion".to_string(),
            source: Box::new(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skippable_classification() {
        assert!(GlacierSegError::MissingImage { year: 2010 }.is_skippable());

        let decode = GlacierSegError::ImageDecode {
            path: "a.png".into(),
            source: image::ImageError::IoError(std::io::Error::other("truncated")),
        };
        assert!(decode.is_skippable());

        let bbox = GlacierSegError::Validation {
            field: "bbox".to_string(),
            reason: "lon_min must be less than lon_max".to_string(),
        };
        assert!(!bbox.is_skippable());
        assert_eq!(
            bbox.to_string(),
            "Validation error: bbox lon_min must be less than lon_max"
        );
        assert!(!GlacierSegError::model("load", "corrupt").is_skippable());
    }

    #[test]
    fn test_display_includes_context() {
        let err = GlacierSegError::MissingImage { year: 1999 };
        assert_eq!(err.to_string(), "No source image found for year 1999");

        let err = GlacierSegError::model("session run", "bad shape");
        assert_eq!(err.to_string(), "Model error: session run failed");
    }
}
