use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowAlignError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid weights file: {0}")]
    InvalidWeights(String),

    #[error("Invalid image dimensions: {width}x{height} (height and width must be nonzero multiples of 16)")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, FlowAlignError>;
