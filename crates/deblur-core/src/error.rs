use thiserror::Error;

use crate::compute::{AccessMode, ElementType};

#[derive(Error, Debug)]
pub enum DeblurError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid kernel radius: {radius}")]
    InvalidKernelRadius { radius: f32 },

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Raster dimensions differ: {expected:?} vs {actual:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Device buffer range of {requested} elements exceeds capacity {capacity}")]
    DeviceBufferRangeOverflow { requested: usize, capacity: usize },

    #[error("Argument slot {slot} is bound {bound}, cannot rebind {requested}")]
    AccessModeConflict {
        slot: u32,
        bound: AccessMode,
        requested: AccessMode,
    },

    #[error("Argument slot {slot} holds {bound} data, got {requested}")]
    ElementTypeMismatch {
        slot: u32,
        bound: ElementType,
        requested: ElementType,
    },

    #[error("Argument slot {slot} has no device buffer bound")]
    UnboundArgument { slot: u32 },

    #[error("Argument slot {slot} cannot bind an empty range")]
    EmptyDeviceBuffer { slot: u32 },

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("Compute backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DeblurError>;
