use thiserror::Error;

/// Errors that can occur while (re)allocating or exporting the canvas
#[derive(Error, Debug)]
pub enum SurfaceError {
    /// The pixel buffer for the requested size could not be allocated
    #[error("Failed to allocate a {width}x{height} canvas")]
    Allocation { width: u32, height: u32 },

    #[error("Failed to export canvas: {0}")]
    Export(#[from] image::ImageError),
}

/// Errors that can occur while loading a [`crate::PaintConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Result type for canvas operations
pub type SurfaceResult<T> = Result<T, SurfaceError>;
