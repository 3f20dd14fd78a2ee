use thiserror::Error;

/// Errors raised while building or loading a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Timestep must be non-zero")]
    ZeroTimestep,

    #[error("Timestep {0} must be finite and positive")]
    InvalidTimestep(f64),

    #[error("Mass {0} must be positive")]
    NonPositiveMass(f64),

    #[error("Damping factor {0} must be in (0, 1]")]
    DampingOutOfRange(f64),

    #[error("Restitution {0} must be in [0, 1)")]
    RestitutionOutOfRange(f64),

    #[error("Integral limit {0} must not be negative")]
    NegativeIntegralLimit(f64),

    #[error("Position bounds [{min}, {max}] are empty")]
    InvalidBounds { min: f64, max: f64 },

    #[error("History capacity must be at least 1")]
    EmptyHistory,

    #[error("Grid {rows}x{cols} is too small, need at least 2x2")]
    GridTooSmall { rows: usize, cols: usize },

    #[error("Grid {rows}x{cols} exceeds {max} cells")]
    GridTooLarge { rows: usize, cols: usize, max: usize },

    #[error("{which} cell ({row}, {col}) is outside the grid")]
    EndpointOutOfBounds {
        which: &'static str,
        row: usize,
        col: usize,
    },

    #[error("Start and end cannot share cell ({row}, {col})")]
    EndpointsOverlap { row: usize, col: usize },

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised while exporting images
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Nothing to export")]
    EmptyGrid,

    #[error("Image is too large ({width}x{height} pixels)")]
    TooLarge { width: u32, height: u32 },

    #[error("Export I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("PNG encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("GIF encoding failed: {0}")]
    Gif(#[from] gif::EncodingError),
}
