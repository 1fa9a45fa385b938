use thiserror::Error;

/// Failures that can occur while building a world or loading tables.
/// The tick loop itself never fails.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("neighborhood layout has {layout} rectangles but {expected} neighborhoods were requested")]
    LayoutMismatch { layout: usize, expected: usize },

    #[error("neighborhood {hood} rectangle ({min_x},{min_y})-({max_x},{max_y}) does not fit a {width}x{height} grid")]
    LayoutOutOfBounds {
        hood: u32,
        min_x: u32,
        min_y: u32,
        max_x: u32,
        max_y: u32,
        width: u32,
        height: u32,
    },

    #[error("census table has {rows} rows but {expected} neighborhoods were requested")]
    CensusMismatch { rows: usize, expected: usize },

    #[error("calibration table '{table}' is invalid: {reason}")]
    Calibration { table: String, reason: String },

    #[error("failed to parse table: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type SimResult<T> = Result<T, SimError>;
