use thiserror::Error;

/// Failure before any per-region work could start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("No clothing detected in the image")]
    NoRegionsFound,

    #[error("Invalid image dimensions {width}x{height}")]
    InvalidImage { width: u32, height: u32 },

    #[error("Object locator failed: {0}")]
    Locator(String),

    /// The caller could not turn its input into an image.
    #[error("{0}")]
    Input(String),
}

/// Failure of the color extraction step for one crop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("Cluster count must be at least 1")]
    InvalidClusterCount,

    #[error("Mask is {mask_width}x{mask_height} but crop is {crop_width}x{crop_height}")]
    MaskShapeMismatch {
        mask_width: u32,
        mask_height: u32,
        crop_width: u32,
        crop_height: u32,
    },
}

/// Failure confined to a single region; siblings are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegionError {
    #[error(transparent)]
    Extraction(#[from] ExtractError),

    #[error("Region processing panicked: {0}")]
    Panicked(String),
}
