//! Clothing color analysis: crop located subjects, cluster the colors inside
//! their segmentation masks and describe the result in plain language.
//!
//! Detection and segmentation models sit behind the [`ObjectLocator`] and
//! [`RegionSegmenter`] traits; everything in this crate is model agnostic.

pub mod bbox;
pub mod coco_classes;
pub mod color_names;
pub mod config;
pub mod describe;
pub mod dominant_colors;
pub mod error;
pub mod mask;
pub mod pipeline;
pub mod results;
pub mod stage_times;

/// 8-bit RGB triple.
pub type Rgb = [u8; 3];

pub use bbox::{BoundingBox, CropRegion};
pub use color_names::ColorNamer;
pub use config::{AnalyzerConfig, ClusterParams};
pub use describe::describe_outfit;
pub use dominant_colors::{extract_dominant_colors, ColorCluster};
pub use error::{AnalysisError, ExtractError, RegionError};
pub use mask::Mask;
pub use pipeline::{ClothingAnalyzer, ObjectLocator, RegionSegmenter};
pub use results::{AnalysisResult, NamedColor, RegionOutcome, RegionResult};
