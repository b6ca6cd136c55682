//! Result records returned by the analyzer and their wire shape.
//!
//! Internally outcomes are tagged enums; on serialization they flatten to
//! `{ success, error?, ... }` records with percentages in [0, 100].

use serde::{Serialize, Serializer};

use crate::bbox::CropRegion;
use crate::error::{AnalysisError, RegionError};
use crate::Rgb;

/// A cluster annotated with its reference color name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedColor {
    pub name: String,
    pub rgb: Rgb,
    #[serde(rename = "percentage", serialize_with = "as_percentage")]
    pub fraction: f64,
}

fn as_percentage<S: Serializer>(fraction: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(fraction * 100.0)
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegionOutcome {
    Described {
        description: String,
        colors: Vec<NamedColor>,
    },
    Failed(RegionError),
}

/// Outcome for one surviving crop.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "RegionRecord")]
pub struct RegionResult {
    /// Position among the crops that survived clipping.
    pub index: usize,
    pub region: CropRegion,
    pub outcome: RegionOutcome,
}

impl RegionResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RegionOutcome::Described { .. })
    }

    pub fn description(&self) -> Option<&str> {
        match &self.outcome {
            RegionOutcome::Described { description, .. } => Some(description),
            RegionOutcome::Failed(_) => None,
        }
    }

    pub fn colors(&self) -> &[NamedColor] {
        match &self.outcome {
            RegionOutcome::Described { colors, .. } => colors,
            RegionOutcome::Failed(_) => &[],
        }
    }

    pub fn error(&self) -> Option<&RegionError> {
        match &self.outcome {
            RegionOutcome::Failed(err) => Some(err),
            RegionOutcome::Described { .. } => None,
        }
    }
}

#[derive(Serialize)]
struct RegionRecord {
    index: usize,
    success: bool,
    bbox: [u32; 4],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    colors: Option<Vec<NamedColor>>,
}

impl From<RegionResult> for RegionRecord {
    fn from(result: RegionResult) -> Self {
        let bbox = result.region.corners();
        match result.outcome {
            RegionOutcome::Described {
                description,
                colors,
            } => Self {
                index: result.index,
                success: true,
                bbox,
                error: None,
                description: Some(description),
                colors: Some(colors),
            },
            RegionOutcome::Failed(err) => Self {
                index: result.index,
                success: false,
                bbox,
                error: Some(err.to_string()),
                description: None,
                colors: None,
            },
        }
    }
}

/// Outcome of analyzing one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "AnalysisRecord")]
pub enum AnalysisResult {
    /// Regions in detection order.
    Completed(Vec<RegionResult>),
    Failed(AnalysisError),
}

impl AnalysisResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn detections(&self) -> &[RegionResult] {
        match self {
            Self::Completed(regions) => regions,
            Self::Failed(_) => &[],
        }
    }

    pub fn error(&self) -> Option<&AnalysisError> {
        match self {
            Self::Failed(err) => Some(err),
            Self::Completed(_) => None,
        }
    }
}

#[derive(Serialize)]
struct AnalysisRecord {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    detections: Vec<RegionResult>,
}

impl From<AnalysisResult> for AnalysisRecord {
    fn from(result: AnalysisResult) -> Self {
        match result {
            AnalysisResult::Completed(detections) => Self {
                success: true,
                error: None,
                detections,
            },
            AnalysisResult::Failed(err) => Self {
                success: false,
                error: Some(err.to_string()),
                detections: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::ExtractError;

    fn region() -> CropRegion {
        CropRegion {
            x: 1,
            y: 2,
            width: 3,
            height: 4,
        }
    }

    #[test]
    fn test_no_regions_wire_shape() {
        let value = serde_json::to_value(AnalysisResult::Failed(AnalysisError::NoRegionsFound)).unwrap();
        assert_eq!(
            value,
            json!({
                "success": false,
                "error": "No clothing detected in the image",
                "detections": []
            })
        );
    }

    #[test]
    fn test_region_wire_shape() {
        let ok = RegionResult {
            index: 0,
            region: region(),
            outcome: RegionOutcome::Described {
                description: "The clothing item contains: 50% red.".to_string(),
                colors: vec![NamedColor {
                    name: "red".to_string(),
                    rgb: [255, 0, 0],
                    fraction: 0.5,
                }],
            },
        };
        let failed = RegionResult {
            index: 1,
            region: region(),
            outcome: RegionOutcome::Failed(RegionError::Extraction(ExtractError::InvalidClusterCount)),
        };
        let value = serde_json::to_value(AnalysisResult::Completed(vec![ok, failed])).unwrap();
        assert_eq!(
            value,
            json!({
                "success": true,
                "detections": [
                    {
                        "index": 0,
                        "success": true,
                        "bbox": [1, 2, 4, 6],
                        "description": "The clothing item contains: 50% red.",
                        "colors": [{ "name": "red", "rgb": [255, 0, 0], "percentage": 50.0 }]
                    },
                    {
                        "index": 1,
                        "success": false,
                        "bbox": [1, 2, 4, 6],
                        "error": "Cluster count must be at least 1"
                    }
                ]
            })
        );
    }

    #[test]
    fn test_accessors() {
        let failed = AnalysisResult::Failed(AnalysisError::NoRegionsFound);
        assert!(!failed.is_success());
        assert!(failed.detections().is_empty());
        assert_eq!(failed.error(), Some(&AnalysisError::NoRegionsFound));

        let region = RegionResult {
            index: 0,
            region: region(),
            outcome: RegionOutcome::Failed(RegionError::Panicked("boom".to_string())),
        };
        assert!(!region.is_success());
        assert!(region.colors().is_empty());
        assert!(region.description().is_none());
        assert_eq!(
            region.error().map(ToString::to_string).as_deref(),
            Some("Region processing panicked: boom")
        );
    }
}
