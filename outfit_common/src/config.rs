//! Tunables for the analysis pipeline. Every field has a default so partial
//! JSON documents are accepted.

use serde::{Deserialize, Serialize};

/// k-means settings for the dominant color extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    /// Upper bound on returned clusters (K).
    pub clusters: usize,
    /// Seed for centroid initialisation.
    pub seed: u64,
    /// Independent initialisations; the lowest-inertia run wins.
    pub restarts: usize,
    pub max_iterations: usize,
    /// Converged once no centroid moves further than this (RGB units).
    pub tolerance: f64,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            clusters: 3,
            seed: 42,
            restarts: 10,
            max_iterations: 300,
            tolerance: 1e-4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub clustering: ClusterParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AnalyzerConfig =
            serde_json::from_str(r#"{ "clustering": { "clusters": 5 } }"#).unwrap();
        assert_eq!(config.clustering.clusters, 5);
        assert_eq!(config.clustering.seed, 42);
        assert_eq!(config.clustering.restarts, 10);

        let empty: AnalyzerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, AnalyzerConfig::default());
    }
}
