//! Configuration for graph construction and analysis.
//!
//! Every field has a default, so partial YAML documents load cleanly.
//! Follows a builder pattern with validation at `build()`.

use crate::error::{Error, Result};
use crate::models::LinkWeights;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment kill-switch for the parallel graph builder
pub const ENV_PARALLEL_GRAPH: &str = "SITEGRAPH_PARALLEL_GRAPH";

/// Environment override for the builder's worker count
pub const ENV_MAX_WORKERS: &str = "SITEGRAPH_MAX_WORKERS";

/// PageRank defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRankConfig {
    /// Probability of following a link instead of jumping
    pub damping: f64,
    pub max_iterations: usize,
    /// Stop when the L1 delta between iterations falls below this
    pub tolerance: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

/// Louvain community detection defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunityConfig {
    /// Higher values favour more, smaller communities
    pub resolution: f64,
    /// Seed for the node visiting order; `None` keeps page order
    pub random_seed: Option<u64>,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            random_seed: Some(42),
        }
    }
}

/// Shortest-path analysis defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Pivot count for approximate centrality
    pub k_pivots: usize,
    /// Seed for pivot sampling
    pub seed: u64,
    /// Above this many pages, centrality is approximated from pivots
    pub auto_approximate_threshold: usize,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            k_pivots: 100,
            seed: 42,
            auto_approximate_threshold: 500,
        }
    }
}

/// Relative weight of each link-suggestion signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionWeights {
    pub tags: f64,
    pub categories: f64,
    pub pagerank: f64,
    pub bridge: f64,
    pub underlinked: f64,
}

impl Default for SuggestionWeights {
    fn default() -> Self {
        Self {
            tags: 0.4,
            categories: 0.3,
            pagerank: 0.2,
            bridge: 0.1,
            underlinked: 0.2,
        }
    }
}

/// Link suggestion defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    pub min_score: f64,
    pub max_suggestions_per_page: usize,
    /// Pages with at most this much incoming weight are always candidates
    pub underlinked_threshold: f64,
    /// Upper bound every score is clamped to
    pub max_score: f64,
    pub weights: SuggestionWeights,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            min_score: 0.3,
            max_suggestions_per_page: 10,
            underlinked_threshold: 1.0,
            max_score: 1.0,
            weights: SuggestionWeights::default(),
        }
    }
}

/// Configuration for building and analysing a site graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Minimum incoming weight for a hub
    pub hub_threshold: f64,
    /// Maximum connectivity for a leaf
    pub leaf_threshold: f64,
    /// Include generated/autodoc pages in analyses
    pub include_generated: bool,
    /// Site-level parallel build flag; `None` means automatic
    pub parallel_graph: Option<bool>,
    /// Automatic mode goes parallel at this many pages
    pub parallel_threshold: usize,
    /// Worker pool size; `None` uses available parallelism
    pub max_workers: Option<usize>,
    pub link_weights: LinkWeights,
    pub pagerank: PageRankConfig,
    pub community: CommunityConfig,
    pub paths: PathConfig,
    pub suggestions: SuggestionConfig,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            hub_threshold: 10.0,
            leaf_threshold: 2.0,
            include_generated: false,
            parallel_graph: None,
            parallel_threshold: 100,
            max_workers: None,
            link_weights: LinkWeights::default(),
            pagerank: PageRankConfig::default(),
            community: CommunityConfig::default(),
            paths: PathConfig::default(),
            suggestions: SuggestionConfig::default(),
        }
    }
}

impl GraphConfig {
    /// Create default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a validated builder from defaults
    pub fn builder() -> GraphConfigBuilder {
        GraphConfigBuilder::new()
    }

    /// Validate every bound
    pub fn validate(&self) -> Result<()> {
        if !(self.hub_threshold >= 0.0) {
            return Err(Error::config_error("hub_threshold must be non-negative"));
        }
        if !(self.leaf_threshold >= 0.0) {
            return Err(Error::config_error("leaf_threshold must be non-negative"));
        }
        if self.max_workers == Some(0) {
            return Err(Error::config_error("max_workers must be at least 1"));
        }

        let w = &self.link_weights;
        let weights = [
            w.explicit,
            w.taxonomy,
            w.related,
            w.menu,
            w.topical,
            w.sequential,
        ];
        if weights.iter().any(|v| !(*v >= 0.0) || !v.is_finite()) {
            return Err(Error::config_error(
                "link weights must be finite and non-negative",
            ));
        }

        let pr = &self.pagerank;
        if !(pr.damping > 0.0 && pr.damping < 1.0) {
            return Err(Error::config_error(format!(
                "pagerank.damping must be in (0, 1), got {}",
                pr.damping
            )));
        }
        if pr.max_iterations == 0 {
            return Err(Error::config_error("pagerank.max_iterations must be >= 1"));
        }
        if !(pr.tolerance > 0.0) {
            return Err(Error::config_error("pagerank.tolerance must be positive"));
        }

        if !(self.community.resolution > 0.0) || !self.community.resolution.is_finite() {
            return Err(Error::config_error("community.resolution must be positive"));
        }

        if self.paths.k_pivots == 0 {
            return Err(Error::config_error("paths.k_pivots must be >= 1"));
        }

        let s = &self.suggestions;
        if !(s.max_score > 0.0) {
            return Err(Error::config_error("suggestions.max_score must be positive"));
        }
        if !(s.min_score >= 0.0 && s.min_score <= s.max_score) {
            return Err(Error::config_error(format!(
                "suggestions.min_score must be in [0, {}]",
                s.max_score
            )));
        }
        let sw = &s.weights;
        if [sw.tags, sw.categories, sw.pagerank, sw.bridge, sw.underlinked]
            .iter()
            .any(|v| !(*v >= 0.0))
        {
            return Err(Error::config_error("suggestion weights must be non-negative"));
        }

        Ok(())
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config_error(format!("Invalid graph configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        log::debug!("Loaded graph configuration from {}", path.display());
        Self::from_yaml_str(&content)
    }

    /// Write this configuration to `path` as YAML
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let yaml = self.to_yaml_string()?;
        std::fs::write(path, yaml)?;
        log::debug!("Saved graph configuration to {}", path.display());
        Ok(())
    }

    /// Serialize to YAML
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| Error::config_error(format!("Failed to serialize configuration: {}", e)))
    }
}

/// Builder for GraphConfig
#[derive(Debug, Clone, Default)]
pub struct GraphConfigBuilder {
    config: GraphConfig,
}

impl GraphConfigBuilder {
    /// Create a new builder from defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hub_threshold(mut self, threshold: f64) -> Self {
        self.config.hub_threshold = threshold;
        self
    }

    pub fn leaf_threshold(mut self, threshold: f64) -> Self {
        self.config.leaf_threshold = threshold;
        self
    }

    /// Analyse generated and autodoc pages too
    pub fn include_generated(mut self, include: bool) -> Self {
        self.config.include_generated = include;
        self
    }

    pub fn parallel_graph(mut self, parallel: bool) -> Self {
        self.config.parallel_graph = Some(parallel);
        self
    }

    pub fn parallel_threshold(mut self, pages: usize) -> Self {
        self.config.parallel_threshold = pages;
        self
    }

    pub fn max_workers(mut self, workers: usize) -> Self {
        self.config.max_workers = Some(workers);
        self
    }

    pub fn link_weights(mut self, weights: LinkWeights) -> Self {
        self.config.link_weights = weights;
        self
    }

    pub fn damping(mut self, damping: f64) -> Self {
        self.config.pagerank.damping = damping;
        self
    }

    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.config.pagerank.max_iterations = iterations;
        self
    }

    pub fn resolution(mut self, resolution: f64) -> Self {
        self.config.community.resolution = resolution;
        self
    }

    pub fn random_seed(mut self, seed: Option<u64>) -> Self {
        self.config.community.random_seed = seed;
        self
    }

    pub fn k_pivots(mut self, k: usize) -> Self {
        self.config.paths.k_pivots = k;
        self
    }

    pub fn auto_approximate_threshold(mut self, pages: usize) -> Self {
        self.config.paths.auto_approximate_threshold = pages;
        self
    }

    pub fn min_score(mut self, score: f64) -> Self {
        self.config.suggestions.min_score = score;
        self
    }

    pub fn max_suggestions_per_page(mut self, limit: usize) -> Self {
        self.config.suggestions.max_suggestions_per_page = limit;
        self
    }

    /// Build and validate
    pub fn build(self) -> Result<GraphConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = GraphConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.hub_threshold, 10.0);
        assert_eq!(config.leaf_threshold, 2.0);
        assert_eq!(config.parallel_threshold, 100);
        assert_eq!(config.paths.auto_approximate_threshold, 500);
    }

    #[test]
    fn test_builder_rejects_bad_damping() {
        assert!(GraphConfig::builder().damping(1.0).build().is_err());
        assert!(GraphConfig::builder().damping(0.0).build().is_err());
        assert!(GraphConfig::builder().damping(0.5).build().is_ok());
    }

    #[test]
    fn test_builder_rejects_zero_iterations_and_workers() {
        assert!(GraphConfig::builder().max_iterations(0).build().is_err());
        assert!(GraphConfig::builder().max_workers(0).build().is_err());
    }

    #[test]
    fn test_min_score_above_max_is_rejected() {
        assert!(GraphConfig::builder().min_score(1.5).build().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = GraphConfig::from_yaml_str(
            "hub_threshold: 5\npagerank:\n  damping: 0.9\nlink_weights:\n  menu: 4.0\n",
        )
        .unwrap();
        assert_eq!(config.hub_threshold, 5.0);
        assert_eq!(config.pagerank.damping, 0.9);
        assert_eq!(config.pagerank.max_iterations, 100);
        assert_eq!(config.link_weights.menu, 4.0);
        assert_eq!(config.link_weights.topical, 0.5);
    }

    #[test]
    fn test_invalid_yaml_value_fails_validation() {
        let err = GraphConfig::from_yaml_str("pagerank:\n  damping: 1.2\n").unwrap_err();
        assert!(err.to_string().contains("damping"));
    }

    #[test]
    fn test_yaml_roundtrip_through_file() {
        let config = GraphConfig::builder()
            .hub_threshold(3.0)
            .parallel_graph(true)
            .build()
            .unwrap();
        let yaml = config.to_yaml_string().unwrap();

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let loaded = GraphConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = GraphConfig::from_file(Path::new("/nonexistent/sitegraph.yaml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_precondition());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitegraph.yaml");
        let config = GraphConfig::builder().damping(0.7).build().unwrap();

        config.save_to_file(&path).unwrap();
        assert_eq!(GraphConfig::from_file(&path).unwrap(), config);

        let missing_dir = dir.path().join("missing").join("sitegraph.yaml");
        assert!(matches!(config.save_to_file(&missing_dir), Err(Error::Io(_))));
    }
}
