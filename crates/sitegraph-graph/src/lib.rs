//! # Site Graph Analysis
//!
//! Directed, weighted graph of a static site's pages and the algorithms
//! that run over it.
//!
//! Provides:
//! - Graph construction from six relationship sources (sequential or parallel)
//! - Connectivity scoring and hub/leaf/orphan classification
//! - Standard and personalized PageRank
//! - Louvain community detection
//! - Betweenness and closeness centrality (exact or pivot-approximated)
//! - Link suggestions from inverted tag/category indices
//! - Site health reports
//!
//! ## Quick Start
//!
//! ```
//! use sitegraph_graph::prelude::*;
//! use std::sync::Arc;
//!
//! let site = Site::new(vec![
//!     Page::new("a.md").with_related(["b.md"]),
//!     Page::new("b.md").with_related(["c.md"]),
//!     Page::new("c.md"),
//! ]);
//!
//! let mut kg = KnowledgeGraph::new(Arc::new(site), GraphConfig::default()).unwrap();
//! kg.build();
//!
//! let ranks = kg.pagerank(false).unwrap();
//! let top = ranks.top_pages(1);
//! assert_eq!(top[0].0, std::path::PathBuf::from("c.md"));
//! ```
//!
//! ## Core Concepts
//!
//! ### Edges and weights
//! - **Page edges**: cross-references, related posts, section index → child,
//!   next/prev navigation
//! - **Graph-level boosts**: taxonomy terms and menu entries add incoming
//!   weight with no source page
//! - **incoming weight** is a weighted sum, not a count (a menu entry adds 10)
//!
//! ### Analysis pages
//! Generated and autodoc pages stay in the graph but are skipped by every
//! algorithm unless `include_generated` is set.
//!
//! ## Using the components directly
//!
//! ```
//! use sitegraph_graph::prelude::*;
//! use std::path::Path;
//!
//! let site = Site::new(vec![
//!     Page::new("hub.md"),
//!     Page::new("a.md").with_related(["hub.md"]),
//!     Page::new("b.md").with_related(["hub.md"]),
//! ]);
//! let config = GraphConfig::default();
//! let graph = GraphBuilder::new(&site, &config).build();
//!
//! let analyzer = GraphAnalyzer::new(&graph, &config);
//! assert_eq!(analyzer.connectivity_score(Path::new("hub.md")).unwrap(), 2.0);
//!
//! let paths = PathAnalyzer::new(&graph, &config.paths).unwrap().analyze();
//! assert_eq!(paths.diameter, 1);
//! ```
//!
//! ## Modules
//!
//! - [`graph`] - LinkGraph data model
//! - [`builder`] - Graph construction
//! - [`analyzer`] - Connectivity classification and metrics
//! - [`pagerank`] - PageRank
//! - [`community`] - Louvain communities
//! - [`paths`] - Shortest paths and centrality
//! - [`suggestions`] - Link suggestions
//! - [`health`] - Site health reports
//! - [`knowledge`] - Memoizing facade
//!
//! ## Performance Characteristics
//!
//! - Graph construction: O(P + L) for P pages and L relationships
//! - PageRank: O(E) per iteration via the reverse adjacency index
//! - Louvain: roughly O(E log V)
//! - Centrality: O(V·E) exact, O(k·E) with k pivots
//! - Suggestions: O(N × overlap) via inverted indices

pub mod analyzer;
pub mod builder;
pub mod community;
pub mod graph;
pub mod health;
pub mod knowledge;
pub mod pagerank;
pub mod paths;
pub mod suggestions;

pub use analyzer::{
    ConnectivityDistribution, ConnectivityReport, GraphAnalyzer, GraphMetrics, PageLayers,
};
pub use builder::{GraphBuilder, parse_switch, select_mode};
pub use community::{Community, CommunityDetectionResults, CommunityDetector};
pub use graph::{BuildMode, BuildStats, LinkGraph, LinkMetrics, PageId};
pub use health::{HealthAnalyzer, HealthReport};
pub use knowledge::KnowledgeGraph;
pub use pagerank::{PageRankEngine, PageRankResults};
pub use paths::{PathAnalysisResults, PathAnalyzer};
pub use suggestions::{LinkSuggestion, LinkSuggestionEngine, LinkSuggestionResults};
pub use sitegraph_core::prelude::*;

pub mod prelude {
    pub use crate::analyzer::{GraphAnalyzer, GraphMetrics, PageLayers};
    pub use crate::builder::GraphBuilder;
    pub use crate::community::{Community, CommunityDetectionResults, CommunityDetector};
    pub use crate::graph::{BuildMode, LinkGraph, PageId};
    pub use crate::health::{HealthAnalyzer, HealthReport};
    pub use crate::knowledge::KnowledgeGraph;
    pub use crate::pagerank::{PageRankEngine, PageRankResults};
    pub use crate::paths::{PathAnalysisResults, PathAnalyzer};
    pub use crate::suggestions::{LinkSuggestion, LinkSuggestionEngine, LinkSuggestionResults};
    pub use sitegraph_core::prelude::*;
}
