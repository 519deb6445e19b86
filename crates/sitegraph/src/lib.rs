//! # SiteGraph
//!
//! Knowledge-graph analysis for static site content.
//!
//! This crate bundles the data model from [`sitegraph_core`] and the
//! analyses from [`sitegraph_graph`] behind one dependency, and adds
//! [`logging`] helpers for applications.
//!
//! ```
//! use sitegraph::prelude::*;
//! use std::sync::Arc;
//!
//! sitegraph::logging::init("warn");
//!
//! let site = Site::new(vec![
//!     Page::new("index.md").with_related(["guide.md", "faq.md"]),
//!     Page::new("guide.md").with_tags(["setup"]).with_related(["faq.md"]),
//!     Page::new("faq.md").with_tags(["setup"]),
//! ])
//! .with_page_taxonomies();
//!
//! let mut kg = KnowledgeGraph::new(Arc::new(site), GraphConfig::default())?;
//! kg.build();
//!
//! let ranks = kg.pagerank(false)?;
//! assert_eq!(ranks.top_pages(1)[0].0, std::path::PathBuf::from("faq.md"));
//!
//! let report = kg.health_report()?;
//! assert_eq!(report.metrics.total_pages, 3);
//! # Ok::<(), sitegraph::Error>(())
//! ```

pub mod logging;

pub use sitegraph_core;
pub use sitegraph_graph;
pub use sitegraph_graph::*;

pub mod prelude {
    pub use sitegraph_graph::prelude::*;
}
