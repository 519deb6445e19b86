//! # SiteGraph Core
//!
//! Core data models, error types, and configuration for the site graph
//! engine. This crate defines the canonical types that the other crates
//! depend on.
//!
//! ## Architecture Principles
//!
//! - **Explicit fields**: a [`Page`] carries every relationship the engine
//!   reads as a plain field that defaults to empty
//! - **Zero Panic in Libraries**: All errors are `Result<T, Error>`
//! - **Builder Pattern for Complex Types**: configuration uses builders
//! - **Read-only inputs**: the engine never mutates a page or site
//!
//! ## Core Modules
//!
//! - [`models`] - Page, Site, Section, MenuItem, XrefIndex, LinkType
//! - [`error`] - Error types and Result alias
//! - [`config`] - Graph construction and analysis configuration
//!
//! ## Usage Examples
//!
//! ### Describing a site
//!
//! ```
//! use sitegraph_core::prelude::*;
//!
//! let site = Site::new(vec![
//!     Page::new("docs/_index.md").with_title("Docs").in_section("docs"),
//!     Page::new("docs/install.md")
//!         .with_tags(["setup"])
//!         .with_links(["docs/usage.md"])
//!         .in_section("docs"),
//!     Page::new("docs/usage.md").with_tags(["setup"]).in_section("docs"),
//! ])
//! .with_section(Section::new("docs").with_index("docs/_index.md"))
//! .with_page_taxonomies()
//! .with_page_xrefs();
//!
//! assert_eq!(site.pages.len(), 3);
//! ```
//!
//! ### Configuration
//!
//! ```
//! use sitegraph_core::prelude::*;
//!
//! let config = GraphConfig::builder()
//!     .hub_threshold(5.0)
//!     .damping(0.9)
//!     .build()
//!     .unwrap();
//! assert!(config.validate().is_ok());
//! ```

pub mod config;
pub mod error;
pub mod models;

pub use config::*;
pub use error::{Error, Result};
pub use models::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{
        CommunityConfig, GraphConfig, GraphConfigBuilder, PageRankConfig, PathConfig,
        SuggestionConfig, SuggestionWeights,
    };
    pub use crate::error::{Error, Result};
    pub use crate::models::{
        LinkType, LinkWeights, MenuItem, Page, Section, Site, Taxonomies, XrefIndex,
    };
}
