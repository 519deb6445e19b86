//! Lazily computed, memoized analyses over one site.
//!
//! [`KnowledgeGraph`] owns the build lifecycle (`NotBuilt → Built`) and one
//! memo per algorithm (`Uncomputed → Cached(params, result)`). A cached
//! result is reused only when its parameters match; rebuilding the graph or
//! calling [`KnowledgeGraph::invalidate`] clears every memo.

use crate::analyzer::{GraphAnalyzer, GraphMetrics, PageLayers};
use crate::builder::GraphBuilder;
use crate::community::{CommunityDetectionResults, CommunityDetector};
use crate::graph::LinkGraph;
use crate::health::{HealthAnalyzer, HealthReport};
use crate::pagerank::{PageRankEngine, PageRankResults};
use crate::paths::{PathAnalysisResults, PathAnalyzer};
use crate::suggestions::{LinkSuggestionEngine, LinkSuggestionResults};
use parking_lot::Mutex;
use sitegraph_core::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Memoized result of one algorithm
#[derive(Debug)]
enum Memo<P, R> {
    Uncomputed,
    Cached { params: P, result: Arc<R> },
}

impl<P, R> Default for Memo<P, R> {
    fn default() -> Self {
        Memo::Uncomputed
    }
}

impl<P: PartialEq + Clone, R> Memo<P, R> {
    fn get(&self, params: &P) -> Option<Arc<R>> {
        match self {
            Memo::Cached { params: cached, result } if cached == params => Some(Arc::clone(result)),
            _ => None,
        }
    }

    /// Most recent result and its parameters
    fn latest(&self) -> Option<(P, Arc<R>)> {
        match self {
            Memo::Cached { params, result } => Some((params.clone(), Arc::clone(result))),
            Memo::Uncomputed => None,
        }
    }

    /// Return the cached result for `params`, computing it on a miss or when forced
    fn get_or_compute(
        &mut self,
        params: P,
        force: bool,
        compute: impl FnOnce() -> Result<R>,
    ) -> Result<Arc<R>> {
        if !force && let Some(hit) = self.get(&params) {
            return Ok(hit);
        }
        let result = Arc::new(compute()?);
        *self = Memo::Cached {
            params,
            result: Arc::clone(&result),
        };
        Ok(result)
    }
}

#[derive(Debug)]
enum GraphState {
    NotBuilt,
    Built(Arc<LinkGraph>),
}

#[derive(Debug, Clone, PartialEq)]
struct SuggestionKey {
    min_score: f64,
    max_suggestions_per_page: usize,
    /// Parameters of the PageRank and path results fed to the engine
    pagerank: Option<PageRankConfig>,
    paths: Option<PathConfig>,
}

/// Site graph with on-demand, cached analyses
#[derive(Debug)]
pub struct KnowledgeGraph {
    site: Arc<Site>,
    config: GraphConfig,
    state: GraphState,
    pagerank: Mutex<Memo<PageRankConfig, PageRankResults>>,
    personalized: Mutex<Memo<(PageRankConfig, Vec<PathBuf>), PageRankResults>>,
    communities: Mutex<Memo<CommunityConfig, CommunityDetectionResults>>,
    paths: Mutex<Memo<PathConfig, PathAnalysisResults>>,
    suggestions: Mutex<Memo<SuggestionKey, LinkSuggestionResults>>,
}

impl KnowledgeGraph {
    /// Validates the configuration; the graph is not built yet
    pub fn new(site: Arc<Site>, config: GraphConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            site,
            config,
            state: GraphState::NotBuilt,
            pagerank: Mutex::default(),
            personalized: Mutex::default(),
            communities: Mutex::default(),
            paths: Mutex::default(),
            suggestions: Mutex::default(),
        })
    }

    pub fn site(&self) -> &Arc<Site> {
        &self.site
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn is_built(&self) -> bool {
        matches!(self.state, GraphState::Built(_))
    }

    /// Build (or rebuild) with automatic mode selection
    pub fn build(&mut self) -> Arc<LinkGraph> {
        self.build_with_mode(None)
    }

    /// Build with an explicit parallel (`Some(true)`) or sequential
    /// (`Some(false)`) override
    pub fn build_with_mode(&mut self, parallel: Option<bool>) -> Arc<LinkGraph> {
        let mut builder = GraphBuilder::new(&self.site, &self.config);
        if let Some(parallel) = parallel {
            builder = builder.parallel(parallel);
        }
        let graph = Arc::new(builder.build());
        self.invalidate();
        self.state = GraphState::Built(Arc::clone(&graph));
        graph
    }

    /// The built graph, or `NotBuilt`
    pub fn graph(&self) -> Result<Arc<LinkGraph>> {
        self.built().map(Arc::clone)
    }

    fn built(&self) -> Result<&Arc<LinkGraph>> {
        match &self.state {
            GraphState::Built(graph) => Ok(graph),
            GraphState::NotBuilt => Err(Error::NotBuilt),
        }
    }

    /// Drop every cached result; the graph itself stays built
    pub fn invalidate(&self) {
        *self.pagerank.lock() = Memo::Uncomputed;
        *self.personalized.lock() = Memo::Uncomputed;
        *self.communities.lock() = Memo::Uncomputed;
        *self.paths.lock() = Memo::Uncomputed;
        *self.suggestions.lock() = Memo::Uncomputed;
        log::debug!("Cleared cached graph analyses");
    }

    pub fn analyzer(&self) -> Result<GraphAnalyzer<'_>> {
        Ok(GraphAnalyzer::new(self.built()?, &self.config))
    }

    /// Path queries (shortest path, bounded enumeration, distances)
    pub fn path_analyzer(&self) -> Result<PathAnalyzer<'_>> {
        PathAnalyzer::new(self.built()?, &self.config.paths)
    }

    pub fn connectivity_score(&self, path: &Path) -> Result<f64> {
        self.analyzer()?.connectivity_score(path)
    }

    pub fn hubs(&self, threshold: Option<f64>) -> Result<Vec<PathBuf>> {
        Ok(self.analyzer()?.hubs(threshold))
    }

    pub fn leaves(&self, threshold: Option<f64>) -> Result<Vec<PathBuf>> {
        Ok(self.analyzer()?.leaves(threshold))
    }

    pub fn orphans(&self) -> Result<Vec<PathBuf>> {
        Ok(self.analyzer()?.orphans())
    }

    pub fn layers(&self) -> Result<PageLayers> {
        Ok(self.analyzer()?.layers())
    }

    pub fn metrics(&self) -> Result<GraphMetrics> {
        Ok(self.analyzer()?.metrics())
    }

    /// PageRank with the configured parameters
    pub fn pagerank(&self, force: bool) -> Result<Arc<PageRankResults>> {
        let config = self.config.pagerank.clone();
        self.pagerank_config(config, force)
    }

    pub fn pagerank_with(
        &self,
        damping: f64,
        max_iterations: usize,
        force: bool,
    ) -> Result<Arc<PageRankResults>> {
        let config = PageRankConfig {
            damping,
            max_iterations,
            ..self.config.pagerank.clone()
        };
        self.pagerank_config(config, force)
    }

    fn pagerank_config(&self, config: PageRankConfig, force: bool) -> Result<Arc<PageRankResults>> {
        let graph = self.built()?;
        self.pagerank.lock().get_or_compute(config.clone(), force, || {
            Ok(PageRankEngine::from_config(graph, &config)?.compute())
        })
    }

    pub fn personalized_pagerank<I, P>(&self, seeds: I, force: bool) -> Result<Arc<PageRankResults>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let graph = self.built()?;
        let mut seeds: Vec<PathBuf> = seeds.into_iter().map(|s| s.as_ref().to_path_buf()).collect();
        seeds.sort();
        seeds.dedup();

        let config = self.config.pagerank.clone();
        let key = (config.clone(), seeds.clone());
        self.personalized.lock().get_or_compute(key, force, || {
            PageRankEngine::from_config(graph, &config)?.compute_personalized(&seeds)
        })
    }

    pub fn communities(&self, force: bool) -> Result<Arc<CommunityDetectionResults>> {
        let config = self.config.community.clone();
        self.communities_config(config, force)
    }

    pub fn communities_with(
        &self,
        resolution: f64,
        random_seed: Option<u64>,
        force: bool,
    ) -> Result<Arc<CommunityDetectionResults>> {
        self.communities_config(
            CommunityConfig {
                resolution,
                random_seed,
            },
            force,
        )
    }

    fn communities_config(
        &self,
        config: CommunityConfig,
        force: bool,
    ) -> Result<Arc<CommunityDetectionResults>> {
        let graph = self.built()?;
        self.communities.lock().get_or_compute(config.clone(), force, || {
            Ok(CommunityDetector::from_config(graph, &config)?.detect())
        })
    }

    pub fn paths(&self, force: bool) -> Result<Arc<PathAnalysisResults>> {
        let config = self.config.paths.clone();
        self.paths_with(config, force)
    }

    pub fn paths_with(&self, config: PathConfig, force: bool) -> Result<Arc<PathAnalysisResults>> {
        let graph = self.built()?;
        self.paths.lock().get_or_compute(config.clone(), force, || {
            Ok(PathAnalyzer::new(graph, &config)?.analyze())
        })
    }

    /// Suggestions with the configured floor and limit, using any cached
    /// PageRank and path results
    pub fn suggestions(&self, force: bool) -> Result<Arc<LinkSuggestionResults>> {
        let s = &self.config.suggestions;
        self.suggestions_with(s.min_score, s.max_suggestions_per_page, force)
    }

    pub fn suggestions_with(
        &self,
        min_score: f64,
        max_suggestions_per_page: usize,
        force: bool,
    ) -> Result<Arc<LinkSuggestionResults>> {
        let graph = self.built()?;
        let pagerank = self.pagerank.lock().latest();
        let paths = self.paths.lock().latest();

        let key = SuggestionKey {
            min_score,
            max_suggestions_per_page,
            pagerank: pagerank.as_ref().map(|(params, _)| params.clone()),
            paths: paths.as_ref().map(|(params, _)| params.clone()),
        };
        self.suggestions.lock().get_or_compute(key, force, || {
            let mut engine = LinkSuggestionEngine::new(graph, &self.config.suggestions);
            if let Some((_, pagerank)) = pagerank.as_ref() {
                engine = engine.with_pagerank(pagerank);
            }
            if let Some((_, paths)) = paths.as_ref() {
                engine = engine.with_paths(paths);
            }
            engine.generate_suggestions(min_score, max_suggestions_per_page)
        })
    }

    pub fn health_report(&self) -> Result<HealthReport> {
        Ok(HealthAnalyzer::new(self.built()?, &self.config).analyze())
    }
}
