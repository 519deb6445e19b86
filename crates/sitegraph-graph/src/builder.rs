//! Graph construction from a site's relationship sources.
//!
//! Six sources feed the graph, in this order:
//!
//! 1. cross-references (raw link tokens resolved through the xref index)
//! 2. taxonomy terms (graph-level boost, no source page)
//! 3. related posts
//! 4. menu entries (graph-level boost, no source page)
//! 5. section hierarchy (index page to child)
//! 6. sequential navigation (next/prev)
//!
//! Sources 1, 3, 5 and 6 only read one page, so the parallel mode fans them
//! out over a worker pool. Each worker returns an owned [`PagePartial`]; the
//! merge runs on the calling thread. Taxonomies and menus iterate global data
//! and always run afterwards on the calling thread.

use crate::graph::{BuildMode, BuildStats, LinkGraph, PageId, PagePartial};
use rayon::prelude::*;
use sitegraph_core::prelude::*;
use sitegraph_core::{ENV_MAX_WORKERS, ENV_PARALLEL_GRAPH};
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Destination for discovered edges
trait EdgeSink {
    fn record(&mut self, source: Option<PageId>, target: PageId, link_type: LinkType, weight: f64);
}

impl EdgeSink for LinkGraph {
    fn record(&mut self, source: Option<PageId>, target: PageId, link_type: LinkType, weight: f64) {
        LinkGraph::record(self, source, target, link_type, weight);
    }
}

impl EdgeSink for PagePartial {
    fn record(&mut self, source: Option<PageId>, target: PageId, link_type: LinkType, weight: f64) {
        PagePartial::record(self, source, target, link_type, weight);
    }
}

/// Path → id lookup shared read-only by all workers
struct Registry<'a> {
    pages: Vec<&'a Page>,
    ids: HashMap<&'a Path, PageId>,
}

impl<'a> Registry<'a> {
    /// Register pages in site order; duplicates keep the first occurrence
    fn new(site: &'a Site) -> Self {
        let mut pages = Vec::with_capacity(site.pages.len());
        let mut ids = HashMap::with_capacity(site.pages.len());
        for page in &site.pages {
            let path = page.source_path.as_path();
            if ids.contains_key(path) {
                log::warn!(
                    "Duplicate page {} ignored; keeping first occurrence",
                    path.display()
                );
                continue;
            }
            ids.insert(path, PageId(pages.len()));
            pages.push(page);
        }
        Self { pages, ids }
    }

    fn id(&self, path: &Path) -> Option<PageId> {
        self.ids.get(path).copied()
    }

    fn len(&self) -> usize {
        self.pages.len()
    }
}

/// Builds a [`LinkGraph`] from a [`Site`]
pub struct GraphBuilder<'a> {
    site: &'a Site,
    config: &'a GraphConfig,
    parallel: Option<bool>,
    workers: Option<usize>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(site: &'a Site, config: &'a GraphConfig) -> Self {
        Self {
            site,
            config,
            parallel: None,
            workers: None,
        }
    }

    /// Force parallel (`true`) or sequential (`false`) construction
    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = Some(enabled);
        self
    }

    /// Explicit worker pool size
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers.max(1));
        self
    }

    /// Build the graph. Never fails: per-page problems are logged and skipped.
    pub fn build(&self) -> LinkGraph {
        self.build_with(|registry, id| self.analyze_page(registry, id))
    }

    /// Build with `analyze` producing each page's partial in parallel mode
    fn build_with<F>(&self, analyze: F) -> LinkGraph
    where
        F: Fn(&Registry<'_>, PageId) -> Result<PagePartial> + Sync,
    {
        let started = Instant::now();
        let registry = Registry::new(self.site);
        let pages: Vec<Page> = registry.pages.iter().map(|p| (*p).clone()).collect();
        let mut graph = LinkGraph::with_pages(pages, self.config.include_generated);

        let env_switch = std::env::var(ENV_PARALLEL_GRAPH).ok();
        if let Some(value) = env_switch.as_deref()
            && parse_switch(value).is_none()
        {
            log::warn!("Ignoring unrecognised {}={:?}", ENV_PARALLEL_GRAPH, value);
        }
        let mut mode = select_mode(
            self.parallel,
            env_switch.as_deref(),
            self.config.parallel_graph,
            self.config.parallel_threshold,
            graph.analysis_pages().len(),
        );

        let mut workers = 1;
        let mut failed = 0;
        if mode == BuildMode::Parallel {
            workers = self.resolve_workers();
            match self.build_parallel(&registry, &mut graph, workers, &analyze) {
                Ok(count) => failed = count,
                Err(e) => {
                    log::warn!("{}; falling back to sequential graph build", e);
                    mode = BuildMode::Sequential;
                    workers = 1;
                }
            }
        }
        if mode == BuildMode::Sequential {
            failed = self.build_sequential(&registry, &mut graph);
        }

        let stats = BuildStats {
            mode,
            workers,
            pages_analyzed: registry.len() - failed,
            pages_failed: failed,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        log::info!(
            "Built site graph: {} pages, {} links ({:?}, {} workers, {} failed) in {}ms",
            graph.page_count(),
            graph.edge_count(),
            stats.mode,
            stats.workers,
            stats.pages_failed,
            stats.duration_ms
        );
        graph.finalize(&self.config.link_weights, stats);
        graph
    }

    /// All sources in order on the calling thread; returns the failed page count
    fn build_sequential(&self, registry: &Registry<'_>, graph: &mut LinkGraph) -> usize {
        let mut valid = Vec::with_capacity(registry.len());
        for (i, page) in registry.pages.iter().enumerate() {
            match check_page(page) {
                Ok(()) => valid.push(PageId(i)),
                Err(e) => log::warn!("Skipping page: {}", e),
            }
        }
        let failed = registry.len() - valid.len();

        for &id in &valid {
            self.cross_references(registry, id, graph);
        }
        self.taxonomies(registry, graph);
        for &id in &valid {
            self.related_posts(registry, id, graph);
        }
        self.menus(registry, graph);
        for &id in &valid {
            self.section_hierarchy(registry, id, graph);
        }
        for &id in &valid {
            self.navigation(registry, id, graph);
        }

        failed
    }

    /// Fan out per-page sources, merge, then run global sources
    fn build_parallel<F>(
        &self,
        registry: &Registry<'_>,
        graph: &mut LinkGraph,
        workers: usize,
        analyze: &F,
    ) -> Result<usize>
    where
        F: Fn(&Registry<'_>, PageId) -> Result<PagePartial> + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("sitegraph-build-{}", i))
            .build()
            .map_err(|e| Error::other(format!("Failed to start graph worker pool: {}", e)))?;

        let partials: Vec<Option<PagePartial>> = pool.install(|| {
            (0..registry.len())
                .into_par_iter()
                .map(|i| analyze_isolated(registry, PageId(i), analyze))
                .collect()
        });

        let mut failed = 0;
        for partial in partials {
            match partial {
                Some(partial) => graph.absorb(partial),
                None => failed += 1,
            }
        }

        self.taxonomies(registry, graph);
        self.menus(registry, graph);
        Ok(failed)
    }

    /// Page-local sources for one page
    fn analyze_page(&self, registry: &Registry<'_>, id: PageId) -> Result<PagePartial> {
        check_page(registry.pages[id.0])?;
        let mut partial = PagePartial::default();
        self.cross_references(registry, id, &mut partial);
        self.related_posts(registry, id, &mut partial);
        self.section_hierarchy(registry, id, &mut partial);
        self.navigation(registry, id, &mut partial);
        Ok(partial)
    }

    fn cross_references(&self, registry: &Registry<'_>, id: PageId, sink: &mut impl EdgeSink) {
        let page = registry.pages[id.0];
        let weight = self.config.link_weights.explicit;
        for token in &page.links {
            match self.site.xref_index.resolve(token).and_then(|p| registry.id(p)) {
                Some(target) => sink.record(Some(id), target, LinkType::Explicit, weight),
                None => log::debug!(
                    "Unresolved link '{}' in {}",
                    token,
                    page.source_path.display()
                ),
            }
        }
    }

    fn taxonomies(&self, registry: &Registry<'_>, graph: &mut LinkGraph) {
        let weight = self.config.link_weights.taxonomy;
        for terms in self.site.taxonomies.values() {
            for members in terms.values() {
                let mut seen: HashSet<PageId> = HashSet::with_capacity(members.len());
                for path in members {
                    if let Some(target) = registry.id(path)
                        && seen.insert(target)
                    {
                        graph.record(None, target, LinkType::Taxonomy, weight);
                    }
                }
            }
        }
    }

    fn related_posts(&self, registry: &Registry<'_>, id: PageId, sink: &mut impl EdgeSink) {
        let weight = self.config.link_weights.related;
        for related in &registry.pages[id.0].related_posts {
            if let Some(target) = registry.id(related) {
                sink.record(Some(id), target, LinkType::Related, weight);
            }
        }
    }

    fn menus(&self, registry: &Registry<'_>, graph: &mut LinkGraph) {
        let weight = self.config.link_weights.menu;
        let mut targets: Vec<&PathBuf> = Vec::new();
        for items in self.site.menus.values() {
            for item in items {
                item.walk(&mut |entry| {
                    if let Some(page) = &entry.page {
                        targets.push(page);
                    }
                });
            }
        }
        for path in targets {
            if let Some(target) = registry.id(path) {
                graph.record(None, target, LinkType::Menu, weight);
            }
        }
    }

    fn section_hierarchy(&self, registry: &Registry<'_>, id: PageId, sink: &mut impl EdgeSink) {
        let page = registry.pages[id.0];
        if let Some(name) = &page.section
            && let Some(section) = self.site.sections.get(name)
            && let Some(index) = &section.index_page
            && let Some(index_id) = registry.id(index)
        {
            sink.record(
                Some(index_id),
                id,
                LinkType::Topical,
                self.config.link_weights.topical,
            );
        }
    }

    fn navigation(&self, registry: &Registry<'_>, id: PageId, sink: &mut impl EdgeSink) {
        let page = registry.pages[id.0];
        let weight = self.config.link_weights.sequential;
        for neighbour in [&page.next_in_section, &page.prev_in_section]
            .into_iter()
            .flatten()
        {
            if let Some(target) = registry.id(neighbour) {
                sink.record(Some(id), target, LinkType::Sequential, weight);
            }
        }
    }

    fn resolve_workers(&self) -> usize {
        let env_workers = std::env::var(ENV_MAX_WORKERS)
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|n| *n > 0);
        self.workers
            .or(env_workers)
            .or(self.config.max_workers)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }
}

/// Run one page's analysis, containing both errors and panics
fn analyze_isolated<F>(registry: &Registry<'_>, id: PageId, analyze: &F) -> Option<PagePartial>
where
    F: Fn(&Registry<'_>, PageId) -> Result<PagePartial>,
{
    let path = registry.pages[id.0].source_path.display();
    match panic::catch_unwind(AssertUnwindSafe(|| analyze(registry, id))) {
        Ok(Ok(partial)) => Some(partial),
        Ok(Err(e)) => {
            log::warn!("Skipping page: {}", e);
            None
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("Graph worker panicked on {}: {}", path, message);
            None
        }
    }
}

fn check_page(page: &Page) -> Result<()> {
    if page.source_path.as_os_str().is_empty() {
        return Err(Error::invalid_page(
            &page.source_path,
            format!("page '{}' has no source path", page.title),
        ));
    }
    Ok(())
}

/// Interpret an on/off switch value; unknown values are ignored
pub fn parse_switch(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Mode precedence: explicit > environment > site config > automatic
pub fn select_mode(
    explicit: Option<bool>,
    env_value: Option<&str>,
    config_flag: Option<bool>,
    parallel_threshold: usize,
    page_count: usize,
) -> BuildMode {
    let parallel = explicit
        .or_else(|| env_value.and_then(parse_switch))
        .or(config_flag)
        .unwrap_or(page_count >= parallel_threshold);
    if parallel {
        BuildMode::Parallel
    } else {
        BuildMode::Sequential
    }
}
