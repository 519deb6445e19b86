//! Built site graph: adjacency, reverse adjacency and link provenance

use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use sitegraph_core::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Dense index of a page inside a [`LinkGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId(pub(crate) usize);

impl PageId {
    /// Position of the page in [`LinkGraph::pages`]
    pub fn index(self) -> usize {
        self.0
    }
}

/// How the graph was built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Sequential,
    Parallel,
}

/// Bookkeeping from the last build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStats {
    pub mode: BuildMode,
    pub workers: usize,
    pub pages_analyzed: usize,
    pub pages_failed: usize,
    pub duration_ms: u64,
}

impl Default for BuildStats {
    fn default() -> Self {
        Self {
            mode: BuildMode::Sequential,
            workers: 1,
            pages_analyzed: 0,
            pages_failed: 0,
            duration_ms: 0,
        }
    }
}

/// Weighted incoming credit per link type for one page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkMetrics {
    pub explicit: f64,
    pub taxonomy: f64,
    pub related: f64,
    pub menu: f64,
    pub topical: f64,
    pub sequential: f64,
}

impl LinkMetrics {
    /// Credit for one link type
    pub fn get(&self, link_type: LinkType) -> f64 {
        match link_type {
            LinkType::Explicit => self.explicit,
            LinkType::Taxonomy => self.taxonomy,
            LinkType::Related => self.related,
            LinkType::Menu => self.menu,
            LinkType::Topical => self.topical,
            LinkType::Sequential => self.sequential,
        }
    }

    pub(crate) fn add(&mut self, link_type: LinkType, weight: f64) {
        let slot = match link_type {
            LinkType::Explicit => &mut self.explicit,
            LinkType::Taxonomy => &mut self.taxonomy,
            LinkType::Related => &mut self.related,
            LinkType::Menu => &mut self.menu,
            LinkType::Topical => &mut self.topical,
            LinkType::Sequential => &mut self.sequential,
        };
        *slot += weight;
    }

    /// Sum over all link types
    pub fn total(&self) -> f64 {
        LinkType::ALL.iter().map(|t| self.get(*t)).sum()
    }

    /// Link type carrying the most credit, if any
    pub fn dominant(&self) -> Option<LinkType> {
        LinkType::ALL
            .iter()
            .copied()
            .filter(|t| self.get(*t) > 0.0)
            .max_by(|a, b| self.get(*a).total_cmp(&self.get(*b)))
    }
}

/// Directed, weighted graph of site pages.
///
/// Built once by [`GraphBuilder`](crate::GraphBuilder) and read-only
/// afterwards. Every per-page table is indexed by [`PageId`].
#[derive(Debug, Clone)]
pub struct LinkGraph {
    pages: Vec<Page>,
    path_index: HashMap<PathBuf, PageId>,
    outgoing_refs: Vec<BTreeSet<PageId>>,
    incoming_refs: Vec<f64>,
    incoming_edges: Vec<Vec<PageId>>,
    link_types: HashMap<(Option<PageId>, PageId), LinkType>,
    link_metrics: Vec<LinkMetrics>,
    analysis_pages: Vec<PageId>,
    is_analysis: Vec<bool>,
    stats: BuildStats,
}

impl LinkGraph {
    /// Graph with pages registered and no edges
    pub(crate) fn with_pages(pages: Vec<Page>, include_generated: bool) -> Self {
        let n = pages.len();
        let mut path_index = HashMap::with_capacity(n);
        let mut analysis_pages = Vec::with_capacity(n);
        let mut is_analysis = vec![false; n];

        for (i, page) in pages.iter().enumerate() {
            path_index.insert(page.source_path.clone(), PageId(i));
            if include_generated || !page.is_generated() {
                analysis_pages.push(PageId(i));
                is_analysis[i] = true;
            }
        }

        Self {
            pages,
            path_index,
            outgoing_refs: vec![BTreeSet::new(); n],
            incoming_refs: vec![0.0; n],
            incoming_edges: vec![Vec::new(); n],
            link_types: HashMap::new(),
            link_metrics: vec![LinkMetrics::default(); n],
            analysis_pages,
            is_analysis,
            stats: BuildStats::default(),
        }
    }

    /// Record one edge. `None` source is a graph-level boost with no origin page.
    pub(crate) fn record(
        &mut self,
        source: Option<PageId>,
        target: PageId,
        link_type: LinkType,
        weight: f64,
    ) {
        if source == Some(target) {
            return;
        }
        if let Some(src) = source {
            self.outgoing_refs[src.0].insert(target);
            self.incoming_edges[target.0].push(src);
        }
        self.incoming_refs[target.0] += weight;
        merge_link_type(&mut self.link_types, (source, target), link_type);
    }

    /// Fold a worker's page-local result into the graph
    pub(crate) fn absorb(&mut self, partial: PagePartial) {
        for (target, weight) in partial.incoming_refs {
            self.incoming_refs[target.0] += weight;
        }
        for (source, targets) in partial.outgoing_refs {
            self.outgoing_refs[source.0].extend(targets);
        }
        for (target, sources) in partial.incoming_edges {
            self.incoming_edges[target.0].extend(sources);
        }
        for (key, link_type) in partial.link_types {
            merge_link_type(&mut self.link_types, key, link_type);
        }
    }

    /// Tally provenance into per-page metrics, crediting untracked weight as explicit
    pub(crate) fn finalize(&mut self, weights: &LinkWeights, stats: BuildStats) {
        let mut metrics = vec![LinkMetrics::default(); self.pages.len()];
        for (&(_, target), &link_type) in &self.link_types {
            metrics[target.0].add(link_type, weights.weight(link_type));
        }
        for (i, m) in metrics.iter_mut().enumerate() {
            let gap = self.incoming_refs[i] - m.total();
            if gap > 1e-9 {
                m.add(LinkType::Explicit, gap);
            }
        }
        self.link_metrics = metrics;
        self.stats = stats;
    }

    /// Number of registered pages (including generated pages)
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Number of distinct page-to-page edges
    pub fn edge_count(&self) -> usize {
        self.outgoing_refs.iter().map(BTreeSet::len).sum()
    }

    /// All pages with their ids
    pub fn pages(&self) -> impl Iterator<Item = (PageId, &Page)> {
        self.pages.iter().enumerate().map(|(i, p)| (PageId(i), p))
    }

    pub fn page(&self, id: PageId) -> &Page {
        &self.pages[id.0]
    }

    pub fn path(&self, id: PageId) -> &Path {
        &self.pages[id.0].source_path
    }

    /// Look up a page id by source path
    pub fn id(&self, path: &Path) -> Option<PageId> {
        self.path_index.get(path).copied()
    }

    /// Look up a page id, failing with `PageNotFound`
    pub fn require(&self, path: &Path) -> Result<PageId> {
        self.id(path).ok_or_else(|| Error::page_not_found(path))
    }

    /// Pages every algorithm iterates over
    pub fn analysis_pages(&self) -> &[PageId] {
        &self.analysis_pages
    }

    pub fn is_analysis_page(&self, id: PageId) -> bool {
        self.is_analysis[id.0]
    }

    /// Deduplicated outgoing targets
    pub fn outgoing(&self, id: PageId) -> &BTreeSet<PageId> {
        &self.outgoing_refs[id.0]
    }

    /// Weighted incoming reference total
    pub fn incoming_weight(&self, id: PageId) -> f64 {
        self.incoming_refs[id.0]
    }

    /// Reverse adjacency; a source may appear more than once
    pub fn incoming_edges(&self, id: PageId) -> &[PageId] {
        &self.incoming_edges[id.0]
    }

    /// Provenance of an edge; `None` source asks for graph-level boosts
    pub fn link_type(&self, source: Option<PageId>, target: PageId) -> Option<LinkType> {
        self.link_types.get(&(source, target)).copied()
    }

    /// Number of provenance entries
    pub fn link_type_count(&self) -> usize {
        self.link_types.len()
    }

    pub fn link_metrics(&self, id: PageId) -> &LinkMetrics {
        &self.link_metrics[id.0]
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Pages this page links to
    pub fn forward_links(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let id = self.require(path)?;
        Ok(self
            .outgoing(id)
            .iter()
            .map(|&t| self.path(t).to_path_buf())
            .collect())
    }

    /// Pages linking to this page, deduplicated
    pub fn backlinks(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let id = self.require(path)?;
        let sources: BTreeSet<PageId> = self.incoming_edges(id).iter().copied().collect();
        Ok(sources
            .into_iter()
            .map(|s| self.path(s).to_path_buf())
            .collect())
    }

    /// Check the adjacency invariants: mutual consistency and no self-loops
    pub fn verify_invariants(&self) -> Result<()> {
        for (s, targets) in self.outgoing_refs.iter().enumerate() {
            for t in targets {
                if t.0 == s {
                    return Err(Error::other(format!(
                        "self-loop on {}",
                        self.pages[s].source_path.display()
                    )));
                }
                if !self.incoming_edges[t.0].contains(&PageId(s)) {
                    return Err(Error::other(format!(
                        "{} -> {} missing from reverse index",
                        self.pages[s].source_path.display(),
                        self.pages[t.0].source_path.display()
                    )));
                }
            }
        }
        for (t, sources) in self.incoming_edges.iter().enumerate() {
            for s in sources {
                if !self.outgoing_refs[s.0].contains(&PageId(t)) {
                    return Err(Error::other(format!(
                        "reverse edge {} <- {} has no forward edge",
                        self.pages[t].source_path.display(),
                        self.pages[s.0].source_path.display()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Export the analysis subgraph for visualisation
    pub fn to_digraph(&self) -> DiGraph<PathBuf, LinkType> {
        let mut graph = DiGraph::with_capacity(self.analysis_pages.len(), self.edge_count());
        let mut nodes = HashMap::with_capacity(self.analysis_pages.len());
        for &id in &self.analysis_pages {
            nodes.insert(id, graph.add_node(self.path(id).to_path_buf()));
        }
        for &source in &self.analysis_pages {
            for target in self.outgoing(source) {
                if let Some(&t) = nodes.get(target) {
                    let link_type = self
                        .link_type(Some(source), *target)
                        .unwrap_or(LinkType::Explicit);
                    graph.add_edge(nodes[&source], t, link_type);
                }
            }
        }
        graph
    }

    /// Compact adjacency restricted to analysis pages
    pub(crate) fn analysis_view(&self) -> AnalysisView {
        let nodes = self.analysis_pages.clone();
        let mut local = vec![None; self.pages.len()];
        for (i, id) in nodes.iter().enumerate() {
            local[id.0] = Some(i);
        }

        let out = nodes
            .iter()
            .map(|id| {
                self.outgoing_refs[id.0]
                    .iter()
                    .filter_map(|t| local[t.0])
                    .collect::<Vec<_>>()
            })
            .collect();

        let inc = nodes
            .iter()
            .map(|id| {
                let mut sources: Vec<usize> = self.incoming_edges[id.0]
                    .iter()
                    .filter_map(|s| local[s.0])
                    .collect();
                sources.sort_unstable();
                sources.dedup();
                sources
            })
            .collect();

        AnalysisView {
            nodes,
            local,
            out,
            inc,
        }
    }
}

/// Later sources in builder order win, so sequential and parallel builds agree
fn merge_link_type(
    link_types: &mut HashMap<(Option<PageId>, PageId), LinkType>,
    key: (Option<PageId>, PageId),
    link_type: LinkType,
) {
    link_types
        .entry(key)
        .and_modify(|existing| {
            if link_type > *existing {
                *existing = link_type;
            }
        })
        .or_insert(link_type);
}

/// Page-local result returned by a builder worker
#[derive(Debug, Default)]
pub(crate) struct PagePartial {
    pub incoming_refs: HashMap<PageId, f64>,
    pub outgoing_refs: HashMap<PageId, BTreeSet<PageId>>,
    pub incoming_edges: HashMap<PageId, Vec<PageId>>,
    pub link_types: HashMap<(Option<PageId>, PageId), LinkType>,
}

impl PagePartial {
    pub(crate) fn record(
        &mut self,
        source: Option<PageId>,
        target: PageId,
        link_type: LinkType,
        weight: f64,
    ) {
        if source == Some(target) {
            return;
        }
        if let Some(src) = source {
            self.outgoing_refs.entry(src).or_default().insert(target);
            self.incoming_edges.entry(target).or_default().push(src);
        }
        *self.incoming_refs.entry(target).or_default() += weight;
        merge_link_type(&mut self.link_types, (source, target), link_type);
    }
}

/// Analysis pages renumbered `0..n` with deduplicated adjacency
#[derive(Debug, Clone)]
pub(crate) struct AnalysisView {
    /// Local index → page id
    pub nodes: Vec<PageId>,
    /// Page id index → local index
    pub local: Vec<Option<usize>>,
    /// Outgoing neighbours, sorted
    pub out: Vec<Vec<usize>>,
    /// Incoming neighbours, sorted and deduplicated
    pub inc: Vec<Vec<usize>>,
}

impl AnalysisView {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn local_of(&self, id: PageId) -> Option<usize> {
        self.local.get(id.0).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_of(paths: &[&str]) -> LinkGraph {
        LinkGraph::with_pages(paths.iter().map(|p| Page::new(*p)).collect(), false)
    }

    #[test]
    fn test_record_keeps_indices_consistent() {
        let mut graph = graph_of(&["a.md", "b.md"]);
        graph.record(Some(PageId(0)), PageId(1), LinkType::Explicit, 1.0);
        graph.record(Some(PageId(0)), PageId(1), LinkType::Related, 1.0);

        assert_eq!(graph.outgoing(PageId(0)).len(), 1);
        assert_eq!(graph.incoming_edges(PageId(1)).len(), 2);
        assert_eq!(graph.incoming_weight(PageId(1)), 2.0);
        assert_eq!(
            graph.link_type(Some(PageId(0)), PageId(1)),
            Some(LinkType::Related)
        );
        assert!(graph.verify_invariants().is_ok());
    }

    #[test]
    fn test_record_drops_self_loops() {
        let mut graph = graph_of(&["a.md"]);
        graph.record(Some(PageId(0)), PageId(0), LinkType::Explicit, 1.0);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.incoming_weight(PageId(0)), 0.0);
    }

    #[test]
    fn test_finalize_reconciles_untracked_weight() {
        let mut graph = graph_of(&["a.md", "b.md"]);
        // Two taxonomy terms share one provenance key
        graph.record(None, PageId(1), LinkType::Taxonomy, 1.0);
        graph.record(None, PageId(1), LinkType::Taxonomy, 1.0);
        graph.finalize(&LinkWeights::default(), BuildStats::default());

        let metrics = graph.link_metrics(PageId(1));
        assert_eq!(metrics.taxonomy, 1.0);
        assert_eq!(metrics.explicit, 1.0);
        assert_eq!(metrics.total(), graph.incoming_weight(PageId(1)));
    }

    #[test]
    fn test_generated_pages_excluded_from_analysis() {
        let pages = vec![Page::new("a.md"), Page::new("tags/x.md").generated()];
        let graph = LinkGraph::with_pages(pages.clone(), false);
        assert_eq!(graph.analysis_pages(), &[PageId(0)]);

        let graph = LinkGraph::with_pages(pages, true);
        assert_eq!(graph.analysis_pages().len(), 2);
    }

    #[test]
    fn test_analysis_view_dedups_reverse_edges() {
        let mut graph = graph_of(&["a.md", "b.md", "c.md"]);
        graph.record(Some(PageId(0)), PageId(2), LinkType::Explicit, 1.0);
        graph.record(Some(PageId(0)), PageId(2), LinkType::Sequential, 0.25);
        graph.record(Some(PageId(1)), PageId(2), LinkType::Explicit, 1.0);

        let view = graph.analysis_view();
        assert_eq!(view.len(), 3);
        assert_eq!(view.inc[2], vec![0, 1]);
        assert_eq!(view.out[0], vec![2]);
    }

    #[test]
    fn test_backlinks_and_forward_links() {
        let mut graph = graph_of(&["a.md", "b.md"]);
        graph.record(Some(PageId(0)), PageId(1), LinkType::Explicit, 1.0);

        assert_eq!(
            graph.forward_links(Path::new("a.md")).unwrap(),
            vec![PathBuf::from("b.md")]
        );
        assert_eq!(
            graph.backlinks(Path::new("b.md")).unwrap(),
            vec![PathBuf::from("a.md")]
        );
        assert!(graph.backlinks(Path::new("missing.md")).is_err());
    }

    #[test]
    fn test_to_digraph_exports_analysis_subgraph() {
        let pages = vec![
            Page::new("a.md"),
            Page::new("b.md"),
            Page::new("tags/x.md").generated(),
        ];
        let mut graph = LinkGraph::with_pages(pages, false);
        graph.record(Some(PageId(0)), PageId(1), LinkType::Explicit, 1.0);
        graph.record(Some(PageId(2)), PageId(0), LinkType::Explicit, 1.0);

        let dg = graph.to_digraph();
        assert_eq!(dg.node_count(), 2);
        assert_eq!(dg.edge_count(), 1);
    }

    #[test]
    fn test_link_metrics_dominant() {
        let metrics = LinkMetrics {
            menu: 10.0,
            explicit: 2.0,
            ..Default::default()
        };
        assert_eq!(metrics.dominant(), Some(LinkType::Menu));
        assert_eq!(LinkMetrics::default().dominant(), None);
    }
}
