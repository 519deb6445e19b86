//! Connectivity scoring and page classification.
//!
//! Provides hub, leaf and orphan detection, layer partitioning,
//! aggregate metrics and strongly connected clusters.

use crate::graph::{LinkGraph, PageId};
use petgraph::algo::kosaraju_scc;
use serde::{Deserialize, Serialize};
use sitegraph_core::prelude::*;
use std::path::{Path, PathBuf};

/// Aggregate graph statistics for reporting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphMetrics {
    /// Number of analysis pages
    pub total_pages: usize,
    /// Distinct links leaving analysis pages
    pub total_links: usize,
    pub avg_connectivity: f64,
    pub hub_count: usize,
    pub leaf_count: usize,
    pub orphan_count: usize,
}

/// Analysis pages split by connectivity rank
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageLayers {
    /// Top 10%
    pub hubs: Vec<PathBuf>,
    /// Next 30%
    pub mid_tier: Vec<PathBuf>,
    /// Remainder
    pub leaves: Vec<PathBuf>,
}

/// Analysis pages bucketed by weighted connectivity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityReport {
    /// Connectivity 0
    pub isolated: Vec<PathBuf>,
    /// Connectivity below 2
    pub lightly_linked: Vec<PathBuf>,
    /// Connectivity 2 to 5
    pub adequately_linked: Vec<PathBuf>,
    /// Connectivity above 5
    pub well_linked: Vec<PathBuf>,
    pub total_analyzed: usize,
}

/// Bucket shares in percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityDistribution {
    pub isolated: f64,
    pub lightly_linked: f64,
    pub adequately_linked: f64,
    pub well_linked: f64,
}

impl ConnectivityReport {
    pub fn distribution(&self) -> ConnectivityDistribution {
        if self.total_analyzed == 0 {
            return ConnectivityDistribution::default();
        }
        let pct = |bucket: &Vec<PathBuf>| bucket.len() as f64 * 100.0 / self.total_analyzed as f64;
        ConnectivityDistribution {
            isolated: pct(&self.isolated),
            lightly_linked: pct(&self.lightly_linked),
            adequately_linked: pct(&self.adequately_linked),
            well_linked: pct(&self.well_linked),
        }
    }
}

/// Read-only classification queries over a built graph
pub struct GraphAnalyzer<'a> {
    graph: &'a LinkGraph,
    hub_threshold: f64,
    leaf_threshold: f64,
}

impl<'a> GraphAnalyzer<'a> {
    pub fn new(graph: &'a LinkGraph, config: &GraphConfig) -> Self {
        Self {
            graph,
            hub_threshold: config.hub_threshold,
            leaf_threshold: config.leaf_threshold,
        }
    }

    /// Weighted incoming plus distinct outgoing
    pub fn connectivity(&self, id: PageId) -> f64 {
        self.graph.incoming_weight(id) + self.graph.outgoing(id).len() as f64
    }

    pub fn connectivity_score(&self, path: &Path) -> Result<f64> {
        let id = self.graph.require(path)?;
        Ok(self.connectivity(id))
    }

    /// Connectivity with the incoming weight truncated, for display
    pub fn connectivity_display(&self, path: &Path) -> Result<usize> {
        let id = self.graph.require(path)?;
        Ok(self.graph.incoming_weight(id) as usize + self.graph.outgoing(id).len())
    }

    /// Pages with incoming weight at or above the threshold, highest first
    pub fn hubs(&self, threshold: Option<f64>) -> Vec<PathBuf> {
        let threshold = threshold.unwrap_or(self.hub_threshold);
        let mut hubs: Vec<PageId> = self
            .graph
            .analysis_pages()
            .iter()
            .copied()
            .filter(|&id| self.graph.incoming_weight(id) >= threshold)
            .collect();
        hubs.sort_by(|&a, &b| {
            self.graph
                .incoming_weight(b)
                .total_cmp(&self.graph.incoming_weight(a))
                .then_with(|| self.graph.path(a).cmp(self.graph.path(b)))
        });
        self.paths(hubs)
    }

    /// Pages with connectivity at or below the threshold, lowest first
    pub fn leaves(&self, threshold: Option<f64>) -> Vec<PathBuf> {
        let threshold = threshold.unwrap_or(self.leaf_threshold);
        let mut leaves: Vec<PageId> = self
            .graph
            .analysis_pages()
            .iter()
            .copied()
            .filter(|&id| self.connectivity(id) <= threshold)
            .collect();
        leaves.sort_by(|&a, &b| {
            self.connectivity(a)
                .total_cmp(&self.connectivity(b))
                .then_with(|| self.graph.path(a).cmp(self.graph.path(b)))
        });
        self.paths(leaves)
    }

    /// Pages with no incoming and no outgoing links, ordered by slug
    pub fn orphans(&self) -> Vec<PathBuf> {
        let mut orphans: Vec<(String, PageId)> = self
            .graph
            .analysis_pages()
            .iter()
            .copied()
            .filter(|&id| self.is_orphan(id))
            .map(|id| (self.graph.page(id).slug(), id))
            .collect();
        orphans.sort_by(|(sa, a), (sb, b)| {
            sa.cmp(sb)
                .then_with(|| self.graph.path(*a).cmp(self.graph.path(*b)))
        });
        orphans
            .into_iter()
            .map(|(_, id)| self.graph.path(id).to_path_buf())
            .collect()
    }

    pub fn is_orphan(&self, id: PageId) -> bool {
        self.graph.incoming_weight(id) == 0.0 && self.graph.outgoing(id).is_empty()
    }

    /// Split analysis pages at the 10% and 40% connectivity ranks
    pub fn layers(&self) -> PageLayers {
        let mut ranked: Vec<PageId> = self.graph.analysis_pages().to_vec();
        ranked.sort_by(|&a, &b| {
            self.connectivity(b)
                .total_cmp(&self.connectivity(a))
                .then_with(|| self.graph.path(a).cmp(self.graph.path(b)))
        });

        let n = ranked.len();
        let hub_cut = n / 10;
        let mid_cut = n * 4 / 10;
        let leaves = ranked.split_off(mid_cut);
        let mid_tier = ranked.split_off(hub_cut);

        PageLayers {
            hubs: self.paths(ranked),
            mid_tier: self.paths(mid_tier),
            leaves: self.paths(leaves),
        }
    }

    pub fn metrics(&self) -> GraphMetrics {
        let pages = self.graph.analysis_pages();
        if pages.is_empty() {
            return GraphMetrics::default();
        }

        let total_links = pages.iter().map(|&id| self.graph.outgoing(id).len()).sum();
        let total_connectivity: f64 = pages.iter().map(|&id| self.connectivity(id)).sum();

        GraphMetrics {
            total_pages: pages.len(),
            total_links,
            avg_connectivity: total_connectivity / pages.len() as f64,
            hub_count: self.hubs(None).len(),
            leaf_count: self.leaves(None).len(),
            orphan_count: pages.iter().filter(|&&id| self.is_orphan(id)).count(),
        }
    }

    pub fn connectivity_report(&self) -> ConnectivityReport {
        let mut report = ConnectivityReport {
            total_analyzed: self.graph.analysis_pages().len(),
            ..Default::default()
        };

        for &id in self.graph.analysis_pages() {
            let score = self.connectivity(id);
            let path = self.graph.path(id).to_path_buf();
            if score == 0.0 {
                report.isolated.push(path);
            } else if score < 2.0 {
                report.lightly_linked.push(path);
            } else if score <= 5.0 {
                report.adequately_linked.push(path);
            } else {
                report.well_linked.push(path);
            }
        }

        report
    }

    /// Groups of two or more pages that can all reach each other
    pub fn strongly_connected_clusters(&self) -> Vec<Vec<PathBuf>> {
        let digraph = self.graph.to_digraph();
        let mut clusters: Vec<Vec<PathBuf>> = kosaraju_scc(&digraph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|component| {
                let mut paths: Vec<PathBuf> =
                    component.into_iter().map(|n| digraph[n].clone()).collect();
                paths.sort();
                paths
            })
            .collect();
        clusters.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        clusters
    }

    fn paths(&self, ids: Vec<PageId>) -> Vec<PathBuf> {
        ids.into_iter()
            .map(|id| self.graph.path(id).to_path_buf())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitegraph_core::models::MenuItem;

    fn build(site: &Site) -> LinkGraph {
        crate::GraphBuilder::new(site, &GraphConfig::default())
            .parallel(false)
            .build()
    }

    fn hub_site() -> Site {
        let mut pages = vec![Page::new("hub.md")];
        for i in 0..4 {
            pages.push(Page::new(format!("p{}.md", i)).with_related(["hub.md"]));
        }
        pages.push(Page::new("lonely.md"));
        Site::new(pages).with_menu("main", vec![MenuItem::for_page("Hub", "hub.md")])
    }

    #[test]
    fn test_connectivity_score() {
        let site = hub_site();
        let graph = build(&site);
        let analyzer = GraphAnalyzer::new(&graph, &GraphConfig::default());

        // related 4 × 1.0 + menu 10.0
        assert_eq!(analyzer.connectivity_score(Path::new("hub.md")).unwrap(), 14.0);
        assert_eq!(analyzer.connectivity_score(Path::new("p0.md")).unwrap(), 1.0);
        assert!(analyzer.connectivity_score(Path::new("nope.md")).is_err());
    }

    #[test]
    fn test_connectivity_display_truncates_incoming() {
        let site = Site::new(vec![
            Page::new("a.md").with_next("b.md"),
            Page::new("b.md"),
        ]);
        let graph = build(&site);
        let analyzer = GraphAnalyzer::new(&graph, &GraphConfig::default());
        assert_eq!(analyzer.connectivity_score(Path::new("b.md")).unwrap(), 0.25);
        assert_eq!(analyzer.connectivity_display(Path::new("b.md")).unwrap(), 0);
    }

    #[test]
    fn test_hubs_leaves_orphans() {
        let site = hub_site();
        let graph = build(&site);
        let analyzer = GraphAnalyzer::new(&graph, &GraphConfig::default());

        assert_eq!(analyzer.hubs(None), vec![PathBuf::from("hub.md")]);
        assert!(analyzer.hubs(Some(100.0)).is_empty());

        let leaves = analyzer.leaves(None);
        assert_eq!(leaves.first(), Some(&PathBuf::from("lonely.md")));
        assert_eq!(leaves.len(), 5);

        assert_eq!(analyzer.orphans(), vec![PathBuf::from("lonely.md")]);
    }

    #[test]
    fn test_orphans_sorted_by_slug_and_skip_generated() {
        let site = Site::new(vec![
            Page::new("z.md").with_slug("alpha"),
            Page::new("a.md").with_slug("beta"),
            Page::new("tags/index.md").generated(),
        ]);
        let graph = build(&site);
        let analyzer = GraphAnalyzer::new(&graph, &GraphConfig::default());
        assert_eq!(
            analyzer.orphans(),
            vec![PathBuf::from("z.md"), PathBuf::from("a.md")]
        );
    }

    #[test]
    fn test_layers_cut_points() {
        let mut pages = Vec::new();
        for i in 0..10 {
            let mut page = Page::new(format!("p{}.md", i));
            // p0 links to everything, p1 to everything after it, ...
            let targets: Vec<String> = (i + 1..10).map(|j| format!("p{}.md", j)).collect();
            page = page.with_related(targets);
            pages.push(page);
        }
        let site = Site::new(pages);
        let graph = build(&site);
        let analyzer = GraphAnalyzer::new(&graph, &GraphConfig::default());

        let layers = analyzer.layers();
        assert_eq!(layers.hubs.len(), 1);
        assert_eq!(layers.mid_tier.len(), 3);
        assert_eq!(layers.leaves.len(), 6);
    }

    #[test]
    fn test_layers_small_graph_are_all_leaves() {
        let site = Site::new(vec![Page::new("a.md"), Page::new("b.md")]);
        let graph = build(&site);
        let layers = GraphAnalyzer::new(&graph, &GraphConfig::default()).layers();
        assert!(layers.hubs.is_empty());
        assert!(layers.mid_tier.is_empty());
        assert_eq!(layers.leaves.len(), 2);
    }

    #[test]
    fn test_metrics() {
        let site = hub_site();
        let graph = build(&site);
        let metrics = GraphAnalyzer::new(&graph, &GraphConfig::default()).metrics();

        assert_eq!(metrics.total_pages, 6);
        assert_eq!(metrics.total_links, 4);
        assert_eq!(metrics.hub_count, 1);
        assert_eq!(metrics.orphan_count, 1);
        // hub 14 + four spokes at 1 + lonely 0
        assert!((metrics.avg_connectivity - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_metrics_empty_graph() {
        let site = Site::default();
        let graph = build(&site);
        let metrics = GraphAnalyzer::new(&graph, &GraphConfig::default()).metrics();
        assert_eq!(metrics, GraphMetrics::default());
    }

    #[test]
    fn test_connectivity_report_buckets() {
        let site = hub_site();
        let graph = build(&site);
        let report = GraphAnalyzer::new(&graph, &GraphConfig::default()).connectivity_report();

        assert_eq!(report.total_analyzed, 6);
        assert_eq!(report.isolated.len(), 1);
        assert_eq!(report.lightly_linked.len(), 4);
        assert_eq!(report.well_linked, vec![PathBuf::from("hub.md")]);

        let distribution = report.distribution();
        let total = distribution.isolated
            + distribution.lightly_linked
            + distribution.adequately_linked
            + distribution.well_linked;
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_strongly_connected_clusters() {
        let site = Site::new(vec![
            Page::new("a.md").with_related(["b.md"]),
            Page::new("b.md").with_related(["c.md"]),
            Page::new("c.md").with_related(["a.md"]),
            Page::new("d.md").with_related(["a.md"]),
        ]);
        let graph = build(&site);
        let clusters = GraphAnalyzer::new(&graph, &GraphConfig::default())
            .strongly_connected_clusters();
        assert_eq!(clusters.len(), 1);
        assert_eq!(
            clusters[0],
            vec![
                PathBuf::from("a.md"),
                PathBuf::from("b.md"),
                PathBuf::from("c.md")
            ]
        );
    }
}
