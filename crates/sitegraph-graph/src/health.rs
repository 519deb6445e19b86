//! Site link health analysis.
//!
//! Summarises how well the site's pages are woven together: orphans,
//! dead ends, underlinked pages and hubs, rolled into a 0-100 score with
//! recommendations.

use crate::analyzer::{GraphAnalyzer, GraphMetrics};
use crate::graph::{LinkGraph, PageId};
use serde::{Deserialize, Serialize};
use sitegraph_core::prelude::*;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Hubs listed in a report
const TOP_HUBS: usize = 5;

/// Average connectivity below which the score is penalised
const TARGET_AVG_CONNECTIVITY: f64 = 2.0;

/// Health analysis report for a site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub metrics: GraphMetrics,
    /// No incoming and no outgoing links
    pub orphaned_pages: Vec<PathBuf>,
    /// Linked to but linking nowhere
    pub dead_end_pages: Vec<PathBuf>,
    /// Incoming weight at or below the underlinked threshold
    pub underlinked_pages: Vec<PathBuf>,
    /// Highest incoming weight first
    pub hub_pages: Vec<(PathBuf, f64)>,
    /// Overall health score (0-100)
    pub health_score: u8,
    pub recommendations: Vec<String>,
}

impl HealthReport {
    /// Create a new empty health report
    pub fn new() -> Self {
        Self {
            metrics: GraphMetrics::default(),
            orphaned_pages: Vec::new(),
            dead_end_pages: Vec::new(),
            underlinked_pages: Vec::new(),
            hub_pages: Vec::new(),
            health_score: 100,
            recommendations: Vec::new(),
        }
    }

    /// Calculate health score based on issues
    pub fn calculate_score(&mut self) {
        let total = self.metrics.total_pages;
        if total == 0 {
            self.health_score = 0;
            return;
        }
        let total = total as f64;

        let mut score = 100.0;
        // up to -30
        score -= self.orphaned_pages.len() as f64 / total * 30.0;
        // up to -20
        score -= self.metrics.leaf_count as f64 / total * 20.0;
        // up to -10
        score -= self.dead_end_pages.len() as f64 / total * 10.0;
        // up to -20
        if self.metrics.avg_connectivity < TARGET_AVG_CONNECTIVITY {
            score -= (TARGET_AVG_CONNECTIVITY - self.metrics.avg_connectivity)
                / TARGET_AVG_CONNECTIVITY
                * 20.0;
        }

        self.health_score = score.clamp(0.0, 100.0) as u8;
    }

    /// Check if the site is healthy (score >= 80)
    pub fn is_healthy(&self) -> bool {
        self.health_score >= 80
    }

    /// Plain-text summary for logs and terminals
    pub fn format_stats(&self) -> String {
        let m = &self.metrics;
        let mut out = String::new();
        let _ = writeln!(out, "Site graph health: {}/100", self.health_score);
        let _ = writeln!(out, "  Pages:            {}", m.total_pages);
        let _ = writeln!(out, "  Links:            {}", m.total_links);
        let _ = writeln!(out, "  Avg connectivity: {:.2}", m.avg_connectivity);
        let _ = writeln!(out, "  Hubs:             {}", m.hub_count);
        let _ = writeln!(out, "  Leaves:           {}", m.leaf_count);
        let _ = writeln!(out, "  Orphans:          {}", m.orphan_count);
        let _ = writeln!(out, "  Dead ends:        {}", self.dead_end_pages.len());
        let _ = writeln!(out, "  Underlinked:      {}", self.underlinked_pages.len());
        if !self.recommendations.is_empty() {
            let _ = writeln!(out, "Recommendations:");
            for rec in &self.recommendations {
                let _ = writeln!(out, "  - {}", rec);
            }
        }
        out
    }

    /// Pretty-printed JSON for reporting collaborators
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::other(format!("Failed to serialize health report: {}", e)))
    }

    fn recommend(&mut self) {
        let mut recs = Vec::new();
        if !self.orphaned_pages.is_empty() {
            recs.push(format!(
                "Link to {} orphaned page(s) from related content or a menu",
                self.orphaned_pages.len()
            ));
        }
        if !self.underlinked_pages.is_empty() {
            recs.push(format!(
                "Add incoming links to {} underlinked page(s)",
                self.underlinked_pages.len()
            ));
        }
        if !self.dead_end_pages.is_empty() {
            recs.push(format!(
                "Add onward links to {} dead-end page(s)",
                self.dead_end_pages.len()
            ));
        }
        if self.metrics.total_pages > 0 && self.metrics.avg_connectivity < TARGET_AVG_CONNECTIVITY
        {
            recs.push(format!(
                "Average connectivity is {:.2}; aim for at least {:.0} by cross-linking related pages",
                self.metrics.avg_connectivity, TARGET_AVG_CONNECTIVITY
            ));
        }
        self.recommendations = recs;
    }
}

impl Default for HealthReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Site health analyzer
pub struct HealthAnalyzer<'a> {
    graph: &'a LinkGraph,
    analyzer: GraphAnalyzer<'a>,
    underlinked_threshold: f64,
}

impl<'a> HealthAnalyzer<'a> {
    pub fn new(graph: &'a LinkGraph, config: &GraphConfig) -> Self {
        Self {
            graph,
            analyzer: GraphAnalyzer::new(graph, config),
            underlinked_threshold: config.suggestions.underlinked_threshold,
        }
    }

    /// Run a comprehensive health analysis
    pub fn analyze(&self) -> HealthReport {
        let mut report = HealthReport::new();
        report.metrics = self.analyzer.metrics();
        report.orphaned_pages = self.analyzer.orphans();
        report.dead_end_pages = self.find_dead_end_pages();
        report.underlinked_pages = self.find_underlinked_pages();
        report.hub_pages = self.find_hub_pages(TOP_HUBS);
        report.calculate_score();
        report.recommend();
        report
    }

    /// Quick health check (just metrics and orphans)
    pub fn quick_check(&self) -> HealthReport {
        let mut report = HealthReport::new();
        report.metrics = self.analyzer.metrics();
        report.orphaned_pages = self.analyzer.orphans();
        report.calculate_score();
        report
    }

    fn find_dead_end_pages(&self) -> Vec<PathBuf> {
        self.collect(|id| {
            self.graph.outgoing(id).is_empty() && self.graph.incoming_weight(id) > 0.0
        })
    }

    /// Underlinked but not orphaned
    fn find_underlinked_pages(&self) -> Vec<PathBuf> {
        self.collect(|id| {
            let incoming = self.graph.incoming_weight(id);
            incoming <= self.underlinked_threshold && !self.analyzer.is_orphan(id)
        })
    }

    fn find_hub_pages(&self, limit: usize) -> Vec<(PathBuf, f64)> {
        let mut hubs: Vec<(PathBuf, f64)> = self
            .graph
            .analysis_pages()
            .iter()
            .map(|&id| (self.graph.path(id).to_path_buf(), self.graph.incoming_weight(id)))
            .filter(|(_, incoming)| *incoming > 0.0)
            .collect();
        hubs.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        hubs.truncate(limit);
        hubs
    }

    fn collect(&self, keep: impl Fn(PageId) -> bool) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .graph
            .analysis_pages()
            .iter()
            .copied()
            .filter(|&id| keep(id))
            .map(|id| self.graph.path(id).to_path_buf())
            .collect();
        paths.sort();
        paths
    }
}
