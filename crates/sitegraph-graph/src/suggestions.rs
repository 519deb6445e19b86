//! Link suggestions from topical overlap and graph signals.
//!
//! Candidates come from inverted tag and category indices, so each page
//! is only compared with pages sharing a term, plus every underlinked
//! page. Scores combine term overlap, PageRank, betweenness and an
//! underlinked bonus; PageRank and betweenness only count when their
//! results are supplied.

use crate::graph::{LinkGraph, PageId};
use crate::pagerank::PageRankResults;
use crate::paths::PathAnalysisResults;
use serde::{Deserialize, Serialize};
use sitegraph_core::normalize_term;
use sitegraph_core::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Shared terms listed in a reason
const MAX_TERMS_IN_REASON: usize = 3;

/// Proposed link from `source` to `target`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSuggestion {
    pub source: PathBuf,
    pub target: PathBuf,
    pub score: f64,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkSuggestionResults {
    /// Grouped by source page, best first within each group
    pub suggestions: Vec<LinkSuggestion>,
    pub pages_analyzed: usize,
}

impl LinkSuggestionResults {
    pub fn suggestions_for_page(&self, path: &Path, limit: usize) -> Vec<&LinkSuggestion> {
        self.suggestions
            .iter()
            .filter(|s| s.source == path)
            .take(limit)
            .collect()
    }

    /// Best suggestions across all pages
    pub fn top_suggestions(&self, limit: usize) -> Vec<&LinkSuggestion> {
        let mut all: Vec<&LinkSuggestion> = self.suggestions.iter().collect();
        all.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.source.cmp(&b.source))
                .then_with(|| a.target.cmp(&b.target))
        });
        all.truncate(limit);
        all
    }

    pub fn len(&self) -> usize {
        self.suggestions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty()
    }
}

/// Normalised per-page term sets and their inverted index
#[derive(Default)]
struct TermIndex {
    terms: HashMap<PageId, BTreeSet<String>>,
    pages: HashMap<String, Vec<PageId>>,
}

impl TermIndex {
    fn build<'p>(pages: impl Iterator<Item = (PageId, &'p [String])>) -> Self {
        let mut index = Self::default();
        for (id, raw) in pages {
            let set: BTreeSet<String> = raw
                .iter()
                .map(|t| normalize_term(t))
                .filter(|t| !t.is_empty())
                .collect();
            for term in &set {
                index.pages.entry(term.clone()).or_default().push(id);
            }
            index.terms.insert(id, set);
        }
        index
    }

    fn terms(&self, id: PageId) -> Option<&BTreeSet<String>> {
        self.terms.get(&id)
    }

    /// `|shared| / max(|a|, |b|)` and the shared terms
    fn overlap(&self, a: PageId, b: PageId) -> Option<(f64, Vec<&str>)> {
        let (ta, tb) = (self.terms(a)?, self.terms(b)?);
        let shared: Vec<&str> = ta.intersection(tb).map(String::as_str).collect();
        if shared.is_empty() {
            return None;
        }
        let ratio = shared.len() as f64 / ta.len().max(tb.len()) as f64;
        Some((ratio, shared))
    }
}

/// Scores candidate links for every analysis page
pub struct LinkSuggestionEngine<'a> {
    graph: &'a LinkGraph,
    config: SuggestionConfig,
    pagerank: Option<&'a PageRankResults>,
    paths: Option<&'a PathAnalysisResults>,
}

impl<'a> LinkSuggestionEngine<'a> {
    pub fn new(graph: &'a LinkGraph, config: &SuggestionConfig) -> Self {
        Self {
            graph,
            config: config.clone(),
            pagerank: None,
            paths: None,
        }
    }

    /// Use already computed PageRank as the importance signal
    pub fn with_pagerank(mut self, results: &'a PageRankResults) -> Self {
        self.pagerank = Some(results);
        self
    }

    /// Use already computed betweenness as the bridge signal
    pub fn with_paths(mut self, results: &'a PathAnalysisResults) -> Self {
        self.paths = Some(results);
        self
    }

    /// Generate with the configured score floor and per-page limit
    pub fn generate(&self) -> Result<LinkSuggestionResults> {
        self.generate_suggestions(
            self.config.min_score,
            self.config.max_suggestions_per_page,
        )
    }

    pub fn generate_suggestions(
        &self,
        min_score: f64,
        max_suggestions_per_page: usize,
    ) -> Result<LinkSuggestionResults> {
        if !(min_score >= 0.0 && min_score <= self.config.max_score) {
            return Err(Error::invalid_parameter(
                "min_score",
                format!("must be in [0, {}], got {}", self.config.max_score, min_score),
            ));
        }

        let graph = self.graph;
        let pages = graph.analysis_pages();
        let tags = TermIndex::build(pages.iter().map(|&id| (id, graph.page(id).tags.as_slice())));
        let categories = TermIndex::build(
            pages
                .iter()
                .map(|&id| (id, graph.page(id).categories.as_slice())),
        );
        let underlinked: Vec<PageId> = pages
            .iter()
            .copied()
            .filter(|&id| graph.incoming_weight(id) <= self.config.underlinked_threshold)
            .collect();

        let pagerank_max = self.pagerank.map_or(0.0, PageRankResults::max_score);
        let betweenness_max = self.paths.map_or(0.0, PathAnalysisResults::max_betweenness);

        let mut suggestions = Vec::new();
        for &source in pages {
            let mut candidates: BTreeSet<PageId> = underlinked.iter().copied().collect();
            for index in [&tags, &categories] {
                if let Some(terms) = index.terms(source) {
                    for term in terms {
                        if let Some(ids) = index.pages.get(term) {
                            candidates.extend(ids.iter().copied());
                        }
                    }
                }
            }
            candidates.remove(&source);
            let outgoing = graph.outgoing(source);
            candidates.retain(|c| !outgoing.contains(c) && graph.is_analysis_page(*c));

            let mut scored: Vec<LinkSuggestion> = candidates
                .into_iter()
                .filter_map(|target| {
                    let (score, reasons) = self.score(
                        source,
                        target,
                        &tags,
                        &categories,
                        pagerank_max,
                        betweenness_max,
                    );
                    (score > 0.0 && score >= min_score).then(|| LinkSuggestion {
                        source: graph.path(source).to_path_buf(),
                        target: graph.path(target).to_path_buf(),
                        score,
                        reasons,
                    })
                })
                .collect();

            scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.target.cmp(&b.target)));
            scored.truncate(max_suggestions_per_page);
            suggestions.extend(scored);
        }

        log::debug!(
            "Generated {} link suggestions for {} pages",
            suggestions.len(),
            pages.len()
        );

        Ok(LinkSuggestionResults {
            suggestions,
            pages_analyzed: pages.len(),
        })
    }

    fn score(
        &self,
        source: PageId,
        target: PageId,
        tags: &TermIndex,
        categories: &TermIndex,
        pagerank_max: f64,
        betweenness_max: f64,
    ) -> (f64, Vec<String>) {
        let weights = &self.config.weights;
        let mut score = 0.0;
        let mut reasons = Vec::new();

        if let Some((ratio, shared)) = tags.overlap(source, target) {
            score += weights.tags * ratio;
            reasons.push(format!("Shared tags: {}", join_terms(&shared)));
        }
        if let Some((ratio, shared)) = categories.overlap(source, target) {
            score += weights.categories * ratio;
            reasons.push(format!("Shared categories: {}", join_terms(&shared)));
        }

        let target_path = self.graph.path(target);
        if let Some(pagerank) = self.pagerank
            && pagerank_max > 0.0
        {
            let importance = pagerank.score(target_path) / pagerank_max;
            score += weights.pagerank * importance;
            if importance >= 0.5 {
                reasons.push("High-importance page".to_string());
            }
        }
        if let Some(paths) = self.paths
            && betweenness_max > 0.0
        {
            let bridge = paths.betweenness(target_path) / betweenness_max;
            score += weights.bridge * bridge;
            if bridge >= 0.5 {
                reasons.push("Bridge page between topics".to_string());
            }
        }

        let incoming = self.graph.incoming_weight(target);
        if incoming <= self.config.underlinked_threshold {
            score += weights.underlinked;
            reasons.push(format!("Underlinked page ({} incoming)", incoming as usize));
        }

        (score.clamp(0.0, self.config.max_score), reasons)
    }
}

fn join_terms(terms: &[&str]) -> String {
    terms
        .iter()
        .take(MAX_TERMS_IN_REASON)
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
}
