//! PageRank over the site graph.
//!
//! # Algorithm
//!
//! Power iteration driven by the reverse adjacency index, so one iteration
//! costs O(E):
//!
//! ```text
//! PR(t) = (1 - d) * J(t) + d * (Σ PR(s) / |out(s)| + D * J(t))   for each s → t
//! ```
//!
//! where `d` is the damping factor, `J` the jump vector (uniform, or the
//! seed set for personalized PageRank) and `D` the rank mass held by
//! dangling pages. Redistributing `D` along `J` keeps the total at 1.0.
//!
//! Iteration stops once the L1 delta between successive vectors drops
//! below the tolerance, or after `max_iterations`.

use crate::graph::{AnalysisView, LinkGraph};
use serde::{Deserialize, Serialize};
use sitegraph_core::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Scores and convergence metadata from one PageRank run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageRankResults {
    pub scores: HashMap<PathBuf, f64>,
    pub iterations: usize,
    /// Whether the tolerance was reached within `max_iterations`
    pub converged: bool,
    pub damping: f64,
    /// Jump vector restricted to a seed set
    pub personalized: bool,
}

impl PageRankResults {
    /// Score of a page; 0.0 for pages outside the analysis set
    pub fn score(&self, path: &Path) -> f64 {
        self.scores.get(path).copied().unwrap_or(0.0)
    }

    /// Highest-ranked pages, ties broken by path
    pub fn top_pages(&self, limit: usize) -> Vec<(PathBuf, f64)> {
        let mut ranked: Vec<(PathBuf, f64)> =
            self.scores.iter().map(|(p, s)| (p.clone(), *s)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(limit);
        ranked
    }

    /// Pages scoring at or above the given percentile (0-100), highest first
    pub fn pages_above_percentile(&self, percentile: f64) -> Vec<PathBuf> {
        if self.scores.is_empty() {
            return Vec::new();
        }
        let mut sorted: Vec<f64> = self.scores.values().copied().collect();
        sorted.sort_by(f64::total_cmp);

        let fraction = percentile.clamp(0.0, 100.0) / 100.0;
        let index = ((sorted.len() as f64 * fraction) as usize).min(sorted.len() - 1);
        let threshold = sorted[index];

        self.top_pages(self.scores.len())
            .into_iter()
            .filter(|(_, score)| *score >= threshold)
            .map(|(path, _)| path)
            .collect()
    }

    pub fn max_score(&self) -> f64 {
        self.scores.values().copied().fold(0.0, f64::max)
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Configured PageRank computation over a built graph
#[derive(Debug)]
pub struct PageRankEngine<'a> {
    graph: &'a LinkGraph,
    damping: f64,
    max_iterations: usize,
    tolerance: f64,
}

impl<'a> PageRankEngine<'a> {
    /// Fails unless `0 < damping < 1` and `max_iterations >= 1`
    pub fn new(graph: &'a LinkGraph, damping: f64, max_iterations: usize) -> Result<Self> {
        if !(damping > 0.0 && damping < 1.0) {
            return Err(Error::invalid_parameter(
                "damping",
                format!("must be in (0, 1), got {}", damping),
            ));
        }
        if max_iterations == 0 {
            return Err(Error::invalid_parameter(
                "max_iterations",
                "must be at least 1",
            ));
        }
        Ok(Self {
            graph,
            damping,
            max_iterations,
            tolerance: PageRankConfig::default().tolerance,
        })
    }

    pub fn from_config(graph: &'a LinkGraph, config: &PageRankConfig) -> Result<Self> {
        Self::new(graph, config.damping, config.max_iterations)?.with_tolerance(config.tolerance)
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Result<Self> {
        if !(tolerance > 0.0) {
            return Err(Error::invalid_parameter("tolerance", "must be positive"));
        }
        self.tolerance = tolerance;
        Ok(self)
    }

    /// Standard PageRank with a uniform jump vector
    pub fn compute(&self) -> PageRankResults {
        let view = self.graph.analysis_view();
        let n = view.len();

        if n == 0 {
            return self.results(&view, Vec::new(), 0, true, false);
        }
        if n == 1 {
            return self.results(&view, vec![1.0 - self.damping], 1, true, false);
        }

        let jump = vec![1.0 / n as f64; n];
        let (ranks, iterations, converged) = self.iterate(&view, &jump);
        log::debug!(
            "PageRank over {} pages: {} iterations, converged={}",
            n,
            iterations,
            converged
        );
        self.results(&view, ranks, iterations, converged, false)
    }

    /// PageRank whose random jumps land only on the seed pages.
    ///
    /// Seeds outside the analysis set are ignored; fails with
    /// `EmptySeedSet` when no usable seed remains.
    pub fn compute_personalized<I, P>(&self, seeds: I) -> Result<PageRankResults>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let view = self.graph.analysis_view();
        let mut seed_set = HashSet::new();
        for seed in seeds {
            let seed = seed.as_ref();
            match self.graph.id(seed).and_then(|id| view.local_of(id)) {
                Some(local) => {
                    seed_set.insert(local);
                }
                None => log::debug!("Ignoring seed {} outside analysis pages", seed.display()),
            }
        }
        if seed_set.is_empty() {
            return Err(Error::EmptySeedSet);
        }

        let mut jump = vec![0.0; view.len()];
        let share = 1.0 / seed_set.len() as f64;
        for &local in &seed_set {
            jump[local] = share;
        }

        let (ranks, iterations, converged) = self.iterate(&view, &jump);
        Ok(self.results(&view, ranks, iterations, converged, true))
    }

    fn iterate(&self, view: &AnalysisView, jump: &[f64]) -> (Vec<f64>, usize, bool) {
        let n = view.len();
        let d = self.damping;
        let out_degree: Vec<f64> = view.out.iter().map(|o| o.len() as f64).collect();

        let mut ranks = jump.to_vec();
        let mut next = vec![0.0; n];
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            iterations += 1;

            let dangling: f64 = (0..n)
                .filter(|&i| out_degree[i] == 0.0)
                .map(|i| ranks[i])
                .sum();

            for t in 0..n {
                let inbound: f64 = view.inc[t]
                    .iter()
                    .map(|&s| ranks[s] / out_degree[s])
                    .sum();
                next[t] = (1.0 - d) * jump[t] + d * (inbound + dangling * jump[t]);
            }

            let delta: f64 = ranks
                .iter()
                .zip(&next)
                .map(|(old, new)| (old - new).abs())
                .sum();
            std::mem::swap(&mut ranks, &mut next);

            if delta < self.tolerance {
                converged = true;
                break;
            }
        }

        if !converged {
            log::warn!(
                "PageRank did not converge after {} iterations",
                self.max_iterations
            );
        }
        (ranks, iterations, converged)
    }

    fn results(
        &self,
        view: &AnalysisView,
        ranks: Vec<f64>,
        iterations: usize,
        converged: bool,
        personalized: bool,
    ) -> PageRankResults {
        let scores = view
            .nodes
            .iter()
            .zip(ranks)
            .map(|(&id, score)| (self.graph.path(id).to_path_buf(), score))
            .collect();
        PageRankResults {
            scores,
            iterations,
            converged,
            damping: self.damping,
            personalized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GraphBuilder;

    fn build(site: &Site) -> LinkGraph {
        GraphBuilder::new(site, &GraphConfig::default())
            .parallel(false)
            .build()
    }

    fn chain() -> Site {
        Site::new(vec![
            Page::new("a.md").with_related(["b.md"]),
            Page::new("b.md").with_related(["c.md"]),
            Page::new("c.md"),
        ])
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        let site = chain();
        let graph = build(&site);
        assert!(matches!(
            PageRankEngine::new(&graph, 1.0, 100),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(PageRankEngine::new(&graph, 0.0, 100).is_err());
        assert!(PageRankEngine::new(&graph, 0.85, 0).is_err());
        assert!(
            PageRankEngine::new(&graph, 0.85, 10)
                .unwrap()
                .with_tolerance(0.0)
                .is_err()
        );
    }

    #[test]
    fn test_chain_ordering_and_sum() {
        let site = chain();
        let graph = build(&site);
        let results = PageRankEngine::new(&graph, 0.85, 100).unwrap().compute();

        let a = results.score(Path::new("a.md"));
        let b = results.score(Path::new("b.md"));
        let c = results.score(Path::new("c.md"));
        assert!(c > b && b > a);
        assert!(((a + b + c) - 1.0).abs() < 0.01);
        assert!(results.converged);
        assert!(!results.personalized);
    }

    #[test]
    fn test_empty_graph_converges_immediately() {
        let site = Site::default();
        let graph = build(&site);
        let results = PageRankEngine::new(&graph, 0.85, 100).unwrap().compute();
        assert!(results.is_empty());
        assert!(results.converged);
        assert_eq!(results.iterations, 0);
    }

    #[test]
    fn test_single_page_is_random_jump_probability() {
        let site = Site::new(vec![Page::new("only.md")]);
        let graph = build(&site);
        let results = PageRankEngine::new(&graph, 0.85, 100).unwrap().compute();
        assert!((results.score(Path::new("only.md")) - 0.15).abs() < 1e-12);
        assert!(results.converged);
        assert_eq!(results.iterations, 1);
    }

    #[test]
    fn test_iteration_cap_reports_not_converged() {
        let site = chain();
        let graph = build(&site);
        let results = PageRankEngine::new(&graph, 0.85, 1).unwrap().compute();
        assert_eq!(results.iterations, 1);
        assert!(!results.converged);
    }

    #[test]
    fn test_generated_pages_are_not_ranked() {
        let site = Site::new(vec![
            Page::new("a.md").with_related(["tags/x.md"]),
            Page::new("b.md"),
            Page::new("tags/x.md").generated().with_related(["b.md"]),
        ]);
        let graph = build(&site);
        let results = PageRankEngine::new(&graph, 0.85, 100).unwrap().compute();
        assert_eq!(results.scores.len(), 2);
        assert_eq!(results.score(Path::new("tags/x.md")), 0.0);
        let total: f64 = results.scores.values().sum();
        assert!((total - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_personalized_favours_seed_neighbourhood() {
        let site = Site::new(vec![
            Page::new("a.md").with_related(["b.md"]),
            Page::new("b.md"),
            Page::new("x.md").with_related(["y.md"]),
            Page::new("y.md"),
        ]);
        let graph = build(&site);
        let engine = PageRankEngine::new(&graph, 0.85, 100).unwrap();
        let results = engine.compute_personalized(["a.md"]).unwrap();

        assert!(results.personalized);
        assert!(results.score(Path::new("b.md")) > results.score(Path::new("y.md")));
        assert_eq!(results.score(Path::new("x.md")), 0.0);
        let total: f64 = results.scores.values().sum();
        assert!((total - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_personalized_requires_seeds() {
        let site = chain();
        let graph = build(&site);
        let engine = PageRankEngine::new(&graph, 0.85, 100).unwrap();
        let none: Vec<PathBuf> = Vec::new();
        assert!(matches!(
            engine.compute_personalized(none),
            Err(Error::EmptySeedSet)
        ));
        assert!(matches!(
            engine.compute_personalized(["missing.md"]),
            Err(Error::EmptySeedSet)
        ));
    }

    #[test]
    fn test_top_pages_and_percentile() {
        let results = PageRankResults {
            scores: HashMap::from([
                (PathBuf::from("a.md"), 0.1),
                (PathBuf::from("b.md"), 0.2),
                (PathBuf::from("c.md"), 0.3),
                (PathBuf::from("d.md"), 0.4),
            ]),
            iterations: 1,
            converged: true,
            damping: 0.85,
            personalized: false,
        };

        let top = results.top_pages(2);
        assert_eq!(top[0].0, PathBuf::from("d.md"));
        assert_eq!(top[1].0, PathBuf::from("c.md"));

        assert_eq!(
            results.pages_above_percentile(50.0),
            vec![PathBuf::from("d.md"), PathBuf::from("c.md")]
        );
        assert_eq!(results.pages_above_percentile(0.0).len(), 4);
        assert_eq!(
            results.pages_above_percentile(100.0),
            vec![PathBuf::from("d.md")]
        );
        assert_eq!(results.max_score(), 0.4);
    }
}
