//! Shortest-path centrality over the directed site graph.
//!
//! # Algorithm
//!
//! Brandes (2001) for unweighted graphs: one BFS per source records
//! shortest-path counts and predecessors, then dependencies are
//! accumulated in reverse BFS order. O(V * E) overall.
//!
//! Above `auto_approximate_threshold` pages only `k_pivots` seeded sources
//! are expanded and betweenness is scaled by `n / k`. Diameter and average
//! path length then come from the pivots' BFS trees, and closeness from a
//! reverse BFS per pivot, i.e. each page's distance to the pivots.
//!
//! Betweenness is normalised by `(n - 1)(n - 2)` when `n > 2`.

use crate::graph::{AnalysisView, LinkGraph};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use sitegraph_core::prelude::*;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// Centrality and distance statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathAnalysisResults {
    pub betweenness: HashMap<PathBuf, f64>,
    pub closeness: HashMap<PathBuf, f64>,
    /// Longest finite shortest path, in links
    pub diameter: usize,
    /// Mean over reachable ordered pairs
    pub avg_path_length: f64,
    pub is_approximate: bool,
    /// BFS sources expanded
    pub pivots_used: usize,
}

impl PathAnalysisResults {
    pub fn betweenness(&self, path: &Path) -> f64 {
        self.betweenness.get(path).copied().unwrap_or(0.0)
    }

    pub fn closeness(&self, path: &Path) -> f64 {
        self.closeness.get(path).copied().unwrap_or(0.0)
    }

    /// Pages lying on the most shortest paths
    pub fn top_bridges(&self, limit: usize) -> Vec<(PathBuf, f64)> {
        top_n(&self.betweenness, limit)
    }

    /// Pages closest on average to the pages they reach
    pub fn most_accessible(&self, limit: usize) -> Vec<(PathBuf, f64)> {
        top_n(&self.closeness, limit)
    }

    pub fn max_betweenness(&self) -> f64 {
        self.betweenness.values().copied().fold(0.0, f64::max)
    }

    pub fn avg_betweenness(&self) -> f64 {
        if self.betweenness.is_empty() {
            return 0.0;
        }
        self.betweenness.values().sum::<f64>() / self.betweenness.len() as f64
    }
}

fn top_n(scores: &HashMap<PathBuf, f64>, limit: usize) -> Vec<(PathBuf, f64)> {
    let mut ranked: Vec<(PathBuf, f64)> = scores.iter().map(|(p, s)| (p.clone(), *s)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

/// Running totals across BFS sources
#[derive(Default)]
struct Accumulator {
    betweenness: Vec<f64>,
    distance_sum: Vec<f64>,
    reached_by: Vec<usize>,
    diameter: usize,
    total_distance: f64,
    pairs: usize,
}

/// Shortest paths and centrality over analysis pages
#[derive(Debug)]
pub struct PathAnalyzer<'a> {
    graph: &'a LinkGraph,
    view: AnalysisView,
    k_pivots: usize,
    seed: u64,
    auto_approximate_threshold: usize,
}

impl<'a> PathAnalyzer<'a> {
    pub fn new(graph: &'a LinkGraph, config: &PathConfig) -> Result<Self> {
        if config.k_pivots == 0 {
            return Err(Error::invalid_parameter("k_pivots", "must be at least 1"));
        }
        Ok(Self {
            graph,
            view: graph.analysis_view(),
            k_pivots: config.k_pivots,
            seed: config.seed,
            auto_approximate_threshold: config.auto_approximate_threshold,
        })
    }

    /// Exact below the threshold, pivot-approximated above it
    pub fn analyze(&self) -> PathAnalysisResults {
        let n = self.view.len();
        let approximate = n > self.auto_approximate_threshold && self.k_pivots < n;
        let sources = if approximate {
            self.pivots()
        } else {
            (0..n).collect()
        };

        let mut acc = Accumulator {
            betweenness: vec![0.0; n],
            distance_sum: vec![0.0; n],
            reached_by: vec![0; n],
            ..Default::default()
        };
        for &source in &sources {
            let (distance, reached) = self.brandes_from(source, &mut acc);
            if !approximate {
                acc.distance_sum[source] = distance;
                acc.reached_by[source] = reached;
            }
        }
        if approximate {
            for &pivot in &sources {
                self.distances_to(pivot, &mut acc);
            }
            let scale = n as f64 / sources.len() as f64;
            acc.betweenness.iter_mut().for_each(|b| *b *= scale);
        }
        if n > 2 {
            let norm = ((n - 1) * (n - 2)) as f64;
            acc.betweenness.iter_mut().for_each(|b| *b /= norm);
        }

        let mut betweenness = HashMap::with_capacity(n);
        let mut closeness = HashMap::with_capacity(n);
        for (local, &id) in self.view.nodes.iter().enumerate() {
            let path = self.graph.path(id).to_path_buf();
            let close = if acc.reached_by[local] > 0 {
                acc.reached_by[local] as f64 / acc.distance_sum[local]
            } else {
                0.0
            };
            closeness.insert(path.clone(), close);
            betweenness.insert(path, acc.betweenness[local]);
        }

        log::debug!(
            "Path analysis over {} pages from {} sources (approximate={}): diameter {}",
            n,
            sources.len(),
            approximate,
            acc.diameter
        );

        PathAnalysisResults {
            betweenness,
            closeness,
            diameter: acc.diameter,
            avg_path_length: if acc.pairs > 0 {
                acc.total_distance / acc.pairs as f64
            } else {
                0.0
            },
            is_approximate: approximate,
            pivots_used: sources.len(),
        }
    }

    /// Seeded sample of distinct sources, in page order
    fn pivots(&self) -> Vec<usize> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut pivots = rand::seq::index::sample(&mut rng, self.view.len(), self.k_pivots).into_vec();
        pivots.sort_unstable();
        pivots
    }

    /// One Brandes pass. Returns the distance sum and count of pages
    /// reached from `source`.
    fn brandes_from(&self, source: usize, acc: &mut Accumulator) -> (f64, usize) {
        let n = self.view.len();
        let mut order = Vec::with_capacity(n);
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0_f64; n];
        let mut dist: Vec<Option<usize>> = vec![None; n];
        let mut queue = VecDeque::new();

        sigma[source] = 1.0;
        dist[source] = Some(0);
        queue.push_back(source);

        while let Some(v) = queue.pop_front() {
            order.push(v);
            let dv = dist[v].unwrap_or_default();
            for &w in &self.view.out[v] {
                if dist[w].is_none() {
                    dist[w] = Some(dv + 1);
                    queue.push_back(w);
                }
                if dist[w] == Some(dv + 1) {
                    sigma[w] += sigma[v];
                    predecessors[w].push(v);
                }
            }
        }

        let mut distance = 0.0;
        let mut reached = 0;
        for &v in &order {
            if let Some(d) = dist[v]
                && d > 0
            {
                distance += d as f64;
                reached += 1;
                acc.total_distance += d as f64;
                acc.pairs += 1;
                acc.diameter = acc.diameter.max(d);
            }
        }

        let mut delta = vec![0.0_f64; n];
        for &w in order.iter().rev() {
            for &v in &predecessors[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != source {
                acc.betweenness[w] += delta[w];
            }
        }
        (distance, reached)
    }

    /// Reverse BFS from `pivot`: adds every page's distance to it
    fn distances_to(&self, pivot: usize, acc: &mut Accumulator) {
        let mut dist: Vec<Option<usize>> = vec![None; self.view.len()];
        let mut queue = VecDeque::from([pivot]);
        dist[pivot] = Some(0);

        while let Some(v) = queue.pop_front() {
            let dv = dist[v].unwrap_or_default();
            if dv > 0 {
                acc.distance_sum[v] += dv as f64;
                acc.reached_by[v] += 1;
            }
            for &u in &self.view.inc[v] {
                if dist[u].is_none() {
                    dist[u] = Some(dv + 1);
                    queue.push_back(u);
                }
            }
        }
    }

    /// Local index of an analysis page; `PageNotFound` for unknown paths
    fn local(&self, path: &Path) -> Result<Option<usize>> {
        let id = self.graph.require(path)?;
        Ok(self.view.local_of(id))
    }

    fn to_path(&self, local: usize) -> PathBuf {
        self.graph.path(self.view.nodes[local]).to_path_buf()
    }

    /// One shortest path from `from` to `to`, endpoints included
    pub fn find_shortest_path(&self, from: &Path, to: &Path) -> Result<Option<Vec<PathBuf>>> {
        let (Some(start), Some(goal)) = (self.local(from)?, self.local(to)?) else {
            return Ok(None);
        };

        let mut parent: Vec<Option<usize>> = vec![None; self.view.len()];
        let mut seen = vec![false; self.view.len()];
        let mut queue = VecDeque::from([start]);
        seen[start] = true;

        while let Some(v) = queue.pop_front() {
            if v == goal {
                let mut path = vec![self.to_path(v)];
                let mut cursor = v;
                while let Some(p) = parent[cursor] {
                    path.push(self.to_path(p));
                    cursor = p;
                }
                path.reverse();
                return Ok(Some(path));
            }
            for &w in &self.view.out[v] {
                if !seen[w] {
                    seen[w] = true;
                    parent[w] = Some(v);
                    queue.push_back(w);
                }
            }
        }
        Ok(None)
    }

    /// Every simple path with at most `max_length` links, shortest first
    pub fn find_all_paths(
        &self,
        from: &Path,
        to: &Path,
        max_length: usize,
    ) -> Result<Vec<Vec<PathBuf>>> {
        let (Some(start), Some(goal)) = (self.local(from)?, self.local(to)?) else {
            return Ok(Vec::new());
        };

        let mut found = Vec::new();
        let mut on_path = vec![false; self.view.len()];
        let mut current = vec![start];
        on_path[start] = true;
        self.extend_paths(goal, max_length, &mut current, &mut on_path, &mut found);

        let mut paths: Vec<Vec<PathBuf>> = found
            .into_iter()
            .map(|p: Vec<usize>| p.into_iter().map(|l| self.to_path(l)).collect())
            .collect();
        paths.sort_by(|a: &Vec<PathBuf>, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        Ok(paths)
    }

    fn extend_paths(
        &self,
        goal: usize,
        max_length: usize,
        current: &mut Vec<usize>,
        on_path: &mut [bool],
        found: &mut Vec<Vec<usize>>,
    ) {
        let Some(&last) = current.last() else {
            return;
        };
        if last == goal {
            found.push(current.clone());
            return;
        }
        if current.len() > max_length {
            return;
        }
        for &next in &self.view.out[last] {
            if !on_path[next] {
                on_path[next] = true;
                current.push(next);
                self.extend_paths(goal, max_length, current, on_path, found);
                current.pop();
                on_path[next] = false;
            }
        }
    }

    /// Hop distances from `source`.
    ///
    /// With `targets`, only their distances are returned and the search
    /// stops once all of them are reached.
    pub fn bfs_distances(
        &self,
        source: &Path,
        targets: Option<&[PathBuf]>,
    ) -> Result<HashMap<PathBuf, usize>> {
        let Some(start) = self.local(source)? else {
            return Ok(HashMap::new());
        };

        let mut wanted: Option<HashSet<usize>> = match targets {
            Some(targets) => {
                let mut set = HashSet::new();
                for target in targets {
                    if let Some(local) = self.local(target)? {
                        set.insert(local);
                    }
                }
                Some(set)
            }
            None => None,
        };

        let mut distances = HashMap::new();
        let mut dist: Vec<Option<usize>> = vec![None; self.view.len()];
        let mut queue = VecDeque::from([start]);
        dist[start] = Some(0);

        while let Some(v) = queue.pop_front() {
            let dv = dist[v].unwrap_or_default();
            match wanted.as_mut() {
                Some(set) => {
                    if set.remove(&v) {
                        distances.insert(self.to_path(v), dv);
                    }
                    if set.is_empty() {
                        break;
                    }
                }
                None => {
                    distances.insert(self.to_path(v), dv);
                }
            }
            for &w in &self.view.out[v] {
                if dist[w].is_none() {
                    dist[w] = Some(dv + 1);
                    queue.push_back(w);
                }
            }
        }
        Ok(distances)
    }
}
