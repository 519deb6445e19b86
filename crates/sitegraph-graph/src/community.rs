//! Louvain community detection.
//!
//! The directed site graph is read as undirected: the weight between two
//! pages is the number of directed edges joining them (1 or 2). Each level
//! runs local moving until no node changes community, then contracts every
//! community into a super-node with a self-loop carrying its internal
//! weight. Detection stops at the first level where no node moved.
//!
//! Modularity gain for moving node `i` into community `C`:
//!
//! ```text
//! ΔQ ∝ k_i,in(C) - γ * Σ_tot(C) * k_i / 2m
//! ```

use crate::graph::{LinkGraph, PageId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use sitegraph_core::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Local moving passes allowed per level
const MAX_PASSES: usize = 100;

/// Minimum gain improvement for a move
const GAIN_EPSILON: f64 = 1e-12;

/// A group of densely linked pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    pub id: usize,
    pub members: BTreeSet<PathBuf>,
}

impl Community {
    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.members.contains(path)
    }
}

/// Partition of the analysis pages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunityDetectionResults {
    /// Sorted by size, largest first
    pub communities: Vec<Community>,
    /// Newman modularity of the partition, in [-1, 1]
    pub modularity: f64,
    /// Louvain levels run
    pub iterations: usize,
    pub resolution: f64,
}

impl CommunityDetectionResults {
    pub fn community_for_page(&self, path: &Path) -> Option<&Community> {
        self.communities.iter().find(|c| c.contains(path))
    }

    pub fn largest_communities(&self, limit: usize) -> &[Community] {
        &self.communities[..limit.min(self.communities.len())]
    }

    pub fn communities_above_size(&self, min_size: usize) -> Vec<&Community> {
        self.communities
            .iter()
            .filter(|c| c.size() >= min_size)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.communities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.communities.is_empty()
    }
}

/// Undirected weighted graph for one Louvain level
#[derive(Debug, Clone)]
struct Level {
    adjacency: Vec<Vec<(usize, f64)>>,
    self_loops: Vec<f64>,
    /// Original nodes folded into each node
    members: Vec<Vec<usize>>,
}

impl Level {
    fn len(&self) -> usize {
        self.adjacency.len()
    }

    fn degree(&self, node: usize) -> f64 {
        self.adjacency[node].iter().map(|(_, w)| w).sum::<f64>() + 2.0 * self.self_loops[node]
    }

    /// Contract communities into super-nodes, numbered in first-seen order
    fn aggregate(&self, community: &[usize]) -> Level {
        let mut renumber: HashMap<usize, usize> = HashMap::new();
        for &c in community {
            let next = renumber.len();
            renumber.entry(c).or_insert(next);
        }
        let count = renumber.len();

        let mut links: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); count];
        let mut internal = vec![0.0; count];
        let mut members = vec![Vec::new(); count];

        for node in 0..self.len() {
            let c = renumber[&community[node]];
            internal[c] += 2.0 * self.self_loops[node];
            members[c].extend_from_slice(&self.members[node]);
            for &(neighbour, weight) in &self.adjacency[node] {
                let d = renumber[&community[neighbour]];
                if c == d {
                    internal[c] += weight;
                } else {
                    *links[c].entry(d).or_default() += weight;
                }
            }
        }

        Level {
            adjacency: links
                .into_iter()
                .map(|m| m.into_iter().collect())
                .collect(),
            self_loops: internal.into_iter().map(|w| w / 2.0).collect(),
            members,
        }
    }
}

/// Louvain detector over the analysis pages
#[derive(Debug)]
pub struct CommunityDetector<'a> {
    graph: &'a LinkGraph,
    resolution: f64,
    random_seed: Option<u64>,
}

impl<'a> CommunityDetector<'a> {
    /// Fails unless `resolution` is positive and finite
    pub fn new(graph: &'a LinkGraph, resolution: f64, random_seed: Option<u64>) -> Result<Self> {
        if !(resolution > 0.0) || !resolution.is_finite() {
            return Err(Error::invalid_parameter(
                "resolution",
                format!("must be positive, got {}", resolution),
            ));
        }
        Ok(Self {
            graph,
            resolution,
            random_seed,
        })
    }

    pub fn from_config(graph: &'a LinkGraph, config: &CommunityConfig) -> Result<Self> {
        Self::new(graph, config.resolution, config.random_seed)
    }

    pub fn detect(&self) -> CommunityDetectionResults {
        let view = self.graph.analysis_view();
        let n = view.len();
        if n == 0 {
            return self.results(&[], Vec::new(), 0.0, 0);
        }

        let mut pair_weights: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        for (u, targets) in view.out.iter().enumerate() {
            for &v in targets {
                *pair_weights.entry((u.min(v), u.max(v))).or_default() += 1.0;
            }
        }
        let mut adjacency = vec![Vec::new(); n];
        for (&(u, v), &w) in &pair_weights {
            adjacency[u].push((v, w));
            adjacency[v].push((u, w));
        }

        let base = Level {
            adjacency,
            self_loops: vec![0.0; n],
            members: (0..n).map(|i| vec![i]).collect(),
        };
        let two_m: f64 = (0..n).map(|i| base.degree(i)).sum();

        if two_m == 0.0 {
            let singletons: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
            return self.results(&view.nodes, singletons, 0.0, 0);
        }

        let mut rng = self.random_seed.map(StdRng::seed_from_u64);
        let mut level = base.clone();
        let mut iterations = 0;

        loop {
            iterations += 1;
            let mut order: Vec<usize> = (0..level.len()).collect();
            if let Some(rng) = rng.as_mut() {
                order.shuffle(rng);
            }

            let (community, moved) = self.local_moving(&level, &order, two_m);
            if !moved {
                break;
            }
            level = level.aggregate(&community);
            log::trace!("Louvain level {}: {} communities", iterations, level.len());
        }

        let partition = level.members;
        let modularity = newman_modularity(&base, &partition, two_m);
        log::debug!(
            "Louvain found {} communities over {} pages (Q = {:.4}, {} levels)",
            partition.len(),
            n,
            modularity,
            iterations
        );
        self.results(&view.nodes, partition, modularity, iterations)
    }

    /// One level of greedy moves; returns assignments and whether anything moved
    fn local_moving(&self, level: &Level, order: &[usize], two_m: f64) -> (Vec<usize>, bool) {
        let size = level.len();
        let degree: Vec<f64> = (0..size).map(|i| level.degree(i)).collect();
        let mut community: Vec<usize> = (0..size).collect();
        let mut totals = degree.clone();
        let mut moved_any = false;

        for _ in 0..MAX_PASSES {
            let mut moved = false;

            for &node in order {
                let current = community[node];
                let k_i = degree[node];

                let mut neighbours: Vec<(usize, f64)> = Vec::new();
                let mut slot: HashMap<usize, usize> = HashMap::new();
                for &(other, weight) in &level.adjacency[node] {
                    let c = community[other];
                    match slot.get(&c) {
                        Some(&i) => neighbours[i].1 += weight,
                        None => {
                            slot.insert(c, neighbours.len());
                            neighbours.push((c, weight));
                        }
                    }
                }

                totals[current] -= k_i;
                let own_links = slot.get(&current).map_or(0.0, |&i| neighbours[i].1);
                let mut best = current;
                let mut best_gain = own_links - self.resolution * totals[current] * k_i / two_m;

                for &(candidate, links) in &neighbours {
                    if candidate == current {
                        continue;
                    }
                    let gain = links - self.resolution * totals[candidate] * k_i / two_m;
                    if gain > best_gain + GAIN_EPSILON {
                        best = candidate;
                        best_gain = gain;
                    }
                }

                totals[best] += k_i;
                if best != current {
                    community[node] = best;
                    moved = true;
                    moved_any = true;
                }
            }

            if !moved {
                break;
            }
        }

        (community, moved_any)
    }

    fn results(
        &self,
        nodes: &[PageId],
        partition: Vec<Vec<usize>>,
        modularity: f64,
        iterations: usize,
    ) -> CommunityDetectionResults {
        let mut groups: Vec<BTreeSet<PathBuf>> = partition
            .into_iter()
            .filter(|members| !members.is_empty())
            .map(|members| {
                members
                    .into_iter()
                    .map(|local| self.graph.path(nodes[local]).to_path_buf())
                    .collect()
            })
            .collect();
        groups.sort_by(|a, b| {
            b.len()
                .cmp(&a.len())
                .then_with(|| a.iter().next().cmp(&b.iter().next()))
        });

        CommunityDetectionResults {
            communities: groups
                .into_iter()
                .enumerate()
                .map(|(id, members)| Community { id, members })
                .collect(),
            modularity,
            iterations,
            resolution: self.resolution,
        }
    }
}

/// Q = Σ_c [ L_c / m - (d_c / 2m)² ], clamped to [-1, 1]
fn newman_modularity(base: &Level, partition: &[Vec<usize>], two_m: f64) -> f64 {
    let mut owner = vec![0; base.len()];
    for (c, members) in partition.iter().enumerate() {
        for &node in members {
            owner[node] = c;
        }
    }

    let mut internal = vec![0.0; partition.len()];
    let mut degree = vec![0.0; partition.len()];
    for node in 0..base.len() {
        let c = owner[node];
        degree[c] += base.degree(node);
        for &(other, weight) in &base.adjacency[node] {
            if owner[other] == c {
                // each internal edge is visited from both ends
                internal[c] += weight / 2.0;
            }
        }
    }

    let m = two_m / 2.0;
    let q: f64 = internal
        .iter()
        .zip(&degree)
        .map(|(l, d)| l / m - (d / two_m).powi(2))
        .sum();
    q.clamp(-1.0, 1.0)
}
