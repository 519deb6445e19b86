//! End-to-end scenarios over small, hand-shaped sites

use sitegraph_graph::prelude::*;
use sitegraph_graph::{BuildMode, MenuItem};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn build(site: Site) -> KnowledgeGraph {
    init_logging();
    let mut kg = KnowledgeGraph::new(Arc::new(site), GraphConfig::default()).unwrap();
    kg.build_with_mode(Some(false));
    kg
}

fn clique(prefix: &str, size: usize) -> Vec<Page> {
    (0..size)
        .map(|i| {
            let others: Vec<String> = (0..size)
                .filter(|&j| j != i)
                .map(|j| format!("{prefix}{j}.md"))
                .collect();
            Page::new(format!("{prefix}{i}.md")).with_related(others)
        })
        .collect()
}

// ==================== Chain ====================

#[test]
fn test_chain_ranking_diameter_and_bridge() {
    let site = Site::new(vec![
        Page::new("a.md").with_links(["b.md"]),
        Page::new("b.md").with_links(["c.md"]),
        Page::new("c.md"),
    ])
    .with_page_xrefs();
    let kg = build(site);

    let pr = kg.pagerank(false).unwrap();
    let (a, b, c) = (
        pr.score(Path::new("a.md")),
        pr.score(Path::new("b.md")),
        pr.score(Path::new("c.md")),
    );
    assert!(c > b, "PR(c)={c} PR(b)={b}");
    assert!(b > a, "PR(b)={b} PR(a)={a}");

    let paths = kg.paths(false).unwrap();
    assert_eq!(paths.diameter, 2);
    let bb = paths.betweenness(Path::new("b.md"));
    assert!(bb > paths.betweenness(Path::new("a.md")));
    assert!(bb > paths.betweenness(Path::new("c.md")));

    // closeness measures distance from the page to those it reaches
    assert!((paths.closeness(Path::new("a.md")) - 1.0 / 1.5).abs() < 1e-12);
    assert_eq!(paths.closeness(Path::new("c.md")), 0.0);
}

// ==================== Star ====================

#[test]
fn test_star_spokes_outrank_hub() {
    let spokes: Vec<String> = (0..6).map(|i| format!("spoke{i}.md")).collect();
    let mut pages = vec![Page::new("hub.md").with_related(spokes.clone())];
    pages.extend(spokes.iter().map(Page::new));
    let kg = build(Site::new(pages));

    let pr = kg.pagerank(false).unwrap();
    let hub = pr.score(Path::new("hub.md"));
    let first = pr.score(Path::new("spoke0.md"));
    for spoke in &spokes {
        let score = pr.score(Path::new(spoke));
        assert!((score - first).abs() < 1e-9);
        assert!(score > hub);
    }
}

// ==================== Two communities ====================

#[test]
fn test_two_cliques_joined_by_one_edge() {
    let mut pages = clique("left", 5);
    pages.extend(clique("right", 5));
    pages[0].related_posts.push(PathBuf::from("right0.md"));
    let kg = build(Site::new(pages));

    let communities = kg.communities(false).unwrap();
    assert_eq!(communities.len(), 2);
    assert!(communities.communities.iter().all(|c| c.size() == 5));
    assert!(communities.modularity > 0.0 && communities.modularity <= 1.0);

    let repeat = kg.communities_with(1.0, Some(42), true).unwrap();
    assert_eq!(repeat.len(), communities.len());
    assert!((repeat.modularity - communities.modularity).abs() < 1e-9);
}

// ==================== Bridge page ====================

#[test]
fn test_bridge_betweenness_above_average() {
    let mut pages = clique("x", 4);
    pages.extend(clique("y", 4));
    pages[0].related_posts.push(PathBuf::from("bridge.md"));
    pages[4].related_posts.push(PathBuf::from("bridge.md"));
    pages.push(Page::new("bridge.md").with_related(["x0.md", "y0.md"]));
    pages.push(Page::new("island.md"));
    let kg = build(Site::new(pages));

    let paths = kg.paths(false).unwrap();
    assert!(paths.betweenness(Path::new("bridge.md")) > paths.avg_betweenness());
    assert_eq!(paths.betweenness(Path::new("island.md")), 0.0);
    assert_eq!(paths.closeness(Path::new("island.md")), 0.0);
    assert!(kg.orphans().unwrap().contains(&PathBuf::from("island.md")));
}

// ==================== Full site ====================

fn docs_site() -> Site {
    Site::new(vec![
        Page::new("docs/_index.md")
            .with_title("Docs")
            .in_section("docs"),
        Page::new("docs/install.md")
            .with_title("Install")
            .in_section("docs")
            .with_tags(["setup", "rust"])
            .with_categories(["guides"])
            .with_links(["docs/usage.md", "id:faq", "https://example.com"])
            .with_next("docs/usage.md"),
        Page::new("docs/usage.md")
            .with_title("Usage")
            .in_section("docs")
            .with_tags(["rust"])
            .with_categories(["guides"])
            .with_prev("docs/install.md"),
        Page::new("faq.md").with_id("faq").with_tags(["setup"]),
        Page::new("blog/post.md")
            .with_tags(["rust"])
            .with_related(["docs/install.md"]),
        Page::new("tags/rust.md").generated(),
        Page::new("api/mod.md").autodoc(),
    ])
    .with_section(Section::new("docs").with_index("docs/_index.md"))
    .with_menu(
        "main",
        vec![
            MenuItem::for_page("Docs", "docs/_index.md"),
            MenuItem::new("More").with_children(vec![MenuItem::for_page("FAQ", "faq.md")]),
        ],
    )
    .with_page_taxonomies()
    .with_page_xrefs()
}

#[test]
fn test_full_site_weights() {
    let kg = build(docs_site());
    let graph = kg.graph().unwrap();
    let id = |p: &str| graph.id(Path::new(p)).unwrap();

    // explicit 1 + taxonomy rust 1 + taxonomy guides 1 + topical 0.5 + sequential 0.25
    assert!((graph.incoming_weight(id("docs/usage.md")) - 3.75).abs() < 1e-9);
    // menu 10
    assert!((graph.incoming_weight(id("docs/_index.md")) - 10.0).abs() < 1e-9);
    // explicit via id 1 + taxonomy setup 1 + menu 10
    assert!((graph.incoming_weight(id("faq.md")) - 12.0).abs() < 1e-9);

    let metrics = graph.link_metrics(id("faq.md"));
    assert_eq!(metrics.menu, 10.0);
    assert!((metrics.total() - graph.incoming_weight(id("faq.md"))).abs() < 1e-9);

    assert_eq!(graph.analysis_pages().len(), 5);
    assert!(graph.verify_invariants().is_ok());
}

#[test]
fn test_full_site_analyses() {
    let kg = build(docs_site());

    let hubs = kg.hubs(None).unwrap();
    assert_eq!(hubs[0], PathBuf::from("faq.md"));
    assert!(hubs.contains(&PathBuf::from("docs/_index.md")));

    let metrics = kg.metrics().unwrap();
    assert_eq!(metrics.total_pages, 5);
    assert_eq!(metrics.orphan_count, 0);

    let layers = kg.layers().unwrap();
    assert_eq!(
        layers.hubs.len() + layers.mid_tier.len() + layers.leaves.len(),
        5
    );

    kg.pagerank(false).unwrap();
    kg.paths(false).unwrap();
    let suggestions = kg.suggestions_with(0.0, 5, false).unwrap();
    let graph = kg.graph().unwrap();
    for s in &suggestions.suggestions {
        assert_ne!(s.source, s.target);
        let source = graph.id(&s.source).unwrap();
        let target = graph.id(&s.target).unwrap();
        assert!(!graph.outgoing(source).contains(&target));
        assert!(!graph.page(target).is_generated());
        assert!(s.score >= 0.0 && s.score <= 1.0);
    }
    assert!(
        suggestions
            .suggestions_for_page(Path::new("blog/post.md"), 5)
            .iter()
            .any(|s| s.target == Path::new("docs/usage.md"))
    );

    let report = kg.health_report().unwrap();
    assert_eq!(report.metrics.total_pages, 5);
    assert!(report.format_stats().contains("Pages:            5"));
}

#[test]
fn test_parallel_and_sequential_agree() {
    init_logging();
    let site = docs_site();
    let config = GraphConfig::default();
    let sequential = GraphBuilder::new(&site, &config).parallel(false).build();
    let parallel = GraphBuilder::new(&site, &config)
        .parallel(true)
        .workers(4)
        .build();

    assert_eq!(sequential.stats().mode, BuildMode::Sequential);
    assert_eq!(parallel.stats().mode, BuildMode::Parallel);
    for (id, _) in sequential.pages() {
        assert_eq!(sequential.incoming_weight(id), parallel.incoming_weight(id));
        assert_eq!(sequential.outgoing(id), parallel.outgoing(id));

        let mut a = sequential.incoming_edges(id).to_vec();
        let mut b = parallel.incoming_edges(id).to_vec();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }
}

#[test]
fn test_include_generated_widens_analysis() {
    init_logging();
    let config = GraphConfig::builder().include_generated(true).build().unwrap();
    let mut kg = KnowledgeGraph::new(Arc::new(docs_site()), config).unwrap();
    kg.build();
    assert_eq!(kg.metrics().unwrap().total_pages, 7);
    let pr = kg.pagerank(false).unwrap();
    assert_eq!(pr.scores.len(), 7);
}
