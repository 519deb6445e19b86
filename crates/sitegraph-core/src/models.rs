//! Data models consumed by the graph engine.
//!
//! These types are owned by the content layer. The engine only reads them
//! and produces derived data keyed by page identity (`source_path`).
//!
//! Every optional relationship is an explicit field that defaults to empty,
//! so the builder never has to ask whether an attribute exists.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Kind of relationship that produced an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    /// Link written in page content: `[text](other.md)`
    Explicit,
    /// Shared tag or category term
    Taxonomy,
    /// Pre-computed related post
    Related,
    /// Navigation menu entry
    Menu,
    /// Section index page to child page
    Topical,
    /// Next/previous navigation within a section
    Sequential,
}

impl LinkType {
    /// All link types, in the order the builder processes their sources
    pub const ALL: [LinkType; 6] = [
        LinkType::Explicit,
        LinkType::Taxonomy,
        LinkType::Related,
        LinkType::Menu,
        LinkType::Topical,
        LinkType::Sequential,
    ];

    /// Stable lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Taxonomy => "taxonomy",
            Self::Related => "related",
            Self::Menu => "menu",
            Self::Topical => "topical",
            Self::Sequential => "sequential",
        }
    }
}

impl std::fmt::Display for LinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incoming-weight contributed by each link type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkWeights {
    pub explicit: f64,
    pub taxonomy: f64,
    pub related: f64,
    pub menu: f64,
    pub topical: f64,
    pub sequential: f64,
}

impl Default for LinkWeights {
    fn default() -> Self {
        Self {
            explicit: 1.0,
            taxonomy: 1.0,
            related: 1.0,
            menu: 10.0,
            topical: 0.5,
            sequential: 0.25,
        }
    }
}

impl LinkWeights {
    /// Weight for a link type
    pub fn weight(&self, link_type: LinkType) -> f64 {
        match link_type {
            LinkType::Explicit => self.explicit,
            LinkType::Taxonomy => self.taxonomy,
            LinkType::Related => self.related,
            LinkType::Menu => self.menu,
            LinkType::Topical => self.topical,
            LinkType::Sequential => self.sequential,
        }
    }
}

/// A content page as seen by the graph engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Page {
    /// Unique identity of the page
    pub source_path: PathBuf,
    pub title: String,
    /// URL slug; falls back to the file stem
    pub slug: Option<String>,
    /// Cross-reference id (`id:` links)
    pub id: Option<String>,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    /// Raw link tokens extracted from content
    pub links: Vec<String>,
    /// Already-resolved related posts
    pub related_posts: Vec<PathBuf>,
    pub next_in_section: Option<PathBuf>,
    pub prev_in_section: Option<PathBuf>,
    /// Key of the parent section in [`Site::sections`]
    pub section: Option<String>,
    /// Page produced by the generator (tag listings, archives, ...)
    pub generated: bool,
    /// Page produced from API documentation
    pub autodoc: bool,
}

impl Page {
    /// Create a page with the given source path and no relationships
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.links = links.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_related<I, P>(mut self, related: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.related_posts = related.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_next(mut self, next: impl Into<PathBuf>) -> Self {
        self.next_in_section = Some(next.into());
        self
    }

    pub fn with_prev(mut self, prev: impl Into<PathBuf>) -> Self {
        self.prev_in_section = Some(prev.into());
        self
    }

    pub fn in_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// Mark the page as generated
    pub fn generated(mut self) -> Self {
        self.generated = true;
        self
    }

    /// Mark the page as API documentation output
    pub fn autodoc(mut self) -> Self {
        self.autodoc = true;
        self
    }

    /// Whether the page is excluded from analysis by default
    pub fn is_generated(&self) -> bool {
        self.generated || self.autodoc
    }

    /// Stable identifier used for sorting and display.
    ///
    /// Explicit slug, otherwise the file stem; `index`/`_index` pages use
    /// their directory name.
    pub fn slug(&self) -> String {
        if let Some(slug) = &self.slug {
            return slug.clone();
        }
        let stem = self
            .source_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        if stem == "index" || stem == "_index" {
            if let Some(dir) = self
                .source_path
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|s| s.to_str())
            {
                return dir.to_string();
            }
        }
        stem.to_string()
    }
}

/// A content section; its index page links to every child page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Section {
    pub name: String,
    pub index_page: Option<PathBuf>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index_page: None,
        }
    }

    pub fn with_index(mut self, index_page: impl Into<PathBuf>) -> Self {
        self.index_page = Some(index_page.into());
        self
    }
}

/// A navigation menu entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuItem {
    pub name: String,
    /// Page the entry points to, if it points inside the site
    pub page: Option<PathBuf>,
    pub children: Vec<MenuItem>,
}

impl MenuItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn for_page(name: impl Into<String>, page: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            page: Some(page.into()),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<MenuItem>) -> Self {
        self.children = children;
        self
    }

    /// Visit this entry and all nested children, depth first
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a MenuItem)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// Taxonomy name → term → pages carrying the term
pub type Taxonomies = BTreeMap<String, BTreeMap<String, Vec<PathBuf>>>;

/// Site-wide cross-reference index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XrefIndex {
    pub by_id: HashMap<String, PathBuf>,
    pub by_path: HashMap<String, PathBuf>,
    pub by_slug: HashMap<String, PathBuf>,
}

impl XrefIndex {
    /// Build an index from page ids, source paths and slugs
    pub fn from_pages<'a>(pages: impl IntoIterator<Item = &'a Page>) -> Self {
        let mut index = Self::default();
        for page in pages {
            let path = page.source_path.clone();
            if let Some(id) = &page.id {
                index.by_id.entry(id.clone()).or_insert_with(|| path.clone());
            }
            let path_key = path_key(&page.source_path);
            if let Some(stripped) = strip_extension(&path_key) {
                index
                    .by_path
                    .entry(stripped.to_string())
                    .or_insert_with(|| path.clone());
            }
            index.by_path.entry(path_key).or_insert_with(|| path.clone());
            index.by_slug.entry(page.slug()).or_insert(path);
        }
        index
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty() && self.by_path.is_empty() && self.by_slug.is_empty()
    }

    /// Resolve a raw link token: by id, then by path, then by slug.
    ///
    /// External URLs never resolve. Fragments, queries, a leading `/` or
    /// `./` and trailing slashes are ignored.
    pub fn resolve(&self, token: &str) -> Option<&Path> {
        let token = token.trim();
        if token.is_empty() || token.contains("://") || token.starts_with("mailto:") {
            return None;
        }

        let without_fragment = token.split(['#', '?']).next().unwrap_or_default();
        if without_fragment.is_empty() {
            // Same-page anchor
            return None;
        }

        let id = without_fragment.strip_prefix("id:").unwrap_or(without_fragment);
        if let Some(path) = self.by_id.get(id) {
            return Some(path);
        }

        let cleaned = without_fragment
            .trim_start_matches("./")
            .trim_start_matches('/')
            .trim_end_matches('/');
        if cleaned.is_empty() {
            return None;
        }
        if let Some(path) = self.by_path.get(cleaned) {
            return Some(path);
        }
        if let Some(stripped) = strip_extension(cleaned)
            && let Some(path) = self.by_path.get(stripped)
        {
            return Some(path);
        }

        let last = cleaned.rsplit('/').next().unwrap_or(cleaned);
        let slug = strip_extension(last).unwrap_or(last);
        self.by_slug.get(slug).map(PathBuf::as_path)
    }
}

fn path_key(path: &Path) -> String {
    path.iter()
        .filter_map(|c| c.to_str())
        .collect::<Vec<_>>()
        .join("/")
}

fn strip_extension(key: &str) -> Option<&str> {
    key.strip_suffix(".md").or_else(|| key.strip_suffix(".html"))
}

/// Everything the graph engine reads from the content layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Site {
    pub pages: Vec<Page>,
    pub taxonomies: Taxonomies,
    /// Menu name → top-level entries
    pub menus: BTreeMap<String, Vec<MenuItem>>,
    /// Section name → section
    pub sections: HashMap<String, Section>,
    pub xref_index: XrefIndex,
}

impl Site {
    /// Create a site with pages and no other structure
    pub fn new(pages: Vec<Page>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    pub fn with_taxonomies(mut self, taxonomies: Taxonomies) -> Self {
        self.taxonomies = taxonomies;
        self
    }

    pub fn with_menu(mut self, name: impl Into<String>, items: Vec<MenuItem>) -> Self {
        self.menus.insert(name.into(), items);
        self
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.insert(section.name.clone(), section);
        self
    }

    pub fn with_xref_index(mut self, index: XrefIndex) -> Self {
        self.xref_index = index;
        self
    }

    /// Index the pages' own tags and categories into `tags`/`categories`
    /// taxonomies, replacing those two entries
    pub fn with_page_taxonomies(mut self) -> Self {
        let mut tags: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for page in &self.pages {
            for tag in &page.tags {
                tags.entry(normalize_term(tag))
                    .or_default()
                    .push(page.source_path.clone());
            }
            for category in &page.categories {
                categories
                    .entry(normalize_term(category))
                    .or_default()
                    .push(page.source_path.clone());
            }
        }
        self.taxonomies.insert("tags".to_string(), tags);
        self.taxonomies.insert("categories".to_string(), categories);
        self
    }

    /// Build the cross-reference index from the pages themselves
    pub fn with_page_xrefs(mut self) -> Self {
        self.xref_index = XrefIndex::from_pages(&self.pages);
        self
    }

    /// Look up a page by source path
    pub fn page(&self, path: &Path) -> Option<&Page> {
        self.pages.iter().find(|p| p.source_path == path)
    }
}

/// Canonical form of a tag or category term
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_fallbacks() {
        assert_eq!(Page::new("blog/hello-world.md").slug(), "hello-world");
        assert_eq!(Page::new("docs/guide/_index.md").slug(), "guide");
        assert_eq!(Page::new("docs/a.md").with_slug("custom").slug(), "custom");
    }

    #[test]
    fn test_generated_flags() {
        assert!(!Page::new("a.md").is_generated());
        assert!(Page::new("tags/rust.md").generated().is_generated());
        assert!(Page::new("api/mod.md").autodoc().is_generated());
    }

    #[test]
    fn test_link_weights_defaults() {
        let weights = LinkWeights::default();
        assert_eq!(weights.weight(LinkType::Menu), 10.0);
        assert_eq!(weights.weight(LinkType::Topical), 0.5);
        assert_eq!(weights.weight(LinkType::Sequential), 0.25);
        assert_eq!(weights.weight(LinkType::Explicit), 1.0);
    }

    #[test]
    fn test_xref_resolution_order() {
        let pages = vec![
            Page::new("docs/install.md").with_id("setup"),
            Page::new("blog/setup.md"),
        ];
        let index = XrefIndex::from_pages(&pages);

        // id wins over slug
        assert_eq!(index.resolve("setup"), Some(Path::new("docs/install.md")));
        assert_eq!(index.resolve("id:setup"), Some(Path::new("docs/install.md")));
        // path forms
        assert_eq!(index.resolve("/blog/setup.md"), Some(Path::new("blog/setup.md")));
        assert_eq!(index.resolve("blog/setup/"), Some(Path::new("blog/setup.md")));
        assert_eq!(
            index.resolve("docs/install.md#step-2"),
            Some(Path::new("docs/install.md"))
        );
        // slug fallback from a different directory
        assert_eq!(index.resolve("../other/install"), Some(Path::new("docs/install.md")));
    }

    #[test]
    fn test_xref_rejects_external_and_anchors() {
        let index = XrefIndex::from_pages(&[Page::new("a.md")]);
        assert_eq!(index.resolve("https://example.com/a"), None);
        assert_eq!(index.resolve("mailto:me@example.com"), None);
        assert_eq!(index.resolve("#section"), None);
        assert_eq!(index.resolve("   "), None);
        assert_eq!(index.resolve("missing"), None);
    }

    #[test]
    fn test_page_taxonomies() {
        let site = Site::new(vec![
            Page::new("a.md").with_tags(["Rust", "graphs"]),
            Page::new("b.md").with_tags(["rust "]).with_categories(["Guides"]),
        ])
        .with_page_taxonomies();

        let tags = &site.taxonomies["tags"];
        assert_eq!(tags["rust"].len(), 2);
        assert_eq!(tags["graphs"], vec![PathBuf::from("a.md")]);
        assert_eq!(site.taxonomies["categories"]["guides"].len(), 1);
    }

    #[test]
    fn test_menu_walk_visits_children() {
        let menu = MenuItem::new("Docs").with_children(vec![
            MenuItem::for_page("Intro", "docs/intro.md"),
            MenuItem::new("More").with_children(vec![MenuItem::for_page("Deep", "docs/deep.md")]),
        ]);
        let mut pages = Vec::new();
        menu.walk(&mut |item| {
            if let Some(page) = &item.page {
                pages.push(page.clone());
            }
        });
        assert_eq!(pages.len(), 2);
    }
}
