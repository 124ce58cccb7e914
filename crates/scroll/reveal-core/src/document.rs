//! Host document contract and an in-memory implementation.
//!
//! The core never touches a real DOM. Adapters implement [`Host`] (or mirror
//! geometry into a [`MemoryDocument`]) and the stage queries it for subtree
//! membership, bounds and rebuilds.

use std::fmt;
use std::str::FromStr;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::RevealError;
use crate::ids::ElementId;
use crate::layout::{CarouselState, LayoutMode};

/// Element geometry in document coordinates (unaffected by scroll).
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub top: f32,
    pub height: f32,
    #[serde(default)]
    pub width: f32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Matcher {
    Any,
    Class(String),
    Tag(String),
}

/// Minimal selector: `.class`, `tag` or `*`, optionally prefixed by `>` to
/// restrict matches to direct children of the scope root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    child_only: bool,
    matcher: Matcher,
}

impl Selector {
    pub fn class(name: &str) -> Self {
        Self {
            child_only: false,
            matcher: Matcher::Class(name.to_string()),
        }
    }

    pub fn children() -> Self {
        Self {
            child_only: true,
            matcher: Matcher::Any,
        }
    }

    fn matches(&self, node: &Node) -> bool {
        match &self.matcher {
            Matcher::Any => true,
            Matcher::Class(c) => node.classes.iter().any(|k| k == c),
            Matcher::Tag(t) => node.tag.eq_ignore_ascii_case(t),
        }
    }
}

impl FromStr for Selector {
    type Err = RevealError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || RevealError::InvalidSelector {
            selector: raw.to_string(),
        };
        let mut s = raw.trim();
        let child_only = if let Some(rest) = s.strip_prefix('>') {
            s = rest.trim_start();
            true
        } else {
            false
        };
        let valid_ident = |v: &str| {
            !v.is_empty()
                && v.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        };
        let matcher = if s == "*" {
            Matcher::Any
        } else if let Some(class) = s.strip_prefix('.') {
            if !valid_ident(class) {
                return Err(invalid());
            }
            Matcher::Class(class.to_string())
        } else if valid_ident(s) {
            Matcher::Tag(s.to_string())
        } else {
            return Err(invalid());
        };
        Ok(Selector {
            child_only,
            matcher,
        })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.child_only {
            write!(f, "> ")?;
        }
        match &self.matcher {
            Matcher::Any => write!(f, "*"),
            Matcher::Class(c) => write!(f, ".{c}"),
            Matcher::Tag(t) => write!(f, "{t}"),
        }
    }
}

/// What the stage needs from the host document.
pub trait Host {
    /// True while the element is part of the live document.
    fn is_attached(&self, el: ElementId) -> bool;

    /// Document-space bounds of an attached element.
    fn bounds(&self, el: ElementId) -> Option<Bounds>;

    /// True when `el` is `root` or one of its descendants.
    fn contains(&self, root: ElementId, el: ElementId) -> bool;

    /// Descendants of `root` matching `selector`, in document order.
    fn query(&self, root: ElementId, selector: &Selector) -> Vec<ElementId>;

    /// Replace the subtree under `root` with the markup for `mode`.
    fn rebuild(&mut self, root: ElementId, mode: LayoutMode, carousel: Option<&CarouselState>);
}

/// Serializable description of one element, used to populate a [`MemoryDocument`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub id: ElementId,
    #[serde(default)]
    pub parent: Option<ElementId>,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub bounds: Bounds,
}

fn default_tag() -> String {
    "div".to_string()
}

impl ElementSpec {
    pub fn new(id: u32, parent: Option<u32>, classes: &[&str], bounds: Bounds) -> Self {
        Self {
            id: ElementId(id),
            parent: parent.map(ElementId),
            tag: default_tag(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
            bounds,
        }
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag = tag.to_string();
        self
    }
}

#[derive(Clone, Debug)]
struct Node {
    parent: Option<ElementId>,
    tag: String,
    classes: Vec<String>,
    bounds: Bounds,
    children: Vec<ElementId>,
}

/// In-memory element tree implementing [`Host`].
///
/// Rebuilds swap in a per-(root, mode) template registered with
/// [`MemoryDocument::set_template`] and leave the subtree alone when none is
/// registered. Every rebuild is recorded so callers can observe ordering.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    nodes: HashMap<ElementId, Node>,
    templates: HashMap<(ElementId, LayoutMode), Vec<ElementSpec>>,
    rebuilds: Vec<(ElementId, LayoutMode)>,
    // children inserted before their parent, keyed by the missing parent
    orphans: HashMap<ElementId, Vec<ElementId>>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update an element.
    ///
    /// Updating an existing element keeps its children and only relinks it
    /// when the parent changes. A missing parent leaves the element detached
    /// until that parent is inserted, which then adopts it.
    pub fn insert(&mut self, spec: ElementSpec) {
        let id = spec.id;
        let mut parent = spec.parent;
        if parent.is_some_and(|p| self.contains(id, p)) {
            log::warn!("element {id:?} cannot be parented under its own subtree; leaving it detached");
            parent = None;
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.tag = spec.tag;
            node.classes = spec.classes;
            node.bounds = spec.bounds;
            let previous = node.parent;
            if previous == parent {
                return;
            }
            node.parent = parent;
            self.unlink(id, previous);
            self.link(id, parent);
            return;
        }
        let children = self.orphans.remove(&id).unwrap_or_default();
        self.nodes.insert(
            id,
            Node {
                parent,
                tag: spec.tag,
                classes: spec.classes,
                bounds: spec.bounds,
                children,
            },
        );
        self.link(id, parent);
    }

    /// Remove an element and its whole subtree.
    pub fn remove(&mut self, el: ElementId) {
        let Some(node) = self.nodes.remove(&el) else {
            return;
        };
        self.unlink(el, node.parent);
        for child in node.children {
            self.remove(child);
        }
    }

    fn link(&mut self, el: ElementId, parent: Option<ElementId>) {
        let Some(parent) = parent else {
            return;
        };
        match self.nodes.get_mut(&parent) {
            Some(p) => p.children.push(el),
            None => self.orphans.entry(parent).or_default().push(el),
        }
    }

    fn unlink(&mut self, el: ElementId, parent: Option<ElementId>) {
        let Some(parent) = parent else {
            return;
        };
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.retain(|c| *c != el);
        } else if let Some(waiting) = self.orphans.get_mut(&parent) {
            waiting.retain(|c| *c != el);
            if waiting.is_empty() {
                self.orphans.remove(&parent);
            }
        }
    }

    pub fn set_bounds(&mut self, el: ElementId, bounds: Bounds) -> bool {
        match self.nodes.get_mut(&el) {
            Some(n) => {
                n.bounds = bounds;
                true
            }
            None => false,
        }
    }

    /// Register the subtree that replaces `root`'s children when rebuilt for `mode`.
    pub fn set_template(&mut self, root: ElementId, mode: LayoutMode, children: Vec<ElementSpec>) {
        self.templates.insert((root, mode), children);
    }

    /// Every rebuild performed so far, oldest first.
    pub fn rebuilds(&self) -> &[(ElementId, LayoutMode)] {
        &self.rebuilds
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn collect(&self, at: ElementId, selector: &Selector, out: &mut Vec<ElementId>) {
        let Some(node) = self.nodes.get(&at) else {
            return;
        };
        for child in &node.children {
            if let Some(c) = self.nodes.get(child) {
                if selector.matches(c) {
                    out.push(*child);
                }
                if !selector.child_only {
                    self.collect(*child, selector, out);
                }
            }
        }
    }
}

impl Host for MemoryDocument {
    fn is_attached(&self, el: ElementId) -> bool {
        self.nodes.contains_key(&el)
    }

    fn bounds(&self, el: ElementId) -> Option<Bounds> {
        self.nodes.get(&el).map(|n| n.bounds)
    }

    fn contains(&self, root: ElementId, el: ElementId) -> bool {
        let mut cursor = Some(el);
        while let Some(cur) = cursor {
            if cur == root {
                return true;
            }
            cursor = self.nodes.get(&cur).and_then(|n| n.parent);
        }
        false
    }

    fn query(&self, root: ElementId, selector: &Selector) -> Vec<ElementId> {
        let mut out = Vec::new();
        self.collect(root, selector, &mut out);
        out
    }

    fn rebuild(&mut self, root: ElementId, mode: LayoutMode, _carousel: Option<&CarouselState>) {
        self.rebuilds.push((root, mode));
        // without a template the existing markup serves both modes
        let Some(template) = self.templates.get(&(root, mode)).cloned() else {
            return;
        };
        let children: Vec<ElementId> = self
            .nodes
            .get(&root)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        for child in children {
            self.remove(child);
        }
        for spec in template {
            self.insert(spec);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutMode;

    fn b(top: f32) -> Bounds {
        Bounds {
            top,
            height: 100.0,
            width: 300.0,
        }
    }

    fn sample() -> MemoryDocument {
        let mut doc = MemoryDocument::new();
        doc.insert(ElementSpec::new(1, None, &["section"], b(0.0)));
        doc.insert(ElementSpec::new(2, Some(1), &["card"], b(0.0)));
        doc.insert(ElementSpec::new(3, Some(2), &["card__text-item"], b(10.0)));
        doc.insert(ElementSpec::new(4, Some(2), &["card__text-item"], b(20.0)));
        doc.insert(ElementSpec::new(5, Some(1), &["card"], b(200.0)));
        doc.insert(ElementSpec::new(6, None, &["card"], b(900.0)));
        doc
    }

    #[test]
    fn query_is_scoped_and_ordered() {
        let doc = sample();
        let sel: Selector = ".card".parse().unwrap();
        assert_eq!(doc.query(ElementId(1), &sel), vec![ElementId(2), ElementId(5)]);
        let text: Selector = ".card__text-item".parse().unwrap();
        assert_eq!(doc.query(ElementId(1), &text), vec![ElementId(3), ElementId(4)]);
        let kids: Selector = "> *".parse().unwrap();
        assert_eq!(doc.query(ElementId(1), &kids), vec![ElementId(2), ElementId(5)]);
    }

    #[test]
    fn contains_walks_ancestors() {
        let doc = sample();
        assert!(doc.contains(ElementId(1), ElementId(4)));
        assert!(!doc.contains(ElementId(5), ElementId(4)));
        assert!(!doc.contains(ElementId(1), ElementId(6)));
    }

    #[test]
    fn remove_drops_subtree() {
        let mut doc = sample();
        doc.remove(ElementId(2));
        assert!(!doc.is_attached(ElementId(3)));
        assert!(doc.is_attached(ElementId(5)));
    }

    #[test]
    fn rebuild_swaps_in_template() {
        let mut doc = sample();
        doc.set_template(
            ElementId(1),
            LayoutMode::Carousel,
            vec![ElementSpec::new(40, Some(1), &["carousel-item"], b(0.0))],
        );
        doc.rebuild(ElementId(1), LayoutMode::Carousel, None);
        assert!(!doc.is_attached(ElementId(2)));
        assert!(doc.is_attached(ElementId(40)));
        assert_eq!(doc.rebuilds(), &[(ElementId(1), LayoutMode::Carousel)]);
    }

    #[test]
    fn selector_parsing() {
        assert!("".parse::<Selector>().is_err());
        assert!(".".parse::<Selector>().is_err());
        assert!("p".parse::<Selector>().is_ok());
        assert_eq!(">.card".parse::<Selector>().unwrap().to_string(), "> .card");
    }

    #[test]
    fn reinserting_a_root_keeps_its_subtree() {
        let mut doc = sample();
        doc.insert(ElementSpec::new(1, None, &["section", "wide"], b(50.0)));
        assert!(doc.is_attached(ElementId(3)));
        assert_eq!(doc.bounds(ElementId(1)), Some(b(50.0)));
        let sel: Selector = ".card".parse().unwrap();
        assert_eq!(doc.query(ElementId(1), &sel), vec![ElementId(2), ElementId(5)]);
        assert!(doc.contains(ElementId(1), ElementId(4)));
        let wide: Selector = ".wide".parse().unwrap();
        assert!(doc.query(ElementId(1), &wide).is_empty());
    }

    #[test]
    fn reparenting_moves_the_element() {
        let mut doc = sample();
        doc.insert(ElementSpec::new(3, Some(5), &["card__text-item"], b(10.0)));
        let text: Selector = ".card__text-item".parse().unwrap();
        assert_eq!(doc.query(ElementId(2), &text), vec![ElementId(4)]);
        assert_eq!(doc.query(ElementId(5), &text), vec![ElementId(3)]);
        assert!(doc.contains(ElementId(1), ElementId(3)));
    }

    #[test]
    fn children_inserted_first_are_adopted_in_order() {
        let mut doc = MemoryDocument::new();
        doc.insert(ElementSpec::new(3, Some(2), &["item"], b(10.0)));
        doc.insert(ElementSpec::new(4, Some(2), &["item"], b(20.0)));
        doc.insert(ElementSpec::new(2, Some(1), &["card"], b(0.0)));
        doc.insert(ElementSpec::new(1, None, &["section"], b(0.0)));
        let items: Selector = ".item".parse().unwrap();
        assert_eq!(doc.query(ElementId(1), &items), vec![ElementId(3), ElementId(4)]);
        assert!(doc.contains(ElementId(1), ElementId(4)));
    }

    #[test]
    fn removing_a_waiting_child_forgets_it() {
        let mut doc = MemoryDocument::new();
        doc.insert(ElementSpec::new(3, Some(2), &["item"], b(10.0)));
        doc.remove(ElementId(3));
        doc.insert(ElementSpec::new(2, None, &["card"], b(0.0)));
        assert!(doc.query(ElementId(2), &Selector::children()).is_empty());
    }

    #[test]
    fn parenting_under_own_subtree_detaches() {
        let mut doc = sample();
        doc.insert(ElementSpec::new(2, Some(3), &["card"], b(0.0)));
        assert!(!doc.contains(ElementId(1), ElementId(2)));
        assert!(doc.contains(ElementId(2), ElementId(3)));
        assert_eq!(doc.query(ElementId(1), &Selector::children()), vec![ElementId(5)]);
    }
}
