//! Element model: a read-only view over a document tree.
//!
//! The engine never creates or destroys nodes of the live document; it only
//! holds identities and asks structural questions through [`Document`].
//! [`DomTree`] is the in-memory implementation used for page snapshots and
//! tests.

use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::host::InputCapture;

/// A point in client coordinates, as reported by the input layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Structural queries over a document.
///
/// All sequences are in document order.
pub trait Document {
    type Id: Copy + Eq + Hash + fmt::Debug;

    fn contains(&self, id: Self::Id) -> bool;
    fn tag(&self, id: Self::Id) -> Option<&str>;
    fn classes(&self, id: Self::Id) -> &[String];
    /// Concatenated text of the element and all of its descendants.
    fn text_content(&self, id: Self::Id) -> String;
    fn parent(&self, id: Self::Id) -> Option<Self::Id>;
    fn children(&self, id: Self::Id) -> &[Self::Id];

    fn root(&self) -> Option<Self::Id>;
    fn body(&self) -> Option<Self::Id>;
    /// Container of the recorder's own UI inside the document, if any.
    fn mount_point(&self) -> Option<Self::Id>;

    fn children_matching_tag(&self, id: Self::Id, tag: &str) -> Vec<Self::Id> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.tag(*child) == Some(tag))
            .collect()
    }

    /// Pre-order descendants, not including `id` itself.
    fn descendants(&self, id: Self::Id) -> Vec<Self::Id> {
        let mut out = Vec::new();
        let mut stack: Vec<Self::Id> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    fn descendants_matching_tag(&self, id: Self::Id, tag: &str) -> Vec<Self::Id> {
        self.descendants(id)
            .into_iter()
            .filter(|d| self.tag(*d) == Some(tag))
            .collect()
    }

    /// True when `id` is `ancestor` or lies somewhere below it.
    fn is_within(&self, id: Self::Id, ancestor: Self::Id) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Root, body and the recorder mount point can never be list elements.
    fn is_structural_anchor(&self, id: Self::Id) -> bool {
        [self.root(), self.body(), self.mount_point()].contains(&Some(id))
    }
}

/// Resolve the element under `point`, ignoring the recorder's own surface.
pub fn resolve_point<D, C>(doc: &D, capture: &C, point: Point) -> Option<D::Id>
where
    D: Document,
    C: InputCapture<D::Id> + ?Sized,
{
    let id = capture.element_at_point(point)?;
    if !doc.contains(id) {
        return None;
    }
    if let Some(mount) = doc.mount_point() {
        if doc.is_within(id, mount) {
            return None;
        }
    }
    Some(id)
}

/// Identity of a node inside a [`DomTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    classes: Vec<String>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attached: bool,
}

/// Arena-backed element tree.
///
/// A fresh tree holds `html` and `body`; everything else is appended below.
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    mount: Option<NodeId>,
}

/// One element of a serialized page, listed in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub tag: String,
    #[serde(default)]
    pub classes: Vec<String>,
    /// Own text, not including descendants.
    #[serde(default)]
    pub text: String,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    pub fn new() -> Self {
        let mut tree = Self::empty();
        let root = tree.push(None, "html", &[], "");
        tree.push(Some(root), "body", &[], "");
        tree
    }

    /// Tree without the implicit `html`/`body` pair, for snapshots that carry
    /// their own.
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            mount: None,
        }
    }

    /// Rebuild a tree from serialized nodes whose ids may be sparse.
    ///
    /// Ids missing from `specs` stay detached, so stale references from an
    /// earlier snapshot resolve to nothing. The first parentless node is the
    /// root; other orphans and nodes with an unknown parent are dropped.
    pub fn from_specs(specs: Vec<NodeSpec>) -> Self {
        let size = specs.iter().map(|s| s.id.0 + 1).max().unwrap_or(0);
        let mut tree = Self::empty();
        tree.nodes = (0..size)
            .map(|_| Node {
                tag: String::new(),
                classes: Vec::new(),
                text: String::new(),
                parent: None,
                children: Vec::new(),
                attached: false,
            })
            .collect();

        for spec in specs {
            let id = spec.id;
            if tree.nodes[id.0].attached {
                continue;
            }
            let parent = match spec.parent {
                None if tree.root.is_none() => None,
                Some(p) if tree.nodes.get(p.0).is_some_and(|n| n.attached) => Some(p),
                _ => continue,
            };
            let classes: Vec<&str> = spec.classes.iter().map(String::as_str).collect();
            tree.nodes[id.0] = Node {
                tag: spec.tag.to_ascii_lowercase(),
                classes: dedup_classes(&classes),
                text: spec.text,
                parent,
                children: Vec::new(),
                attached: true,
            };
            match parent {
                Some(p) => tree.nodes[p.0].children.push(id),
                None => tree.root = Some(id),
            }
        }
        tree
    }

    /// Append an element as the last child of `parent`.
    ///
    /// Tags are stored lower-cased; duplicate classes are dropped.
    pub fn append(&mut self, parent: NodeId, tag: &str, classes: &[&str], text: &str) -> NodeId {
        self.push(Some(parent), tag, classes, text)
    }

    /// Append a node, creating the root when `parent` is `None`.
    pub fn push(&mut self, parent: Option<NodeId>, tag: &str, classes: &[&str], text: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        let parent = parent.filter(|p| self.contains(*p));
        self.nodes.push(Node {
            tag: tag.to_ascii_lowercase(),
            classes: dedup_classes(classes),
            text: text.to_string(),
            parent,
            children: Vec::new(),
            attached: true,
        });
        match parent {
            Some(p) => self.nodes[p.0].children.push(id),
            None if self.root.is_none() => self.root = Some(id),
            None => {}
        }
        id
    }

    pub fn set_mount_point(&mut self, id: NodeId) {
        if self.contains(id) {
            self.mount = Some(id);
        }
    }

    /// Detach `id` and its subtree from the document.
    pub fn remove(&mut self, id: NodeId) {
        if !self.contains(id) {
            return;
        }
        if let Some(parent) = self.nodes[id.0].parent {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
        let mut doomed = vec![id];
        while let Some(next) = doomed.pop() {
            let node = &mut self.nodes[next.0];
            node.attached = false;
            doomed.extend(node.children.iter().copied());
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.attached).count()
    }

    /// One past the highest id this tree has slots for, attached or not.
    ///
    /// Numbering a later page from here keeps ids from this one detached.
    pub fn id_bound(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).filter(|n| n.attached)
    }
}

impl Document for DomTree {
    type Id = NodeId;

    fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    fn tag(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|n| n.tag.as_str())
    }

    fn classes(&self, id: NodeId) -> &[String] {
        self.node(id).map(|n| n.classes.as_slice()).unwrap_or(&[])
    }

    fn text_content(&self, id: NodeId) -> String {
        let Some(node) = self.node(id) else {
            return String::new();
        };
        let mut text = node.text.clone();
        for d in self.descendants(id) {
            if let Some(n) = self.node(d) {
                text.push_str(&n.text);
            }
        }
        text
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    fn root(&self) -> Option<NodeId> {
        self.root.filter(|r| self.contains(*r))
    }

    fn body(&self) -> Option<NodeId> {
        let root = self.root()?;
        self.children(root)
            .iter()
            .copied()
            .find(|c| self.tag(*c) == Some("body"))
    }

    fn mount_point(&self) -> Option<NodeId> {
        self.mount.filter(|m| self.contains(*m))
    }
}

fn dedup_classes(classes: &[&str]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(classes.len());
    for class in classes.iter().filter(|c| !c.is_empty()) {
        if !unique.iter().any(|c| c == class) {
            unique.push((*class).to_string());
        }
    }
    unique
}
