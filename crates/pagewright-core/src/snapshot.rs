//! Indexed, immutable snapshots of a live element tree.
//!
//! A [`Snapshot`] flattens a [`UIElement`] tree into a pre-order arena. The
//! node at arena position `p` has traversal index `p + 1`, so the root is
//! index 1 and a search bound of 0 covers the whole tree. Every node records
//! the end of its subtree, which turns "search this node's subtree after index
//! k" into a scan over a contiguous range.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::element::{ElementFrame, UIElement};
use crate::kind::ElementKind;

/// One (kind, identifier, label, value) tuple on the way from the root to a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathStep {
    pub kind: ElementKind,
    pub identifier: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.identifier.is_empty() {
            write!(f, "#{}", self.identifier)?;
        }
        if !self.label.is_empty() {
            write!(f, "[{:?}]", self.label)?;
        }
        if let Some(value) = &self.value {
            write!(f, "={:?}", value)?;
        }
        Ok(())
    }
}

/// A node of a [`Snapshot`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotNode {
    /// Pre-order traversal index, starting at 1 for the root.
    pub index: usize,
    /// Distance from the root.
    pub depth: usize,
    pub kind: ElementKind,
    pub identifier: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<ElementFrame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hittable: Option<bool>,
    #[serde(skip)]
    parent: Option<usize>,
    #[serde(skip)]
    end: usize,
}

impl SnapshotNode {
    /// This node's own attributes as a path step.
    pub fn step(&self) -> PathStep {
        PathStep {
            kind: self.kind,
            identifier: self.identifier.clone(),
            label: self.label.clone(),
            value: self.value.clone(),
        }
    }
}

/// A flattened, pre-order view of a live element tree.
#[derive(Debug, Clone)]
pub struct Snapshot {
    nodes: Vec<SnapshotNode>,
}

impl Snapshot {
    /// Builds a snapshot in a single pre-order pass.
    pub fn build(root: &UIElement) -> Self {
        let mut nodes = Vec::with_capacity(root.node_count());
        push_node(&mut nodes, root, None, 0);
        Self { nodes }
    }

    /// All nodes in pre-order.
    pub fn nodes(&self) -> &[SnapshotNode] {
        &self.nodes
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the snapshot has no nodes. A built snapshot always has a root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node at an arena position.
    pub fn node(&self, pos: usize) -> &SnapshotNode {
        &self.nodes[pos]
    }

    /// Arena positions of the strict descendants of `pos`.
    pub fn subtree(&self, pos: usize) -> Range<usize> {
        pos + 1..self.nodes[pos].end
    }

    /// Arena positions of the direct children of `pos`, in order.
    pub fn children(&self, pos: usize) -> impl Iterator<Item = usize> + '_ {
        let end = self.nodes[pos].end;
        let mut next = pos + 1;
        std::iter::from_fn(move || {
            if next >= end {
                return None;
            }
            let child = next;
            next = self.nodes[child].end;
            Some(child)
        })
    }

    /// The parent position, `None` for the root.
    pub fn parent(&self, pos: usize) -> Option<usize> {
        self.nodes[pos].parent
    }

    /// The root-to-node path of attribute tuples, inclusive of the node.
    pub fn path(&self, pos: usize) -> Vec<PathStep> {
        let mut path = Vec::with_capacity(self.nodes[pos].depth + 1);
        let mut cursor = Some(pos);
        while let Some(p) = cursor {
            path.push(self.nodes[p].step());
            cursor = self.nodes[p].parent;
        }
        path.reverse();
        path
    }

    /// Re-locates a recorded path and occurrence index.
    ///
    /// Paths are compared after dropping the root step and every generic
    /// container (`Other`) step above the target, so wrapper views that come
    /// and go between snapshots do not break re-location. Among the nodes
    /// with an equal path, `index` selects one in document order.
    pub fn locate(&self, path: &[PathStep], index: usize) -> Option<usize> {
        let wanted = relocation_key(path);
        (0..self.nodes.len())
            .filter(|&pos| relocation_key(&self.path(pos)) == wanted)
            .nth(index)
    }
}

fn push_node(nodes: &mut Vec<SnapshotNode>, element: &UIElement, parent: Option<usize>, depth: usize) {
    let pos = nodes.len();
    // Index before recursing so every descendant gets a larger one.
    nodes.push(SnapshotNode {
        index: pos + 1,
        depth,
        kind: element.element_type,
        identifier: element.identifier.clone(),
        label: element.label.clone(),
        value: element.value.clone(),
        frame: element.frame,
        hittable: element.hittable,
        parent,
        end: pos + 1,
    });
    for child in &element.children {
        push_node(nodes, child, Some(pos), depth + 1);
    }
    nodes[pos].end = nodes.len();
}

fn relocation_key(path: &[PathStep]) -> Vec<&PathStep> {
    let Some((target, above)) = path.split_last() else {
        return Vec::new();
    };
    let mut key: Vec<&PathStep> = above
        .iter()
        .skip(1)
        .filter(|step| step.kind != ElementKind::Other)
        .collect();
    key.push(target);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> UIElement {
        UIElement::new(ElementKind::Application).with_label("Demo").with_children([
            UIElement::new(ElementKind::Other).with_children([
                UIElement::new(ElementKind::StaticText).with_label("A"),
                UIElement::new(ElementKind::Button).with_label("B"),
            ]),
            UIElement::new(ElementKind::Cell).with_children([
                UIElement::new(ElementKind::StaticText).with_label("Row"),
            ]),
            UIElement::new(ElementKind::Cell).with_children([
                UIElement::new(ElementKind::StaticText).with_label("Row"),
            ]),
        ])
    }

    #[test]
    fn test_preorder_indices_strictly_increase() {
        let snapshot = Snapshot::build(&sample());
        assert_eq!(snapshot.len(), 8);
        for (pos, node) in snapshot.nodes().iter().enumerate() {
            assert_eq!(node.index, pos + 1);
            for child in snapshot.children(pos) {
                assert!(snapshot.node(child).index > node.index);
            }
        }
        let root_children: Vec<usize> = snapshot.children(0).collect();
        assert_eq!(root_children, vec![1, 4, 6]);
        // Each sibling's subtree lies strictly after the previous sibling's.
        for pair in root_children.windows(2) {
            let first_end = snapshot.subtree(pair[0]).end;
            assert!(pair[1] >= first_end);
        }
    }

    #[test]
    fn test_subtree_and_depth() {
        let snapshot = Snapshot::build(&sample());
        assert_eq!(snapshot.subtree(0), 1..8);
        assert_eq!(snapshot.subtree(1), 2..4);
        assert!(snapshot.subtree(2).is_empty());
        assert_eq!(snapshot.node(3).depth, 2);
        assert_eq!(snapshot.parent(3), Some(1));
        assert_eq!(snapshot.parent(0), None);
    }

    #[test]
    fn test_path_runs_from_root_to_node() {
        let snapshot = Snapshot::build(&sample());
        let path = snapshot.path(3);
        let kinds: Vec<ElementKind> = path.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![ElementKind::Application, ElementKind::Other, ElementKind::Button]);
        assert_eq!(path[2].label, "B");
    }

    #[test]
    fn test_locate_ignores_wrapper_containers() {
        let snapshot = Snapshot::build(&sample());
        let recorded = snapshot.path(3);

        let rewrapped = UIElement::new(ElementKind::Application).with_label("Demo").with_children([
            UIElement::new(ElementKind::Other).with_children([UIElement::new(ElementKind::Other)
                .with_children([UIElement::new(ElementKind::Button).with_label("B")])]),
        ]);
        let fresh = Snapshot::build(&rewrapped);
        assert_eq!(fresh.locate(&recorded, 0), Some(3));
    }

    #[test]
    fn test_locate_uses_occurrence_index() {
        let snapshot = Snapshot::build(&sample());
        let path = snapshot.path(5);
        assert_eq!(snapshot.locate(&path, 0), Some(5));
        assert_eq!(snapshot.locate(&path, 1), Some(7));
        assert_eq!(snapshot.locate(&path, 2), None);
    }
}
