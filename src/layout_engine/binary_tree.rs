//! The BSP tree behind every workspace.
//!
//! Nodes live in a per-tree arena. Children are owned through the `first` and
//! `second` ids stored in a split; `parent` is a back-reference used only to
//! walk upwards during neighbour search. Removing nodes from the arena is done
//! exclusively by the collapse logic, after the removed node's children have
//! been re-parented or dropped.

use ascii_tree::Tree as AsciiTree;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use tracing::{debug, trace};

use super::error::LayoutError;
use crate::common::collections::HashSet;
use crate::layout_engine::{Direction, Orientation};
use crate::sys::geometry::{EPSILON, Rect, Size};
use crate::sys::window_server::WindowId;

slotmap::new_key_type! { pub struct NodeId; }

pub const DEFAULT_RATIO: f64 = 0.5;
pub const MIN_RATIO: f64 = 0.1;
pub const MAX_RATIO: f64 = 0.9;

/// Which child an insert descends into when it meets a split.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InsertionPolicy {
    /// Always the first child. New windows keep carving up the first leaf,
    /// so the layout spirals into the top-left corner.
    #[default]
    FirstChild,
    /// The child holding fewer windows, first child on ties.
    FewestWindows,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum NodeKind {
    Split {
        orientation: Orientation,
        ratio: f64,
        first: NodeId,
        second: NodeId,
    },
    Leaf {
        window: Option<WindowId>,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Node {
    parent: Option<NodeId>,
    rect: Rect,
    kind: NodeKind,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> { self.parent }

    pub fn rect(&self) -> Rect { self.rect }

    pub fn kind(&self) -> &NodeKind { &self.kind }

    pub fn is_leaf(&self) -> bool { matches!(self.kind, NodeKind::Leaf { .. }) }

    pub fn is_empty_leaf(&self) -> bool { matches!(self.kind, NodeKind::Leaf { window: None }) }

    /// The window held by this node, if it is an occupied leaf.
    pub fn window(&self) -> Option<WindowId> {
        match self.kind {
            NodeKind::Leaf { window } => window,
            NodeKind::Split { .. } => None,
        }
    }

    pub fn children(&self) -> Option<(NodeId, NodeId)> {
        match self.kind {
            NodeKind::Split { first, second, .. } => Some((first, second)),
            NodeKind::Leaf { .. } => None,
        }
    }
}

/// Divides `rect` along `orientation`, giving `ratio` of it to the first half.
/// The first half always contains the original origin.
pub(crate) fn split_rect(rect: Rect, orientation: Orientation, ratio: f64) -> (Rect, Rect) {
    match orientation {
        Orientation::Vertical => {
            let first_w = rect.size.width * ratio;
            (
                Rect::new(rect.origin, Size::new(first_w, rect.size.height)),
                Rect::from_xywh(
                    rect.origin.x + first_w,
                    rect.origin.y,
                    rect.size.width - first_w,
                    rect.size.height,
                ),
            )
        }
        Orientation::Horizontal => {
            let first_h = rect.size.height * ratio;
            (
                Rect::new(rect.origin, Size::new(rect.size.width, first_h)),
                Rect::from_xywh(
                    rect.origin.x,
                    rect.origin.y + first_h,
                    rect.size.width,
                    rect.size.height - first_h,
                ),
            )
        }
    }
}

fn check_ratio(ratio: f64) -> Result<f64, LayoutError> {
    if ratio > 0.0 && ratio < 1.0 {
        Ok(ratio)
    } else {
        Err(LayoutError::InvalidRatio(ratio))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BspTree {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    split_ratio: f64,
    insertion: InsertionPolicy,
}

impl BspTree {
    /// A tree made of a single empty leaf covering `rect`.
    pub fn new(rect: Rect) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node {
            parent: None,
            rect,
            kind: NodeKind::Leaf { window: None },
        });
        Self {
            nodes,
            root,
            split_ratio: DEFAULT_RATIO,
            insertion: InsertionPolicy::default(),
        }
    }

    pub fn with_settings(
        rect: Rect,
        split_ratio: f64,
        insertion: InsertionPolicy,
    ) -> Result<Self, LayoutError> {
        let split_ratio = check_ratio(split_ratio)?;
        let mut tree = Self::new(rect);
        tree.split_ratio = split_ratio;
        tree.insertion = insertion;
        Ok(tree)
    }

    pub fn root(&self) -> NodeId { self.root }

    /// The rectangle covered by the whole tree.
    pub fn rect(&self) -> Rect { self.nodes[self.root].rect }

    pub fn split_ratio(&self) -> f64 { self.split_ratio }

    /// Only affects splits made from now on.
    pub fn set_split_ratio(&mut self, ratio: f64) -> Result<(), LayoutError> {
        self.split_ratio = check_ratio(ratio)?;
        Ok(())
    }

    pub fn insertion_policy(&self) -> InsertionPolicy { self.insertion }

    pub fn set_insertion_policy(&mut self, policy: InsertionPolicy) { self.insertion = policy; }

    pub fn node(&self, id: NodeId) -> Option<&Node> { self.nodes.get(id) }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> { self.nodes.get(id).and_then(|n| n.parent) }

    fn node_or_err(&self, id: NodeId) -> Result<&Node, LayoutError> {
        self.nodes.get(id).ok_or(LayoutError::UnknownNode(id))
    }

    fn is_empty_leaf(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(Node::is_empty_leaf)
    }

    /// Places `window` in the tree, starting the descent at the root.
    pub fn insert(&mut self, window: WindowId) -> Result<NodeId, LayoutError> {
        self.insert_under(self.root, window)
    }

    /// Descends from `node` according to the insertion policy and places
    /// `window` in the leaf it reaches, splitting it if it is occupied.
    /// Returns the leaf that now holds the window.
    pub fn insert_under(&mut self, node: NodeId, window: WindowId) -> Result<NodeId, LayoutError> {
        self.node_or_err(node)?;
        if self.contains_window(window) {
            return Err(LayoutError::DuplicateWindow(window));
        }

        let mut current = node;
        loop {
            match self.nodes[current].kind {
                NodeKind::Split { first, second, .. } => {
                    current = self.choose_child(first, second);
                }
                NodeKind::Leaf { window: None } => {
                    self.nodes[current].kind = NodeKind::Leaf { window: Some(window) };
                    trace!(?current, %window, "Occupied empty leaf");
                    return Ok(current);
                }
                NodeKind::Leaf { window: Some(_) } => {
                    let (_, second) = self.split(current, window)?;
                    return Ok(second);
                }
            }
        }
    }

    fn choose_child(&self, first: NodeId, second: NodeId) -> NodeId {
        match self.insertion {
            InsertionPolicy::FirstChild => first,
            InsertionPolicy::FewestWindows => {
                if self.count_windows(second) < self.count_windows(first) {
                    second
                } else {
                    first
                }
            }
        }
    }

    /// Turns an occupied leaf into a split. The existing window moves to the
    /// first child, `new_window` goes to the second. Either everything
    /// happens or nothing does.
    pub fn split(
        &mut self,
        leaf: NodeId,
        new_window: WindowId,
    ) -> Result<(NodeId, NodeId), LayoutError> {
        let node = self.node_or_err(leaf)?;
        let existing = match node.kind {
            NodeKind::Split { .. } => return Err(LayoutError::NotALeaf(leaf)),
            NodeKind::Leaf { window: None } => return Err(LayoutError::EmptyLeaf(leaf)),
            NodeKind::Leaf { window: Some(w) } => w,
        };
        let rect = node.rect;
        if self.contains_window(new_window) {
            return Err(LayoutError::DuplicateWindow(new_window));
        }

        let orientation = Orientation::for_size(rect.size.width, rect.size.height);
        let (first_rect, second_rect) = split_rect(rect, orientation, self.split_ratio);
        for half in [first_rect, second_rect] {
            if half.is_degenerate() {
                return Err(LayoutError::DegenerateRect(half));
            }
        }

        let first = self.nodes.insert(Node {
            parent: Some(leaf),
            rect: first_rect,
            kind: NodeKind::Leaf { window: Some(existing) },
        });
        let second = self.nodes.insert(Node {
            parent: Some(leaf),
            rect: second_rect,
            kind: NodeKind::Leaf { window: Some(new_window) },
        });
        self.nodes[leaf].kind = NodeKind::Split {
            orientation,
            ratio: self.split_ratio,
            first,
            second,
        };
        debug!(?leaf, %orientation, %existing, %new_window, "Split leaf");
        Ok((first, second))
    }

    /// Removes `window` from the tree. Returns false if it was not there.
    pub fn remove(&mut self, window: WindowId) -> bool { self.remove_under(self.root, window) }

    /// Removes `window` from the subtree at `node`, collapsing every split on
    /// the way back up. Splits above `node` are not collapsed.
    pub fn remove_under(&mut self, node: NodeId, window: WindowId) -> bool {
        let Some(n) = self.nodes.get(node) else {
            return false;
        };
        match n.kind {
            NodeKind::Leaf { window: Some(held) } if held == window => {
                self.nodes[node].kind = NodeKind::Leaf { window: None };
                trace!(?node, %window, "Cleared leaf");
                true
            }
            NodeKind::Leaf { .. } => false,
            NodeKind::Split { first, second, .. } => {
                if self.remove_under(first, window) || self.remove_under(second, window) {
                    self.collapse_empty_branches(node);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Simplifies a split whose children include an empty leaf. With one
    /// empty side the other side is pulled up into `node`; with two empty
    /// sides `node` becomes a single empty leaf.
    pub fn collapse_empty_branches(&mut self, node: NodeId) {
        let Some(NodeKind::Split { first, second, .. }) = self.nodes.get(node).map(|n| n.kind)
        else {
            return;
        };

        match (self.is_empty_leaf(first), self.is_empty_leaf(second)) {
            (true, true) => {
                self.nodes.remove(first);
                self.nodes.remove(second);
                self.nodes[node].kind = NodeKind::Leaf { window: None };
                debug!(?node, "Collapsed split with two empty sides");
            }
            (true, false) => self.promote(node, second, first),
            (false, true) => self.promote(node, first, second),
            (false, false) => {}
        }
    }

    fn promote(&mut self, node: NodeId, keep: NodeId, discard: NodeId) {
        self.nodes.remove(discard);
        let Some(kept) = self.nodes.remove(keep) else {
            return;
        };
        if let NodeKind::Split { first, second, .. } = kept.kind {
            self.nodes[first].parent = Some(node);
            self.nodes[second].parent = Some(node);
        }
        self.nodes[node].kind = kept.kind;
        self.relayout(node);
        debug!(?node, "Collapsed split into its non-empty side");
    }

    /// Recomputes the rectangles of every descendant of `node` from its own
    /// rectangle and the stored split ratios.
    fn relayout(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let rect = self.nodes[id].rect;
            if let NodeKind::Split { orientation, ratio, first, second } = self.nodes[id].kind {
                let (first_rect, second_rect) = split_rect(rect, orientation, ratio);
                self.nodes[first].rect = first_rect;
                self.nodes[second].rect = second_rect;
                stack.push(first);
                stack.push(second);
            }
        }
    }

    pub fn find_node_for_window(&self, window: WindowId) -> Option<NodeId> {
        self.find_node_for_window_under(self.root, window)
    }

    pub fn find_node_for_window_under(&self, node: NodeId, window: WindowId) -> Option<NodeId> {
        match self.nodes.get(node)?.kind {
            NodeKind::Leaf { window: Some(held) } if held == window => Some(node),
            NodeKind::Leaf { .. } => None,
            NodeKind::Split { first, second, .. } => self
                .find_node_for_window_under(first, window)
                .or_else(|| self.find_node_for_window_under(second, window)),
        }
    }

    pub fn contains_window(&self, window: WindowId) -> bool {
        self.find_node_for_window(window).is_some()
    }

    /// The leaf adjacent to `node` across the nearest split boundary in
    /// `direction`, found by walking parent links.
    pub fn find_neighbor(&self, node: NodeId, direction: Direction) -> Option<NodeId> {
        self.nodes.get(node)?;
        let wanted = direction.orientation();
        let mut current = node;

        while let Some(parent) = self.parent(current) {
            if let NodeKind::Split { orientation, first, second, .. } = self.nodes[parent].kind {
                if orientation == wanted {
                    if direction.towards_first() && second == current {
                        return Some(self.descend(first, true));
                    }
                    if !direction.towards_first() && first == current {
                        return Some(self.descend(second, false));
                    }
                }
            }
            current = parent;
        }

        None
    }

    /// Like [`find_neighbor`](Self::find_neighbor), with the direction given
    /// as a token such as `"left"`. Unknown tokens find nothing.
    pub fn find_neighbor_by_name(&self, node: NodeId, token: &str) -> Option<NodeId> {
        match token.parse::<Direction>() {
            Ok(direction) => self.find_neighbor(node, direction),
            Err(_) => {
                debug!(token, "Unrecognised direction");
                None
            }
        }
    }

    fn descend(&self, mut node: NodeId, take_second: bool) -> NodeId {
        while let Some(NodeKind::Split { first, second, .. }) = self.nodes.get(node).map(|n| n.kind)
        {
            node = if take_second { second } else { first };
        }
        node
    }

    pub fn leftmost_leaf(&self, node: NodeId) -> NodeId { self.descend(node, false) }

    pub fn rightmost_leaf(&self, node: NodeId) -> NodeId { self.descend(node, true) }

    /// First children are on top in horizontal splits.
    pub fn topmost_leaf(&self, node: NodeId) -> NodeId { self.descend(node, false) }

    pub fn bottommost_leaf(&self, node: NodeId) -> NodeId { self.descend(node, true) }

    /// Calls `visit` on every leaf under `node`, empty or not, first child
    /// before second.
    pub fn traverse<F>(&self, node: NodeId, mut visit: F)
    where F: FnMut(NodeId, &Node) {
        self.traverse_inner(node, &mut visit);
    }

    fn traverse_inner<F>(&self, node: NodeId, visit: &mut F)
    where F: FnMut(NodeId, &Node) {
        let Some(n) = self.nodes.get(node) else {
            return;
        };
        match n.kind {
            NodeKind::Leaf { .. } => visit(node, n),
            NodeKind::Split { first, second, .. } => {
                self.traverse_inner(first, visit);
                self.traverse_inner(second, visit);
            }
        }
    }

    /// Windows in traversal order.
    pub fn windows(&self) -> Vec<WindowId> {
        let mut out = Vec::new();
        self.traverse(self.root, |_, leaf| out.extend(leaf.window()));
        out
    }

    pub fn leaves(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.traverse(self.root, |id, _| out.push(id));
        out
    }

    pub fn leaf_count(&self) -> usize {
        let mut count = 0;
        self.traverse(self.root, |_, _| count += 1);
        count
    }

    pub fn count_windows(&self, node: NodeId) -> usize {
        let mut count = 0;
        self.traverse(node, |_, leaf| {
            if leaf.window().is_some() {
                count += 1;
            }
        });
        count
    }

    pub fn len(&self) -> usize { self.count_windows(self.root) }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Exchanges the windows of two leaves. At least one must be occupied.
    pub fn swap_windows(&mut self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return false;
        }
        let (Some(NodeKind::Leaf { window: wa }), Some(NodeKind::Leaf { window: wb })) =
            (self.nodes.get(a).map(|n| n.kind), self.nodes.get(b).map(|n| n.kind))
        else {
            return false;
        };
        if wa.is_none() && wb.is_none() {
            return false;
        }
        self.nodes[a].kind = NodeKind::Leaf { window: wb };
        self.nodes[b].kind = NodeKind::Leaf { window: wa };
        true
    }

    /// Grows `node` inside its parent split by `delta` (shrinks it when
    /// negative). The ratio stays within [`MIN_RATIO`, `MAX_RATIO`].
    pub fn adjust_ratio(&mut self, node: NodeId, delta: f64) -> bool {
        let Some(parent) = self.parent(node) else {
            return false;
        };
        let NodeKind::Split { orientation, ratio, first, second } = self.nodes[parent].kind else {
            return false;
        };
        let signed = if node == first { delta } else { -delta };
        let new_ratio = (ratio + signed).clamp(MIN_RATIO, MAX_RATIO);
        if (new_ratio - ratio).abs() <= f64::EPSILON {
            return false;
        }
        self.nodes[parent].kind = NodeKind::Split {
            orientation,
            ratio: new_ratio,
            first,
            second,
        };
        self.relayout(parent);
        trace!(?parent, ratio = new_ratio, "Adjusted split ratio");
        true
    }

    /// Checks the structural invariants and returns a description of every
    /// violation found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        let Some(root) = self.nodes.get(self.root) else {
            issues.push("root node is missing".to_string());
            return issues;
        };
        if root.parent.is_some() {
            issues.push("root node has a parent".to_string());
        }

        let mut seen = HashSet::default();
        let mut reachable = 0;
        let mut leaves = 0;
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                issues.push(format!("split refers to missing node {id:?}"));
                continue;
            };
            reachable += 1;
            match node.kind {
                NodeKind::Leaf { window } => {
                    leaves += 1;
                    if node.rect.is_degenerate() {
                        issues.push(format!("leaf {id:?} has degenerate rect {}", node.rect));
                    }
                    if let Some(w) = window {
                        if !seen.insert(w) {
                            issues.push(format!("window {w} appears in more than one leaf"));
                        }
                    }
                }
                NodeKind::Split { orientation, ratio, first, second } => {
                    if !(ratio > 0.0 && ratio < 1.0) {
                        issues.push(format!("split {id:?} has ratio {ratio}"));
                    }
                    for child in [first, second] {
                        if let Some(c) = self.nodes.get(child) {
                            if c.parent != Some(id) {
                                issues.push(format!(
                                    "child {child:?} of {id:?} points at parent {:?}",
                                    c.parent
                                ));
                            }
                        }
                    }
                    if let (Some(a), Some(b)) = (self.nodes.get(first), self.nodes.get(second)) {
                        if !tiles(node.rect, orientation, a.rect, b.rect) {
                            issues.push(format!(
                                "children {} and {} of split {id:?} do not tile {} along {orientation}",
                                a.rect, b.rect, node.rect
                            ));
                        }
                    }
                    stack.push(second);
                    stack.push(first);
                }
            }
        }

        if reachable != self.nodes.len() {
            issues.push(format!(
                "{} nodes are not reachable from the root",
                self.nodes.len() - reachable
            ));
        }
        if seen.is_empty() && leaves != 1 {
            issues.push(format!("tree without windows has {leaves} leaves"));
        }

        issues
    }

    pub fn draw_tree(&self) -> String {
        fn build(tree: &BspTree, id: NodeId) -> AsciiTree {
            let Some(node) = tree.nodes.get(id) else {
                return AsciiTree::Leaf(vec![format!("<missing {id:?}>")]);
            };
            match node.kind {
                NodeKind::Leaf { window: Some(w) } => {
                    AsciiTree::Leaf(vec![format!("window {w} {}", node.rect)])
                }
                NodeKind::Leaf { window: None } => {
                    AsciiTree::Leaf(vec![format!("empty {}", node.rect)])
                }
                NodeKind::Split { orientation, ratio, first, second } => AsciiTree::Node(
                    format!("{orientation} {ratio:.2} {}", node.rect),
                    vec![build(tree, first), build(tree, second)],
                ),
            }
        }

        let mut out = String::new();
        let _ = ascii_tree::write_tree(&mut out, &build(self, self.root));
        out
    }
}

fn close(a: f64, b: f64) -> bool { (a - b).abs() <= EPSILON * a.abs().max(b.abs()).max(1.0) }

fn tiles(parent: Rect, orientation: Orientation, a: Rect, b: Rect) -> bool {
    match orientation {
        Orientation::Vertical => {
            close(a.min_x(), parent.min_x())
                && close(a.max_x(), b.min_x())
                && close(b.max_x(), parent.max_x())
                && close(a.min_y(), parent.min_y())
                && close(b.min_y(), parent.min_y())
                && close(a.max_y(), parent.max_y())
                && close(b.max_y(), parent.max_y())
        }
        Orientation::Horizontal => {
            close(a.min_y(), parent.min_y())
                && close(a.max_y(), b.min_y())
                && close(b.max_y(), parent.max_y())
                && close(a.min_x(), parent.min_x())
                && close(b.min_x(), parent.min_x())
                && close(a.max_x(), parent.max_x())
                && close(b.max_x(), parent.max_x())
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;
    use test_log::test;

    use super::*;

    fn w(idx: u32) -> WindowId { WindowId::new(idx) }

    fn screen() -> Rect { Rect::from_xywh(0.0, 0.0, 800.0, 600.0) }

    fn tree_with(n: u32) -> BspTree {
        let mut tree = BspTree::new(screen());
        for i in 1..=n {
            tree.insert(w(i)).unwrap();
        }
        tree
    }

    fn leaf_of(tree: &BspTree, window: WindowId) -> NodeId {
        tree.find_node_for_window(window).unwrap()
    }

    fn rect_of(tree: &BspTree, window: WindowId) -> Rect {
        tree.node(leaf_of(tree, window)).unwrap().rect()
    }

    fn assert_valid(tree: &BspTree) {
        let issues = tree.validate();
        assert!(issues.is_empty(), "{issues:?}\n{}", tree.draw_tree());
    }

    #[test]
    fn new_tree_is_a_single_empty_leaf() {
        let tree = BspTree::new(screen());
        let root = tree.node(tree.root()).unwrap();
        assert!(root.is_empty_leaf());
        assert_eq!(root.parent(), None);
        assert_eq!(tree.rect(), screen());
        assert!(tree.is_empty());
        assert_valid(&tree);
    }

    #[test]
    fn two_windows_then_remove_first() {
        let mut tree = BspTree::new(screen());

        let leaf = tree.insert(w(1)).unwrap();
        assert_eq!(leaf, tree.root());
        assert_eq!(tree.node(leaf).unwrap().window(), Some(w(1)));
        assert_eq!(tree.rect(), screen());

        tree.insert(w(2)).unwrap();
        let root = tree.node(tree.root()).unwrap();
        let NodeKind::Split { orientation, first, second, .. } = *root.kind() else {
            panic!("root should be a split");
        };
        assert_eq!(orientation, Orientation::Vertical);
        assert_eq!(tree.node(first).unwrap().window(), Some(w(1)));
        assert_eq!(tree.node(first).unwrap().rect(), Rect::from_xywh(0.0, 0.0, 400.0, 600.0));
        assert_eq!(tree.node(second).unwrap().window(), Some(w(2)));
        assert_eq!(tree.node(second).unwrap().rect(), Rect::from_xywh(400.0, 0.0, 400.0, 600.0));
        assert_eq!(tree.node(first).unwrap().parent(), Some(tree.root()));
        assert_valid(&tree);

        assert!(tree.remove(w(1)));
        let root = tree.node(tree.root()).unwrap();
        assert!(root.is_leaf());
        assert_eq!(root.window(), Some(w(2)));
        assert_eq!(root.rect(), screen());
        assert_eq!(tree.leaves().len(), 1);
        assert_valid(&tree);
    }

    #[test]
    fn split_orientation_follows_aspect_ratio() {
        let cases = [
            (Rect::from_xywh(0.0, 0.0, 200.0, 100.0), Orientation::Vertical, [
                Rect::from_xywh(0.0, 0.0, 100.0, 100.0),
                Rect::from_xywh(100.0, 0.0, 100.0, 100.0),
            ]),
            (Rect::from_xywh(0.0, 0.0, 100.0, 200.0), Orientation::Horizontal, [
                Rect::from_xywh(0.0, 0.0, 100.0, 100.0),
                Rect::from_xywh(0.0, 100.0, 100.0, 100.0),
            ]),
            (Rect::from_xywh(0.0, 0.0, 100.0, 100.0), Orientation::Horizontal, [
                Rect::from_xywh(0.0, 0.0, 100.0, 50.0),
                Rect::from_xywh(0.0, 50.0, 100.0, 50.0),
            ]),
        ];

        for (rect, expected, [first_rect, second_rect]) in cases {
            let mut tree = BspTree::new(rect);
            let leaf = tree.insert(w(1)).unwrap();
            let (first, second) = tree.split(leaf, w(2)).unwrap();
            let NodeKind::Split { orientation, .. } = *tree.node(leaf).unwrap().kind() else {
                panic!("leaf should have become a split");
            };
            assert_eq!(orientation, expected, "splitting {rect}");
            assert_eq!(tree.node(first).unwrap().rect(), first_rect);
            assert_eq!(tree.node(second).unwrap().rect(), second_rect);
            assert_eq!(tree.node(first).unwrap().window(), Some(w(1)));
            assert_eq!(tree.node(second).unwrap().window(), Some(w(2)));
        }
    }

    #[test]
    fn split_rejects_bad_targets_without_mutating() {
        let mut tree = BspTree::new(screen());
        let root = tree.root();
        assert_eq!(tree.split(root, w(1)), Err(LayoutError::EmptyLeaf(root)));

        tree.insert(w(1)).unwrap();
        tree.insert(w(2)).unwrap();
        assert_eq!(tree.split(root, w(3)), Err(LayoutError::NotALeaf(root)));

        let leaf = leaf_of(&tree, w(1));
        assert_eq!(tree.split(leaf, w(2)), Err(LayoutError::DuplicateWindow(w(2))));
        assert_eq!(tree.windows(), vec![w(1), w(2)]);
        assert_valid(&tree);
    }

    #[test]
    fn split_of_degenerate_half_is_refused() {
        let tiny = f64::from_bits(1);
        let mut tree = BspTree::new(Rect::from_xywh(0.0, 0.0, tiny, tiny));
        tree.insert(w(1)).unwrap();
        assert!(matches!(tree.insert(w(2)), Err(LayoutError::DegenerateRect(_))));
        assert_eq!(tree.windows(), vec![w(1)]);
        assert!(tree.node(tree.root()).unwrap().is_leaf());
    }

    #[test]
    fn duplicate_insert_is_refused() {
        let mut tree = tree_with(3);
        assert_eq!(tree.insert(w(2)), Err(LayoutError::DuplicateWindow(w(2))));
        assert_eq!(tree.len(), 3);
        assert_valid(&tree);
    }

    #[test]
    fn first_child_policy_keeps_subdividing_the_first_leaf() {
        let tree = tree_with(3);
        // w1 and w3 share the left half, stacked.
        assert_eq!(rect_of(&tree, w(1)), Rect::from_xywh(0.0, 0.0, 400.0, 300.0));
        assert_eq!(rect_of(&tree, w(3)), Rect::from_xywh(0.0, 300.0, 400.0, 300.0));
        assert_eq!(rect_of(&tree, w(2)), Rect::from_xywh(400.0, 0.0, 400.0, 600.0));
        assert_eq!(tree.windows(), vec![w(1), w(3), w(2)]);
    }

    #[test]
    fn fewest_windows_policy_balances() {
        let mut tree =
            BspTree::with_settings(screen(), 0.5, InsertionPolicy::FewestWindows).unwrap();
        for i in 1..=4 {
            tree.insert(w(i)).unwrap();
        }
        for i in 1..=4 {
            let r = rect_of(&tree, w(i));
            assert_eq!(r.area(), 800.0 * 600.0 / 4.0, "window {i} has {r}");
        }
        assert_valid(&tree);
    }

    #[test]
    fn invalid_ratio_is_rejected() {
        assert_eq!(
            BspTree::with_settings(screen(), 1.0, InsertionPolicy::FirstChild).unwrap_err(),
            LayoutError::InvalidRatio(1.0)
        );
        let mut tree = BspTree::new(screen());
        assert!(tree.set_split_ratio(0.0).is_err());
        assert!(tree.set_split_ratio(f64::NAN).is_err());
        assert_eq!(tree.split_ratio(), DEFAULT_RATIO);
    }

    #[test]
    fn configured_ratio_applies_to_new_splits() {
        let mut tree = BspTree::with_settings(screen(), 0.25, InsertionPolicy::FirstChild).unwrap();
        tree.insert(w(1)).unwrap();
        tree.insert(w(2)).unwrap();
        assert_eq!(rect_of(&tree, w(1)), Rect::from_xywh(0.0, 0.0, 200.0, 600.0));
        assert_eq!(rect_of(&tree, w(2)), Rect::from_xywh(200.0, 0.0, 600.0, 600.0));
    }

    #[test]
    fn remove_missing_window_is_a_no_op() {
        let mut tree = tree_with(2);
        let before = tree.draw_tree();
        assert!(!tree.remove(w(9)));
        assert_eq!(tree.draw_tree(), before);
    }

    #[test]
    fn removing_everything_returns_to_single_empty_leaf() {
        for order in [[1, 2, 3, 4, 5], [5, 4, 3, 2, 1], [3, 1, 5, 2, 4]] {
            let mut tree = tree_with(5);
            for i in order {
                assert!(tree.remove(w(i)));
                assert_valid(&tree);
            }
            let root = tree.node(tree.root()).unwrap();
            assert!(root.is_empty_leaf());
            assert_eq!(root.rect(), screen());
            assert_eq!(tree.leaves().len(), 1);
        }
    }

    #[test]
    fn collapse_promotes_a_subtree_and_resizes_it() {
        // root: V[ H[w1, w3], w2 ]
        let mut tree = tree_with(3);
        assert!(tree.remove(w(2)));
        // H[w1, w3] now spans the whole screen.
        assert_eq!(rect_of(&tree, w(1)), Rect::from_xywh(0.0, 0.0, 800.0, 300.0));
        assert_eq!(rect_of(&tree, w(3)), Rect::from_xywh(0.0, 300.0, 800.0, 300.0));
        for leaf in tree.leaves() {
            assert_eq!(tree.parent(leaf), Some(tree.root()));
        }
        assert_valid(&tree);
    }

    #[test]
    fn collapse_with_both_sides_empty_yields_empty_leaf() {
        let mut tree = tree_with(2);
        let a = leaf_of(&tree, w(1));
        let b = leaf_of(&tree, w(2));
        // Removing straight from the leaves skips the collapse of the root.
        assert!(tree.remove_under(a, w(1)));
        assert!(tree.remove_under(b, w(2)));
        assert!(!tree.node(tree.root()).unwrap().is_leaf());

        tree.collapse_empty_branches(tree.root());
        let root = tree.node(tree.root()).unwrap();
        assert!(root.is_empty_leaf());
        assert_eq!(root.rect(), screen());
        assert!(tree.node(a).is_none());
        assert!(tree.node(b).is_none());
        assert_valid(&tree);
    }

    #[test]
    fn emptying_a_subtree_leaves_one_empty_leaf() {
        let mut tree = tree_with(3);
        let split = tree.parent(leaf_of(&tree, w(1))).unwrap();
        assert!(tree.remove_under(split, w(1)));
        assert!(tree.remove_under(split, w(3)));
        assert!(tree.node(split).unwrap().is_empty_leaf());

        tree.collapse_empty_branches(tree.root());
        assert_eq!(tree.node(tree.root()).unwrap().window(), Some(w(2)));
        assert_valid(&tree);
    }

    #[test]
    fn lookup_finds_unique_leaf() {
        let tree = tree_with(4);
        for i in 1..=4 {
            let leaf = leaf_of(&tree, w(i));
            assert_eq!(tree.node(leaf).unwrap().window(), Some(w(i)));
        }
        assert_eq!(tree.find_node_for_window(w(5)), None);
        let split = tree.parent(leaf_of(&tree, w(1))).unwrap();
        assert_eq!(tree.find_node_for_window_under(split, w(2)), None);
    }

    #[test]
    fn neighbors_in_four_window_tree() {
        // V[ H[ V[w1, w4], w3 ], w2 ]
        let tree = tree_with(4);
        let n = |win: u32, d: Direction| {
            tree.find_neighbor(leaf_of(&tree, w(win)), d)
                .and_then(|leaf| tree.node(leaf).unwrap().window())
        };

        assert_eq!(n(1, Direction::Right), Some(w(4)));
        assert_eq!(n(4, Direction::Left), Some(w(1)));
        assert_eq!(n(1, Direction::Down), Some(w(3)));
        assert_eq!(n(3, Direction::Up), Some(w(4)));
        assert_eq!(n(4, Direction::Right), Some(w(2)));
        assert_eq!(n(3, Direction::Right), Some(w(2)));
        assert_eq!(n(2, Direction::Left), Some(w(3)));
        assert_eq!(n(1, Direction::Left), None);
        assert_eq!(n(1, Direction::Up), None);
        assert_eq!(n(2, Direction::Right), None);
        assert_eq!(n(2, Direction::Down), None);
    }

    #[test]
    fn sibling_neighbors_are_symmetric() {
        let tree = tree_with(6);
        for leaf in tree.leaves() {
            for d in Direction::iter() {
                let Some(other) = tree.find_neighbor(leaf, d) else { continue };
                if tree.parent(other) == tree.parent(leaf) {
                    assert_eq!(tree.find_neighbor(other, d.opposite()), Some(leaf));
                }
            }
        }
    }

    #[test]
    fn neighbor_by_name() {
        let tree = tree_with(2);
        let first = leaf_of(&tree, w(1));
        let second = leaf_of(&tree, w(2));
        assert_eq!(tree.find_neighbor_by_name(first, "right"), Some(second));
        assert_eq!(tree.find_neighbor_by_name(first, "diagonal"), None);
        assert_eq!(tree.find_neighbor_by_name(first, ""), None);
    }

    #[test]
    fn extreme_leaves() {
        let tree = tree_with(4);
        let root = tree.root();
        assert_eq!(tree.leftmost_leaf(root), leaf_of(&tree, w(1)));
        assert_eq!(tree.topmost_leaf(root), leaf_of(&tree, w(1)));
        assert_eq!(tree.rightmost_leaf(root), leaf_of(&tree, w(2)));
        assert_eq!(tree.bottommost_leaf(root), leaf_of(&tree, w(2)));
    }

    #[test]
    fn traversal_visits_each_leaf_once_in_order() {
        let tree = tree_with(4);
        let mut seen = Vec::new();
        tree.traverse(tree.root(), |id, leaf| {
            assert!(leaf.is_leaf());
            seen.push(id);
        });
        assert_eq!(seen, tree.leaves());
        assert_eq!(seen.len(), 4);
        assert_eq!(tree.leaf_count(), 4);
        assert_eq!(tree.windows(), vec![w(1), w(4), w(3), w(2)]);

        let mut tree = tree_with(2);
        let gone = leaf_of(&tree, w(1));
        tree.remove(w(1));
        let mut visits = 0;
        tree.traverse(gone, |_, _| visits += 1);
        assert_eq!(visits, 0);
        assert_eq!(tree.leaf_count(), 1);
    }

    #[test]
    fn swap_exchanges_windows_only() {
        let mut tree = tree_with(2);
        let a = leaf_of(&tree, w(1));
        let b = leaf_of(&tree, w(2));
        let (ra, rb) = (tree.node(a).unwrap().rect(), tree.node(b).unwrap().rect());
        assert!(tree.swap_windows(a, b));
        assert_eq!(rect_of(&tree, w(1)), rb);
        assert_eq!(rect_of(&tree, w(2)), ra);
        assert!(!tree.swap_windows(a, a));
        assert!(!tree.swap_windows(a, tree.root()));
        assert_valid(&tree);
    }

    #[test]
    fn adjust_ratio_grows_and_clamps() {
        let mut tree = tree_with(3);
        let w2 = leaf_of(&tree, w(2));
        assert!(tree.adjust_ratio(w2, 0.1));
        assert!(rect_of(&tree, w(2)).approx_eq(&Rect::from_xywh(320.0, 0.0, 480.0, 600.0)));
        // The stacked pair on the left follows the new width.
        assert!((rect_of(&tree, w(1)).size.width - 320.0).abs() < 1e-9);
        assert!((rect_of(&tree, w(3)).size.width - 320.0).abs() < 1e-9);
        assert_valid(&tree);

        for _ in 0..20 {
            tree.adjust_ratio(w2, 0.1);
        }
        let NodeKind::Split { ratio, .. } = *tree.node(tree.root()).unwrap().kind() else {
            panic!("root should be a split");
        };
        assert!((ratio - MIN_RATIO).abs() < 1e-9);
        assert!(!tree.adjust_ratio(w2, 0.1));
        assert!(!tree.adjust_ratio(tree.root(), 0.1));
    }

    #[test]
    fn validate_reports_broken_parent_links() {
        let mut tree = tree_with(2);
        let leaf = leaf_of(&tree, w(1));
        tree.nodes[leaf].parent = None;
        assert!(tree.validate().iter().any(|i| i.contains("points at parent")));
    }

    #[test]
    fn draw_tree_mentions_every_window() {
        let tree = tree_with(3);
        let drawing = tree.draw_tree();
        for i in 1..=3 {
            assert!(drawing.contains(&format!("window {i} ")), "{drawing}");
        }
        assert!(drawing.contains("vertical"));
    }

    #[test]
    fn tree_survives_ron_round_trip() {
        let tree = tree_with(4);
        let text = ron::to_string(&tree).unwrap();
        let restored: BspTree = ron::from_str(&text).unwrap();
        assert_eq!(restored.windows(), tree.windows());
        assert_eq!(restored.draw_tree(), tree.draw_tree());
        assert_valid(&restored);
    }
}
