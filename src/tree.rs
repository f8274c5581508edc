//! Tidy tree placement for the hierarchy nodes.
//!
//! Breadth offsets come from the Buchheim/Jünger/Leipert refinement of Walker's
//! algorithm: subtrees are packed against their left neighbours by walking the
//! facing contours, and the slack between them is spread evenly over the
//! intermediate siblings. The result only depends on the node order of the
//! input, so the same hierarchy always lands on the same coordinates.

use std::collections::{HashMap, HashSet};

use eframe::egui::{Vec2, vec2};

use crate::config::{TreeLayoutConfig, TreeOrientation};
use crate::data::{HierarchyTree, NodeId};
use crate::error::{GraphError, HierarchyDefect, Result};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreePlacement {
    pub position: Vec2,
    pub depth: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TreeLayout {
    root: Option<NodeId>,
    placements: HashMap<NodeId, TreePlacement>,
    /// Pre-order, siblings in input order.
    order: Vec<NodeId>,
    /// Parent to child pairs in pre-order.
    links: Vec<(NodeId, NodeId)>,
}

impl TreeLayout {
    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn placement(&self, id: &str) -> Option<TreePlacement> {
        self.placements.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.placements.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn links(&self) -> &[(NodeId, NodeId)] {
        &self.links
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, TreePlacement)> + '_ {
        self.order.iter().filter_map(|id| {
            self.placements
                .get(id)
                .map(|placement| (id.as_str(), *placement))
        })
    }
}

/// Arena node for the contour walk. Index 0 is a sentinel parent of the root.
#[derive(Clone, Debug)]
struct TidyNode {
    parent: usize,
    children: Vec<usize>,
    depth: usize,
    /// Position among siblings.
    number: usize,
    ancestor: usize,
    default_ancestor: Option<usize>,
    prelim: f32,
    modifier: f32,
    change: f32,
    shift: f32,
    thread: Option<usize>,
}

impl TidyNode {
    fn new(index: usize, parent: usize, depth: usize, number: usize) -> Self {
        Self {
            parent,
            children: Vec::new(),
            depth,
            number,
            ancestor: index,
            default_ancestor: None,
            prelim: 0.0,
            modifier: 0.0,
            change: 0.0,
            shift: 0.0,
            thread: None,
        }
    }
}

struct TidyTree<'a> {
    config: &'a TreeLayoutConfig,
    nodes: Vec<TidyNode>,
}

impl TidyTree<'_> {
    fn separation(&self, a: usize, b: usize) -> f32 {
        if self.nodes[a].parent == self.nodes[b].parent {
            self.config.sibling_separation
        } else {
            self.config.non_sibling_separation
        }
    }

    fn next_left(&self, v: usize) -> Option<usize> {
        self.nodes[v]
            .children
            .first()
            .copied()
            .or(self.nodes[v].thread)
    }

    fn next_right(&self, v: usize) -> Option<usize> {
        self.nodes[v]
            .children
            .last()
            .copied()
            .or(self.nodes[v].thread)
    }

    fn left_sibling(&self, v: usize) -> Option<usize> {
        let number = self.nodes[v].number;
        if number == 0 {
            return None;
        }
        let parent = self.nodes[v].parent;
        self.nodes[parent].children.get(number - 1).copied()
    }

    fn move_subtree(&mut self, left: usize, right: usize, shift: f32) {
        let subtrees = (self.nodes[right].number as f32 - self.nodes[left].number as f32).max(1.0);
        let change = shift / subtrees;
        self.nodes[right].change -= change;
        self.nodes[right].shift += shift;
        self.nodes[left].change += change;
        self.nodes[right].prelim += shift;
        self.nodes[right].modifier += shift;
    }

    fn execute_shifts(&mut self, v: usize) {
        let mut shift = 0.0;
        let mut change = 0.0;
        for index in (0..self.nodes[v].children.len()).rev() {
            let child = self.nodes[v].children[index];
            self.nodes[child].prelim += shift;
            self.nodes[child].modifier += shift;
            change += self.nodes[child].change;
            shift += self.nodes[child].shift + change;
        }
    }

    fn next_ancestor(&self, inner_left: usize, v: usize, default_ancestor: usize) -> usize {
        let candidate = self.nodes[inner_left].ancestor;
        if self.nodes[candidate].parent == self.nodes[v].parent {
            candidate
        } else {
            default_ancestor
        }
    }

    fn apportion(
        &mut self,
        v: usize,
        left_sibling: Option<usize>,
        default_ancestor: usize,
    ) -> usize {
        let Some(left_sibling) = left_sibling else {
            return default_ancestor;
        };
        let mut default_ancestor = default_ancestor;

        let parent = self.nodes[v].parent;
        let mut inner_right = v;
        let mut outer_right = v;
        let mut inner_left = left_sibling;
        let mut outer_left = self.nodes[parent].children[0];

        let mut sum_inner_right = self.nodes[inner_right].modifier;
        let mut sum_outer_right = self.nodes[outer_right].modifier;
        let mut sum_inner_left = self.nodes[inner_left].modifier;
        let mut sum_outer_left = self.nodes[outer_left].modifier;

        let mut next_inner_left = self.next_right(inner_left);
        let mut next_inner_right = self.next_left(inner_right);

        while let (Some(il), Some(ir)) = (next_inner_left, next_inner_right) {
            inner_left = il;
            inner_right = ir;
            if let Some(next) = self.next_left(outer_left) {
                outer_left = next;
            }
            if let Some(next) = self.next_right(outer_right) {
                outer_right = next;
            }
            self.nodes[outer_right].ancestor = v;

            let shift = (self.nodes[inner_left].prelim + sum_inner_left)
                - (self.nodes[inner_right].prelim + sum_inner_right)
                + self.separation(inner_left, inner_right);
            if shift > 0.0 {
                let ancestor = self.next_ancestor(inner_left, v, default_ancestor);
                self.move_subtree(ancestor, v, shift);
                sum_inner_right += shift;
                sum_outer_right += shift;
            }

            sum_inner_left += self.nodes[inner_left].modifier;
            sum_inner_right += self.nodes[inner_right].modifier;
            sum_outer_left += self.nodes[outer_left].modifier;
            sum_outer_right += self.nodes[outer_right].modifier;

            next_inner_left = self.next_right(inner_left);
            next_inner_right = self.next_left(inner_right);
        }

        if next_inner_left.is_some() && self.next_right(outer_right).is_none() {
            self.nodes[outer_right].thread = next_inner_left;
            self.nodes[outer_right].modifier += sum_inner_left - sum_outer_right;
        }

        if next_inner_right.is_some() && self.next_left(outer_left).is_none() {
            self.nodes[outer_left].thread = next_inner_right;
            self.nodes[outer_left].modifier += sum_inner_right - sum_outer_left;
            default_ancestor = v;
        }

        default_ancestor
    }

    fn first_walk(&mut self, v: usize) {
        let left_sibling = self.left_sibling(v);

        if self.nodes[v].children.is_empty() {
            if let Some(w) = left_sibling {
                self.nodes[v].prelim = self.nodes[w].prelim + self.separation(v, w);
            }
        } else {
            self.execute_shifts(v);
            let children = &self.nodes[v].children;
            let midpoint = (self.nodes[children[0]].prelim
                + self.nodes[children[children.len() - 1]].prelim)
                / 2.0;
            if let Some(w) = left_sibling {
                self.nodes[v].prelim = self.nodes[w].prelim + self.separation(v, w);
                self.nodes[v].modifier = self.nodes[v].prelim - midpoint;
            } else {
                self.nodes[v].prelim = midpoint;
            }
        }

        let parent = self.nodes[v].parent;
        let default_ancestor = self.nodes[parent]
            .default_ancestor
            .unwrap_or(self.nodes[parent].children[0]);
        let default_ancestor = self.apportion(v, left_sibling, default_ancestor);
        self.nodes[parent].default_ancestor = Some(default_ancestor);
    }

    /// Children are visited left to right, each subtree before its parent.
    fn post_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![1usize];
        while let Some(v) = stack.pop() {
            order.push(v);
            stack.extend(self.nodes[v].children.iter().copied());
        }
        order.reverse();
        order
    }

    fn pre_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![1usize];
        while let Some(v) = stack.pop() {
            order.push(v);
            stack.extend(self.nodes[v].children.iter().rev().copied());
        }
        order
    }

    /// Breadth offsets in separation units, root at zero, indexed like `nodes`.
    fn breadths(&mut self) -> Vec<f32> {
        for v in self.post_order() {
            self.first_walk(v);
        }

        self.nodes[0].modifier = -self.nodes[1].prelim;
        let mut breadth = vec![0.0; self.nodes.len()];
        for v in self.pre_order() {
            let parent_modifier = self.nodes[self.nodes[v].parent].modifier;
            breadth[v] = self.nodes[v].prelim + parent_modifier;
            self.nodes[v].modifier += parent_modifier;
        }
        breadth
    }
}

fn malformed(defect: HierarchyDefect) -> GraphError {
    GraphError::MalformedHierarchy(defect)
}

/// Checks the tree invariants and returns the root index plus child lists in input order.
fn index_hierarchy(tree: &HierarchyTree) -> Result<(usize, Vec<Vec<usize>>)> {
    let nodes = tree.nodes();
    let mut index_by_id = HashMap::with_capacity(nodes.len());
    for (index, node) in nodes.iter().enumerate() {
        if index_by_id.insert(node.id.as_str(), index).is_some() {
            return Err(malformed(HierarchyDefect::DuplicateNode(node.id.clone())));
        }
    }

    let mut roots = Vec::new();
    let mut children = vec![Vec::new(); nodes.len()];
    for (index, node) in nodes.iter().enumerate() {
        match node.parent_id.as_deref() {
            None => roots.push(index),
            Some(parent_id) => {
                let Some(&parent) = index_by_id.get(parent_id) else {
                    return Err(malformed(HierarchyDefect::UnknownParent {
                        node_id: node.id.clone(),
                        parent_id: parent_id.to_owned(),
                    }));
                };
                children[parent].push(index);
            }
        }
    }

    let root = match roots.as_slice() {
        [] => return Err(malformed(HierarchyDefect::MissingRoot)),
        [root] => *root,
        _ => {
            return Err(malformed(HierarchyDefect::MultipleRoots(
                roots.iter().map(|&index| nodes[index].id.clone()).collect(),
            )));
        }
    };

    let mut reached = HashSet::with_capacity(nodes.len());
    let mut stack = vec![root];
    while let Some(index) = stack.pop() {
        if reached.insert(index) {
            stack.extend(children[index].iter().copied());
        }
    }

    if reached.len() != nodes.len() {
        let members = nodes
            .iter()
            .enumerate()
            .filter(|(index, _)| !reached.contains(index))
            .map(|(_, node)| node.id.clone())
            .collect();
        return Err(malformed(HierarchyDefect::Cycle(members)));
    }

    Ok((root, children))
}

/// Lays out the hierarchy. Fails with `MalformedHierarchy` instead of guessing at a broken tree.
pub fn layout_tree(tree: &HierarchyTree, config: &TreeLayoutConfig) -> Result<TreeLayout> {
    let (root, children) = index_hierarchy(tree)?;
    let nodes = tree.nodes();

    // Slots are handed out in pre-order: 0 is the sentinel, 1 the root.
    let mut arena = vec![TidyNode::new(0, 0, 0, 0)];
    let mut input_index = vec![root];
    let mut stack = vec![(root, 0usize, 0usize, 0usize)];
    while let Some((index, parent, depth, number)) = stack.pop() {
        let slot = arena.len();
        arena.push(TidyNode::new(slot, parent, depth, number));
        arena[parent].children.push(slot);
        input_index.push(index);
        stack.extend(
            children[index]
                .iter()
                .enumerate()
                .rev()
                .map(|(number, &child)| (child, slot, depth + 1, number)),
        );
    }

    let mut tidy = TidyTree {
        config,
        nodes: arena,
    };
    let breadths = tidy.breadths();

    let mut layout = TreeLayout {
        root: Some(nodes[root].id.clone()),
        placements: HashMap::with_capacity(nodes.len()),
        order: Vec::with_capacity(nodes.len()),
        links: Vec::with_capacity(nodes.len().saturating_sub(1)),
    };

    for slot in 1..tidy.nodes.len() {
        let node = &nodes[input_index[slot]];
        let depth = tidy.nodes[slot].depth;
        let breadth = breadths[slot] * config.breadth_spacing;
        let along = depth as f32 * config.depth_spacing;
        let position = match config.orientation {
            TreeOrientation::Horizontal => vec2(along, breadth),
            TreeOrientation::Vertical => vec2(breadth, along),
        };

        layout
            .placements
            .insert(node.id.clone(), TreePlacement { position, depth });
        layout.order.push(node.id.clone());

        let parent = tidy.nodes[slot].parent;
        if parent != 0 {
            let parent_id = nodes[input_index[parent]].id.clone();
            layout.links.push((parent_id, node.id.clone()));
        }
    }

    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GraphNode;

    fn hierarchy(edges: &[(&str, Option<&str>)]) -> HierarchyTree {
        HierarchyTree::new(
            edges
                .iter()
                .map(|(id, parent)| GraphNode::hierarchy(*id, *id, *parent))
                .collect(),
        )
    }

    fn layout(tree: &HierarchyTree) -> TreeLayout {
        layout_tree(tree, &TreeLayoutConfig::default()).unwrap()
    }

    #[test]
    fn root_with_two_children_matches_node_size() {
        let tree = hierarchy(&[("R", None), ("A", Some("R")), ("B", Some("R"))]);
        let layout = layout(&tree);

        assert_eq!(layout.root(), Some("R"));
        assert_eq!(layout.placement("R").unwrap().position, vec2(0.0, 0.0));
        assert_eq!(layout.placement("A").unwrap().position, vec2(100.0, -12.5));
        assert_eq!(layout.placement("B").unwrap().position, vec2(100.0, 12.5));
        assert_eq!(layout.placement("B").unwrap().depth, 1);
        assert_eq!(
            layout.links(),
            [
                ("R".to_owned(), "A".to_owned()),
                ("R".to_owned(), "B".to_owned())
            ]
        );
    }

    #[test]
    fn vertical_orientation_swaps_axes() {
        let tree = hierarchy(&[("R", None), ("A", Some("R")), ("B", Some("R"))]);
        let config = TreeLayoutConfig {
            orientation: TreeOrientation::Vertical,
            ..Default::default()
        };
        let layout = layout_tree(&tree, &config).unwrap();
        assert_eq!(layout.placement("A").unwrap().position, vec2(-12.5, 100.0));
    }

    #[test]
    fn cousins_get_wider_separation_than_siblings() {
        let tree = hierarchy(&[
            ("R", None),
            ("A", Some("R")),
            ("B", Some("R")),
            ("A1", Some("A")),
            ("B1", Some("B")),
        ]);
        let layout = layout(&tree);

        let a1 = layout.placement("A1").unwrap().position;
        let b1 = layout.placement("B1").unwrap().position;
        let a = layout.placement("A").unwrap().position;
        let b = layout.placement("B").unwrap().position;
        assert_eq!(b1.y - a1.y, 50.0);
        assert_eq!(b.y - a.y, 50.0);
        assert_eq!(a1.x, 200.0);
    }

    #[test]
    fn parents_sit_centered_over_their_children() {
        let tree = hierarchy(&[
            ("R", None),
            ("A", Some("R")),
            ("A1", Some("A")),
            ("A2", Some("A")),
            ("A3", Some("A")),
            ("B", Some("R")),
        ]);
        let layout = layout(&tree);

        let a = layout.placement("A").unwrap().position;
        let a1 = layout.placement("A1").unwrap().position;
        let a3 = layout.placement("A3").unwrap().position;
        assert!((a.y - (a1.y + a3.y) / 2.0).abs() < 1e-4);
        assert_eq!(layout.placement("R").unwrap().position.y, 0.0);
    }

    #[test]
    fn subtrees_at_the_same_depth_never_overlap() {
        let tree = hierarchy(&[
            ("R", None),
            ("A", Some("R")),
            ("A1", Some("A")),
            ("A2", Some("A")),
            ("A21", Some("A2")),
            ("A22", Some("A2")),
            ("B", Some("R")),
            ("C", Some("R")),
            ("C1", Some("C")),
            ("C11", Some("C1")),
            ("C12", Some("C1")),
        ]);
        let layout = layout(&tree);

        let mut by_depth: HashMap<usize, Vec<f32>> = HashMap::new();
        for (_, placement) in layout.iter() {
            by_depth
                .entry(placement.depth)
                .or_default()
                .push(placement.position.y);
        }
        for row in by_depth.values_mut() {
            row.sort_by(f32::total_cmp);
            for pair in row.windows(2) {
                assert!(pair[1] - pair[0] >= 25.0 - 1e-3, "row overlaps: {row:?}");
            }
        }
    }

    #[test]
    fn identical_input_yields_identical_layout() {
        let edges = [
            ("R", None),
            ("A", Some("R")),
            ("B", Some("R")),
            ("A1", Some("A")),
            ("A2", Some("A")),
            ("B1", Some("B")),
        ];
        assert_eq!(layout(&hierarchy(&edges)), layout(&hierarchy(&edges)));
    }

    #[test]
    fn root_need_not_come_first() {
        let tree = hierarchy(&[("A", Some("R")), ("R", None)]);
        let layout = layout(&tree);
        assert_eq!(layout.order(), ["R".to_owned(), "A".to_owned()]);
        assert_eq!(layout.placement("A").unwrap().depth, 1);
    }

    #[test]
    fn malformed_hierarchies_are_rejected() {
        let empty = layout_tree(&HierarchyTree::default(), &TreeLayoutConfig::default());
        assert_eq!(
            empty,
            Err(GraphError::MalformedHierarchy(HierarchyDefect::MissingRoot))
        );

        let two_roots = layout_tree(
            &hierarchy(&[("R", None), ("S", None)]),
            &TreeLayoutConfig::default(),
        );
        assert!(matches!(
            two_roots,
            Err(GraphError::MalformedHierarchy(HierarchyDefect::MultipleRoots(_)))
        ));

        let cycle = layout_tree(
            &hierarchy(&[("R", None), ("A", Some("B")), ("B", Some("A"))]),
            &TreeLayoutConfig::default(),
        );
        assert_eq!(
            cycle,
            Err(GraphError::MalformedHierarchy(HierarchyDefect::Cycle(vec![
                "A".to_owned(),
                "B".to_owned()
            ])))
        );

        let orphan = layout_tree(
            &hierarchy(&[("R", None), ("A", Some("missing"))]),
            &TreeLayoutConfig::default(),
        );
        assert!(matches!(
            orphan,
            Err(GraphError::MalformedHierarchy(HierarchyDefect::UnknownParent { .. }))
        ));

        let duplicate = layout_tree(
            &hierarchy(&[("R", None), ("R", None)]),
            &TreeLayoutConfig::default(),
        );
        assert!(matches!(
            duplicate,
            Err(GraphError::MalformedHierarchy(HierarchyDefect::DuplicateNode(_)))
        ));
    }
}
