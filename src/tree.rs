//! Candidate tree with arena allocation.
//!
//! Nodes are stored in a contiguous `Vec` and referenced by [`NodeId`]
//! indices, which keeps ownership single-rooted (the arena owns every node)
//! while parent links stay cheap non-owning indices. One tree is built per
//! question and discarded with the search result.

use crate::node::{NodeId, SearchNode};

/// Candidate tree with arena-based node storage.
#[derive(Debug)]
pub struct SearchTree {
    /// Arena storing all nodes; index 0 is always the root.
    nodes: Vec<SearchNode>,
    root: NodeId,
}

impl SearchTree {
    /// Create a new tree whose root holds the first generated candidate.
    pub fn new(root_query: String) -> Self {
        Self {
            nodes: vec![SearchNode::new_root(root_query)],
            root: NodeId(0),
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &SearchNode {
        &self.nodes[id.0 as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut SearchNode {
        &mut self.nodes[id.0 as usize]
    }

    /// Total number of allocated nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True when `parent` already has a child carrying exactly `query`.
    pub fn has_child_with_query(&self, parent: NodeId, query: &str) -> bool {
        self.get(parent)
            .children
            .iter()
            .any(|&child| self.get(child).query == query)
    }

    /// Add a child candidate under `parent`, preserving insertion order.
    ///
    /// Returns `None` without allocating when a sibling already carries the
    /// same query text; siblings are unique by construction.
    pub fn add_child(&mut self, parent: NodeId, query: String) -> Option<NodeId> {
        if self.has_child_with_query(parent, &query) {
            return None;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SearchNode::new_child(parent, query));
        self.get_mut(parent).children.push(id);
        Some(id)
    }

    /// Select the child of `parent` maximizing the UCB1 score.
    ///
    /// Ties resolve to the first-inserted maximal child, so replays with
    /// identical generator output are deterministic.
    pub fn select_child(&self, parent: NodeId, exploration: f64) -> Option<NodeId> {
        let node = self.get(parent);
        let parent_visits = node.visits;

        let mut best: Option<(NodeId, f64)> = None;
        for &child in &node.children {
            let score = self.get(child).ucb_score(parent_visits, exploration);
            match best {
                // Strict comparison keeps the earliest maximal child.
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((child, score)),
            }
        }
        best.map(|(id, _)| id)
    }

    /// Credit `reward` to every node from `leaf` up to and including the
    /// root, bumping visit counts along the way.
    pub fn backpropagate(&mut self, leaf: NodeId, reward: f64) {
        let mut current = leaf;
        while current.is_some() {
            let node = self.get_mut(current);
            node.visits += 1;
            node.reward_sum += reward;
            current = node.parent;
        }
    }

    /// Non-recursive pre-order walk over the arena. The iterator is lazy
    /// and one-shot; node counting consumes it fully.
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder {
            tree: self,
            stack: vec![self.root],
        }
    }

    /// Number of nodes reachable from the root, by full pre-order traversal.
    pub fn node_count(&self) -> usize {
        self.preorder().count()
    }
}

/// Explicit-stack pre-order traversal, avoiding recursion depth concerns
/// for long-running trees.
pub struct Preorder<'a> {
    tree: &'a SearchTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        let node = self.tree.get(id);
        // Reversed push keeps children in insertion order on the way out.
        for &child in node.children.iter().rev() {
            self.stack.push(child);
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tree_has_single_root() {
        let tree = SearchTree::new("SELECT 1;".into());
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root(), NodeId(0));
        assert!(tree.get(tree.root()).parent.is_none());
    }

    #[test]
    fn add_child_links_both_ways() {
        let mut tree = SearchTree::new("SELECT 1;".into());
        let child = tree
            .add_child(tree.root(), "SELECT 2;".into())
            .expect("first child is never a duplicate");

        assert_eq!(tree.len(), 2);
        assert_eq!(tree.get(tree.root()).children, vec![child]);
        assert_eq!(tree.get(child).parent, tree.root());
    }

    #[test]
    fn duplicate_sibling_rejected() {
        let mut tree = SearchTree::new("SELECT 1;".into());
        tree.add_child(tree.root(), "SELECT 2;".into()).unwrap();
        let rejected = tree.add_child(tree.root(), "SELECT 2;".into());

        assert!(rejected.is_none(), "siblings must have distinct query text");
        assert_eq!(tree.len(), 2, "no node allocated for a rejected duplicate");
    }

    #[test]
    fn duplicate_allowed_under_other_parent() {
        let mut tree = SearchTree::new("SELECT 1;".into());
        let a = tree.add_child(tree.root(), "SELECT 2;".into()).unwrap();
        // The same text is fine below a different parent.
        assert!(tree.add_child(a, "SELECT 2;".into()).is_some());
    }

    #[test]
    fn backpropagate_credits_whole_path() {
        let mut tree = SearchTree::new("SELECT 1;".into());
        let child = tree.add_child(tree.root(), "SELECT 2;".into()).unwrap();
        let grandchild = tree.add_child(child, "SELECT 3;".into()).unwrap();

        tree.backpropagate(grandchild, 0.85);

        for id in [tree.root(), child, grandchild] {
            assert_eq!(tree.get(id).visits, 1);
            assert!((tree.get(id).reward_sum - 0.85).abs() < 1e-12);
        }
    }

    #[test]
    fn selection_ties_break_to_first_child() {
        let mut tree = SearchTree::new("SELECT 1;".into());
        let first = tree.add_child(tree.root(), "SELECT 2;".into()).unwrap();
        let second = tree.add_child(tree.root(), "SELECT 3;".into()).unwrap();

        // Both children unvisited: both score +inf, first one must win.
        assert_eq!(tree.select_child(tree.root(), 1.41), Some(first));

        // Identical statistics after visits: still the first child.
        tree.get_mut(tree.root()).visits = 2;
        tree.get_mut(first).visits = 1;
        tree.get_mut(first).reward_sum = 0.5;
        tree.get_mut(second).visits = 1;
        tree.get_mut(second).reward_sum = 0.5;
        assert_eq!(tree.select_child(tree.root(), 1.41), Some(first));
    }

    #[test]
    fn selection_prefers_unvisited_child() {
        let mut tree = SearchTree::new("SELECT 1;".into());
        let visited = tree.add_child(tree.root(), "SELECT 2;".into()).unwrap();
        let fresh = tree.add_child(tree.root(), "SELECT 3;".into()).unwrap();

        tree.get_mut(tree.root()).visits = 1;
        tree.get_mut(visited).visits = 1;
        tree.get_mut(visited).reward_sum = 1.0;

        assert_eq!(tree.select_child(tree.root(), 1.41), Some(fresh));
    }

    #[test]
    fn preorder_visits_every_node_once() {
        let mut tree = SearchTree::new("SELECT 1;".into());
        let a = tree.add_child(tree.root(), "SELECT 2;".into()).unwrap();
        let b = tree.add_child(tree.root(), "SELECT 3;".into()).unwrap();
        let a1 = tree.add_child(a, "SELECT 4;".into()).unwrap();

        let order: Vec<NodeId> = tree.preorder().collect();
        assert_eq!(order, vec![tree.root(), a, a1, b]);
        assert_eq!(tree.node_count(), 4);
    }
}
