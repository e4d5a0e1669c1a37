//! Nodes of the candidate tree.
//!
//! Each node holds one generated SQL candidate together with the visit and
//! reward statistics used for UCB1 selection. Nodes live in an arena owned
//! by [`crate::tree::SearchTree`] and refer to each other by index, so the
//! parent link is a plain non-owning `NodeId` rather than a second pointer.

/// Index into the node arena. Using a newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }
}

/// A node in the candidate tree.
#[derive(Debug, Clone)]
pub struct SearchNode {
    /// Candidate SQL text, immutable after creation.
    pub query: String,

    /// Parent node index (NONE for the root).
    pub parent: NodeId,

    /// Children in insertion order. No two children share query text.
    pub children: Vec<NodeId>,

    /// Number of times this node was on a backpropagated path.
    pub visits: u32,

    /// Accumulated reward across all backpropagations through this node.
    /// visits == 0 implies reward_sum == 0.
    pub reward_sum: f64,

    /// Marks a node as closed to further expansion. Part of the node
    /// contract; the current expansion policy never sets it.
    pub terminal: bool,
}

impl SearchNode {
    pub fn new_root(query: String) -> Self {
        Self {
            query,
            parent: NodeId::NONE,
            children: Vec::new(),
            visits: 0,
            reward_sum: 0.0,
            terminal: false,
        }
    }

    pub fn new_child(parent: NodeId, query: String) -> Self {
        Self {
            query,
            parent,
            children: Vec::new(),
            visits: 0,
            reward_sum: 0.0,
            terminal: false,
        }
    }

    /// Average reward, defined only for visited nodes. Returns 0.0 when
    /// unvisited so callers that only display the value need no branch.
    #[inline]
    pub fn mean_reward(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.reward_sum / self.visits as f64
        }
    }

    /// UCB1 confidence score for selection.
    ///
    /// Unvisited nodes score +infinity so every child is evaluated at least
    /// once before any child is revisited. Otherwise
    /// `reward_sum/visits + c * sqrt(ln(parent_visits + 1) / visits)`.
    #[inline]
    pub fn ucb_score(&self, parent_visits: u32, exploration: f64) -> f64 {
        if self.visits == 0 {
            return f64::INFINITY;
        }
        let v = self.visits as f64;
        let exploitation = self.reward_sum / v;
        let exploration = exploration * ((parent_visits as f64 + 1.0).ln() / v).sqrt();
        exploitation + exploration
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.terminal || self.children.is_empty()
    }
}
