use crate::error::{NetworkError, Result};

/// A node handle inside a merge tree: either an original gene (leaf) or the
/// cluster produced by an earlier merge, referenced by merge index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Leaf(usize),
    Cluster(usize),
}

impl Node {
    /// R-style signed encoding: leaves are negative one-based, merges are
    /// positive one-based. Used for the exported merge table.
    pub fn encode(&self) -> i64 {
        match *self {
            Node::Leaf(i) => -(i as i64 + 1),
            Node::Cluster(m) => m as i64 + 1,
        }
    }
}

/// One agglomeration event.
#[derive(Debug, Clone, Copy)]
pub struct Merge {
    pub left: Node,
    pub right: Node,
    /// Linkage distance at merge time
    pub height: f32,
    /// Number of leaves in the merged cluster
    pub size: usize,
}

/// An ordered sequence of merges over `num_leaves` leaves.
///
/// Invariants checked at construction: exactly `num_leaves - 1` merges,
/// every node referenced is in range and consumed exactly once, and merge
/// heights are non-decreasing (average-linkage construction guarantees
/// this; the check guards hand-built trees).
#[derive(Debug, Clone)]
pub struct Dendrogram {
    num_leaves: usize,
    merges: Vec<Merge>,
}

impl Dendrogram {
    pub fn new(num_leaves: usize, merges: Vec<Merge>) -> Result<Self> {
        const STAGE: &str = "dendrogram";

        if num_leaves == 0 {
            return Err(NetworkError::parameter(STAGE, "no leaves"));
        }
        if merges.len() + 1 != num_leaves {
            return Err(NetworkError::parameter(
                STAGE,
                format!(
                    "{} merges for {} leaves, expected {}",
                    merges.len(),
                    num_leaves,
                    num_leaves - 1
                ),
            ));
        }

        let mut used_leaf = vec![false; num_leaves];
        let mut used_merge = vec![false; merges.len()];
        let mut last_height = f32::NEG_INFINITY;

        for (m, merge) in merges.iter().enumerate() {
            for node in [merge.left, merge.right] {
                match node {
                    Node::Leaf(i) => {
                        if i >= num_leaves || used_leaf[i] {
                            return Err(NetworkError::parameter(
                                STAGE,
                                format!("leaf {} missing or used twice at merge {}", i, m),
                            ));
                        }
                        used_leaf[i] = true;
                    }
                    Node::Cluster(c) => {
                        if c >= m || used_merge[c] {
                            return Err(NetworkError::parameter(
                                STAGE,
                                format!("cluster {} missing or used twice at merge {}", c, m),
                            ));
                        }
                        used_merge[c] = true;
                    }
                }
            }
            if merge.height < last_height {
                return Err(NetworkError::parameter(
                    STAGE,
                    format!(
                        "merge {} height {} below previous {}",
                        m, merge.height, last_height
                    ),
                ));
            }
            last_height = merge.height;
        }

        Ok(Dendrogram { num_leaves, merges })
    }

    pub fn num_leaves(&self) -> usize {
        self.num_leaves
    }

    pub fn num_merges(&self) -> usize {
        self.merges.len()
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Leaf indices under a node, in discovery order.
    pub fn leaves_under(&self, node: Node) -> Vec<usize> {
        let mut out = vec![];
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            match n {
                Node::Leaf(i) => out.push(i),
                Node::Cluster(m) => {
                    let merge = &self.merges[m];
                    stack.push(merge.right);
                    stack.push(merge.left);
                }
            }
        }
        out
    }

    /// Number of leaves under a node without materializing them.
    pub fn size_of(&self, node: Node) -> usize {
        match node {
            Node::Leaf(_) => 1,
            Node::Cluster(m) => self.merges[m].size,
        }
    }
}
