use crate::dendrogram::{Dendrogram, Node};
use crate::error::{NetworkError, Result};

use log::info;

/// The distinguished background label for genes not confidently placed in
/// any module.
pub const UNASSIGNED: usize = 0;

/// Scatter cap per deep-split level: the fraction of a parent merge height
/// that a branch's mean internal height may reach while the branch still
/// counts as a distinct module candidate. Higher levels tolerate
/// less-distinct branches, so the cut yields more and smaller modules.
const SCATTER_CAP: [f32; 4] = [0.55, 0.67, 0.79, 0.91];

/// Branch-cut parameters.
#[derive(Debug, Clone)]
pub struct DynamicCutArgs {
    /// Smallest admissible module; the unassigned label is exempt
    pub min_cluster_size: usize,
    /// Merges above this height never join module candidates
    pub cut_height: f32,
    /// Split sensitivity, 0 (coarse) to 3 (aggressive)
    pub deep_split: u8,
}

impl Default for DynamicCutArgs {
    fn default() -> Self {
        Self {
            min_cluster_size: 30,
            cut_height: 0.99,
            deep_split: 2,
        }
    }
}

/// Gene-to-module labels. Label [`UNASSIGNED`] (0) is background; labels
/// `1..=num_modules` are modules in decreasing size order (ties broken by
/// the smallest member index). Only the partition is meaningful; the label
/// numbers are a reproducibility convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleAssignment {
    labels: Vec<usize>,
    num_modules: usize,
}

impl ModuleAssignment {
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn label(&self, gene: usize) -> usize {
        self.labels[gene]
    }

    pub fn num_genes(&self) -> usize {
        self.labels.len()
    }

    pub fn num_modules(&self) -> usize {
        self.num_modules
    }

    /// Member gene indices of one label (0 lists the unassigned genes).
    pub fn members(&self, label: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter_map(|(i, &l)| (l == label).then_some(i))
            .collect()
    }

    /// Gene count per label, indexed 0..=num_modules.
    pub fn label_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0_usize; self.num_modules + 1];
        for &l in self.labels.iter() {
            sizes[l] += 1;
        }
        sizes
    }

    /// The partition as sorted membership sets, unassigned excluded.
    /// Two assignments are the same partition iff these compare equal,
    /// whatever the label numbers were.
    pub fn partition(&self) -> Vec<Vec<usize>> {
        let mut sets: Vec<Vec<usize>> = (1..=self.num_modules)
            .map(|l| self.members(l))
            .collect();
        for s in sets.iter_mut() {
            s.sort();
        }
        sets.sort();
        sets
    }
}

/// Cut a dendrogram into modules by adaptive branch pruning.
///
/// Instead of one horizontal cut, the tree is walked from each sub-ceiling
/// branch top downward. At a merge of sub-branches L and R at height h, each
/// sub-branch is *distinct* when it has at least `min_cluster_size` members
/// and its mean internal merge height stays within `SCATTER_CAP[deep_split]
/// * h` (a tight core far below the joining merge). Only when both
/// sub-branches are distinct does the branch split; otherwise it stays
/// whole. Surviving candidates of admissible size become modules; every
/// other gene gets [`UNASSIGNED`]. Deterministic for a fixed tree and
/// parameters.
pub fn cut_dendrogram(dendro: &Dendrogram, args: &DynamicCutArgs) -> Result<ModuleAssignment> {
    const STAGE: &str = "dynamic_cut";

    if args.min_cluster_size < 1 {
        return Err(NetworkError::parameter(STAGE, "min_cluster_size < 1"));
    }
    if !(args.cut_height >= 0.0 && args.cut_height <= 1.0) {
        return Err(NetworkError::parameter(
            STAGE,
            format!("cut_height {} outside [0, 1]", args.cut_height),
        ));
    }
    if args.deep_split as usize >= SCATTER_CAP.len() {
        return Err(NetworkError::parameter(
            STAGE,
            format!(
                "deep_split {} outside supported range 0..={}",
                args.deep_split,
                SCATTER_CAP.len() - 1
            ),
        ));
    }

    let nn = dendro.num_leaves();
    let merges = dendro.merges();
    let cap = SCATTER_CAP[args.deep_split as usize];

    // mean internal merge height per cluster, bottom-up
    let mut height_sum = vec![0.0_f32; merges.len()];
    let mut height_cnt = vec![0_usize; merges.len()];
    for (m, merge) in merges.iter().enumerate() {
        let mut sum = merge.height;
        let mut cnt = 1;
        for child in [merge.left, merge.right] {
            if let Node::Cluster(c) = child {
                sum += height_sum[c];
                cnt += height_cnt[c];
            }
        }
        height_sum[m] = sum;
        height_cnt[m] = cnt;
    }
    let mean_internal = |node: Node| -> f32 {
        match node {
            Node::Leaf(_) => 0.0,
            Node::Cluster(m) => height_sum[m] / height_cnt[m] as f32,
        }
    };

    // maximal branches whose merges all stay at or below the ceiling:
    // walking top-down, a permitted merge absorbs its children; a permitted
    // merge nobody absorbed is a branch root, and so is any stray leaf
    let mut absorbed_merge = vec![false; merges.len()];
    let mut absorbed_leaf = vec![false; nn];
    let mut roots: Vec<Node> = vec![];
    for (m, merge) in merges.iter().enumerate().rev() {
        if merge.height <= args.cut_height {
            for child in [merge.left, merge.right] {
                match child {
                    Node::Cluster(c) => absorbed_merge[c] = true,
                    Node::Leaf(l) => absorbed_leaf[l] = true,
                }
            }
            if !absorbed_merge[m] {
                roots.push(Node::Cluster(m));
            }
        }
    }
    for l in 0..nn {
        if !absorbed_leaf[l] {
            roots.push(Node::Leaf(l));
        }
    }

    // top-down recursive split over each branch
    let distinct = |node: Node, h: f32| -> bool {
        dendro.size_of(node) >= args.min_cluster_size && mean_internal(node) <= cap * h
    };

    let mut candidates: Vec<Node> = vec![];
    let mut stack = roots;
    while let Some(node) = stack.pop() {
        match node {
            Node::Leaf(_) => candidates.push(node),
            Node::Cluster(m) => {
                let merge = &merges[m];
                if distinct(merge.left, merge.height) && distinct(merge.right, merge.height) {
                    stack.push(merge.left);
                    stack.push(merge.right);
                } else {
                    candidates.push(node);
                }
            }
        }
    }

    // admissible candidates become modules, largest first
    let mut modules: Vec<Vec<usize>> = candidates
        .into_iter()
        .filter(|&c| dendro.size_of(c) >= args.min_cluster_size)
        .map(|c| {
            let mut leaves = dendro.leaves_under(c);
            leaves.sort();
            leaves
        })
        .collect();
    modules.sort_by_key(|m| (std::cmp::Reverse(m.len()), m[0]));

    let mut labels = vec![UNASSIGNED; nn];
    for (rank, members) in modules.iter().enumerate() {
        for &g in members {
            labels[g] = rank + 1;
        }
    }

    info!(
        "deep_split {}: {} modules, {} unassigned of {} genes",
        args.deep_split,
        modules.len(),
        labels.iter().filter(|&&l| l == UNASSIGNED).count(),
        nn
    );

    Ok(ModuleAssignment {
        labels,
        num_modules: modules.len(),
    })
}

/// Evaluate several deep-split sensitivities against one dendrogram.
///
/// Each level is an independent cut with the other parameters held fixed;
/// the results come back as a collection, one assignment per requested
/// level, in the requested order.
pub fn sweep_deep_split(
    dendro: &Dendrogram,
    base: &DynamicCutArgs,
    levels: &[u8],
) -> Result<Vec<(u8, ModuleAssignment)>> {
    levels
        .iter()
        .map(|&deep_split| {
            let args = DynamicCutArgs {
                deep_split,
                ..base.clone()
            };
            cut_dendrogram(dendro, &args).map(|a| (deep_split, a))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dendrogram::{Dendrogram, Merge, Node};

    fn merge(left: Node, right: Node, height: f32, size: usize) -> Merge {
        Merge {
            left,
            right,
            height,
            size,
        }
    }

    /// Eight leaves in two branches of two tight pairs each:
    /// ((0,1)+(2,3)) and ((4,5)+(6,7)), joined far apart at the root.
    fn nested_tree() -> Dendrogram {
        Dendrogram::new(
            8,
            vec![
                merge(Node::Leaf(0), Node::Leaf(1), 0.1, 2),
                merge(Node::Leaf(2), Node::Leaf(3), 0.1, 2),
                merge(Node::Leaf(4), Node::Leaf(5), 0.1, 2),
                merge(Node::Leaf(6), Node::Leaf(7), 0.1, 2),
                merge(Node::Cluster(0), Node::Cluster(1), 0.14, 4),
                merge(Node::Cluster(2), Node::Cluster(3), 0.14, 4),
                merge(Node::Cluster(4), Node::Cluster(5), 0.9, 8),
            ],
        )
        .unwrap()
    }

    fn args(min: usize, cut: f32, ds: u8) -> DynamicCutArgs {
        DynamicCutArgs {
            min_cluster_size: min,
            cut_height: cut,
            deep_split: ds,
        }
    }

    #[test]
    fn test_deep_split_monotone_module_count() {
        let tree = nested_tree();
        let sweep = sweep_deep_split(&tree, &args(2, 0.99, 0), &[0, 1, 2, 3]).unwrap();
        let counts: Vec<usize> = sweep.iter().map(|(_, a)| a.num_modules()).collect();

        assert_eq!(counts, vec![2, 2, 4, 4]);
        for w in counts.windows(2) {
            assert!(w[1] >= w[0], "module count must not drop as deep_split grows");
        }
    }

    #[test]
    fn test_min_size_respected() {
        let tree = nested_tree();
        for ds in 0..4 {
            let assignment = cut_dendrogram(&tree, &args(3, 0.99, ds)).unwrap();
            let sizes = assignment.label_sizes();
            for (label, &size) in sizes.iter().enumerate().skip(1) {
                assert!(
                    size >= 3,
                    "module {} has {} members at deep_split {}",
                    label,
                    size,
                    ds
                );
            }
        }
    }

    #[test]
    fn test_oversized_min_cluster_unassigns_everything() {
        let tree = nested_tree();
        let assignment = cut_dendrogram(&tree, &args(100, 0.99, 2)).unwrap();
        assert_eq!(assignment.num_modules(), 0);
        assert!(assignment.labels().iter().all(|&l| l == UNASSIGNED));
    }

    #[test]
    fn test_zero_cut_height_unassigns_everything() {
        let tree = nested_tree();
        let assignment = cut_dendrogram(&tree, &args(2, 0.0, 2)).unwrap();
        assert_eq!(assignment.num_modules(), 0);
        assert!(assignment.labels().iter().all(|&l| l == UNASSIGNED));
    }

    #[test]
    fn test_ceiling_separates_branches() {
        // the root merge (0.9) exceeds the ceiling, so the two halves are
        // separate branches even without a split decision
        let tree = nested_tree();
        let assignment = cut_dendrogram(&tree, &args(4, 0.5, 0)).unwrap();
        assert_eq!(assignment.num_modules(), 2);
        assert_eq!(assignment.label(0), assignment.label(3));
        assert_eq!(assignment.label(4), assignment.label(7));
        assert_ne!(assignment.label(0), assignment.label(4));
    }

    #[test]
    fn test_straggler_above_ceiling_is_unassigned() {
        // a lone leaf joins the tree above the ceiling
        let tree = Dendrogram::new(
            4,
            vec![
                merge(Node::Leaf(0), Node::Leaf(1), 0.1, 2),
                merge(Node::Cluster(0), Node::Leaf(2), 0.15, 3),
                merge(Node::Cluster(1), Node::Leaf(3), 0.95, 4),
            ],
        )
        .unwrap();

        let assignment = cut_dendrogram(&tree, &args(2, 0.5, 1)).unwrap();
        assert_eq!(assignment.label(3), UNASSIGNED);
        assert_ne!(assignment.label(0), UNASSIGNED);
        assert_eq!(assignment.label(0), assignment.label(2));
    }

    #[test]
    fn test_labels_ordered_by_size() {
        // one branch of 3 and one of 2, both admissible
        let tree = Dendrogram::new(
            5,
            vec![
                merge(Node::Leaf(2), Node::Leaf(3), 0.05, 2),
                merge(Node::Leaf(0), Node::Leaf(1), 0.1, 2),
                merge(Node::Cluster(1), Node::Leaf(4), 0.12, 3),
                merge(Node::Cluster(0), Node::Cluster(2), 0.9, 5),
            ],
        )
        .unwrap();

        let assignment = cut_dendrogram(&tree, &args(2, 0.5, 0)).unwrap();
        assert_eq!(assignment.num_modules(), 2);
        // the larger module {0,1,4} gets label 1
        assert_eq!(assignment.label(0), 1);
        assert_eq!(assignment.label(4), 1);
        assert_eq!(assignment.label(2), 2);
        assert_eq!(assignment.label_sizes(), vec![0, 3, 2]);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let tree = nested_tree();
        assert!(cut_dendrogram(&tree, &args(0, 0.99, 2)).is_err());
        assert!(cut_dendrogram(&tree, &args(2, 1.5, 2)).is_err());
        assert!(cut_dendrogram(&tree, &args(2, -0.1, 2)).is_err());
        assert!(cut_dendrogram(&tree, &args(2, 0.99, 4)).is_err());
    }

    #[test]
    fn test_partition_ignores_label_names() {
        let a = ModuleAssignment {
            labels: vec![1, 1, 2, 2, 0],
            num_modules: 2,
        };
        let b = ModuleAssignment {
            labels: vec![2, 2, 1, 1, 0],
            num_modules: 2,
        };
        assert_eq!(a.partition(), b.partition());
    }
}
