//! Weighted gene co-expression network analysis.
//!
//! Builds a weighted co-expression network from a gene-by-sample expression
//! matrix and partitions genes into modules of coordinated expression. The
//! pipeline is a strict sequence of pure matrix transformations:
//!
//! 1. robust pairwise correlation (biweight midcorrelation),
//! 2. soft-threshold power scan against scale-free topology,
//! 3. signed/unsigned power-transformed adjacency,
//! 4. topological-overlap dissimilarity,
//! 5. average-linkage hierarchical clustering,
//! 6. dynamic branch-cut module assignment.
//!
//! Each stage consumes read-only inputs and returns a newly owned matrix or
//! tree, so stages compose freely and parallelize internally without locks.
//!
//! # References
//!
//! Zhang & Horvath (2005). "A general framework for weighted gene
//! co-expression network analysis." Stat Appl Genet Mol Biol 4:17.
//!
//! Langfelder, Zhang & Horvath (2008). "Defining clusters from a
//! hierarchical cluster tree: the Dynamic Tree Cut package for R."
//! Bioinformatics 24(5):719-720.

/// Typed errors for data-quality and parameter failures
pub mod error;

/// Line-oriented, gzip-aware text IO helpers
pub mod common_io;

/// Validated expression matrix input
pub mod expression;

/// Robust gene-gene similarity (biweight midcorrelation)
pub mod correlation;

/// Scale-free topology fit across candidate soft-threshold powers
pub mod soft_threshold;

/// Power-transformed signed/unsigned adjacency
pub mod adjacency;

/// Topological overlap dissimilarity
pub mod topological_overlap;

/// Merge-tree value type produced by hierarchical clustering
pub mod dendrogram;

/// Average-linkage agglomerative clustering
pub mod hclust;

/// Adaptive branch-pruning module detection
pub mod dynamic_cut;

/// Seeded synthetic modular expression data
pub mod simulate;

pub use adjacency::{adjacency_matrix, SignMode};
pub use correlation::{similarity_matrix, CorrelationMethod};
pub use dendrogram::{Dendrogram, Merge, Node};
pub use dynamic_cut::{cut_dendrogram, sweep_deep_split, DynamicCutArgs, ModuleAssignment};
pub use error::{NetworkError, Result};
pub use expression::ExpressionMatrix;
pub use hclust::average_linkage;
pub use soft_threshold::{scan_powers, PowerFit, PowerScanArgs, PowerScanReport};
pub use topological_overlap::tom_dissimilarity;

/// Dense gene-by-gene (or gene-by-sample) matrix
pub type Mat = nalgebra::DMatrix<f32>;

/// Dense vector
pub type DVec = nalgebra::DVector<f32>;
