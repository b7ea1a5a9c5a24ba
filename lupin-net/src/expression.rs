use crate::error::{NetworkError, Result};
use crate::Mat;

use std::collections::HashSet;

/// Minimum number of samples for a stable correlation estimate
pub const MIN_SAMPLES: usize = 4;

/// How many offending gene names to spell out in an error message
const MAX_NAMED_GENES: usize = 10;

/// A validated gene-by-sample expression matrix.
///
/// Rows are genes (unique identifiers), columns are samples. The data is
/// assumed to be the clean output of upstream filtering and normalization;
/// construction rejects anything the downstream correlation stage cannot
/// handle: non-finite values, duplicate or mismatched gene identifiers,
/// fewer than [`MIN_SAMPLES`] samples, and zero-variance gene rows.
///
/// Immutable once constructed.
#[derive(Debug)]
pub struct ExpressionMatrix {
    data: Mat,
    gene_names: Vec<Box<str>>,
}

impl ExpressionMatrix {
    /// Validate and wrap a genes x samples matrix.
    ///
    /// * `data` - expression values, one row per gene
    /// * `gene_names` - unique identifier per row
    pub fn new(data: Mat, gene_names: Vec<Box<str>>) -> Result<Self> {
        const STAGE: &str = "expression";

        if gene_names.len() != data.nrows() {
            return Err(NetworkError::data_quality(
                STAGE,
                format!(
                    "{} gene names for {} matrix rows",
                    gene_names.len(),
                    data.nrows()
                ),
            ));
        }

        if data.ncols() < MIN_SAMPLES {
            return Err(NetworkError::data_quality(
                STAGE,
                format!(
                    "{} samples, need at least {} for a stable correlation estimate",
                    data.ncols(),
                    MIN_SAMPLES
                ),
            ));
        }

        let mut seen = HashSet::new();
        let duplicated: Vec<&str> = gene_names
            .iter()
            .filter(|g| !seen.insert((*g).as_ref()))
            .map(|g| g.as_ref())
            .collect();
        if !duplicated.is_empty() {
            return Err(NetworkError::data_quality(
                STAGE,
                format!("duplicated gene identifiers: {}", name_list(&duplicated)),
            ));
        }

        let non_finite: Vec<&str> = (0..data.nrows())
            .filter(|&i| data.row(i).iter().any(|x| !x.is_finite()))
            .map(|i| gene_names[i].as_ref())
            .collect();
        if !non_finite.is_empty() {
            return Err(NetworkError::data_quality(
                STAGE,
                format!("non-finite values in genes: {}", name_list(&non_finite)),
            ));
        }

        // zero variance makes correlation undefined for every pair
        // involving the gene; reject instead of emitting NaN downstream
        let zero_var: Vec<&str> = (0..data.nrows())
            .filter(|&i| {
                let row = data.row(i);
                let first = row[0];
                row.iter().all(|&x| x == first)
            })
            .map(|i| gene_names[i].as_ref())
            .collect();
        if !zero_var.is_empty() {
            return Err(NetworkError::data_quality(
                STAGE,
                format!(
                    "zero variance across all samples in genes: {}",
                    name_list(&zero_var)
                ),
            ));
        }

        Ok(ExpressionMatrix { data, gene_names })
    }

    pub fn num_genes(&self) -> usize {
        self.data.nrows()
    }

    pub fn num_samples(&self) -> usize {
        self.data.ncols()
    }

    pub fn data(&self) -> &Mat {
        &self.data
    }

    pub fn gene_names(&self) -> &[Box<str>] {
        &self.gene_names
    }
}

/// Spell out up to [`MAX_NAMED_GENES`] names, then elide the rest.
fn name_list(names: &[&str]) -> String {
    if names.len() <= MAX_NAMED_GENES {
        names.join(", ")
    } else {
        format!(
            "{}, ... ({} genes total)",
            names[..MAX_NAMED_GENES].join(", "),
            names.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<Box<str>> {
        (0..n).map(|i| format!("g{}", i).into_boxed_str()).collect()
    }

    #[test]
    fn test_accepts_clean_matrix() {
        let data = Mat::from_row_slice(2, 4, &[1.0, 2.0, 3.0, 4.0, 4.0, 3.0, 2.0, 1.0]);
        let expr = ExpressionMatrix::new(data, names(2)).unwrap();
        assert_eq!(expr.num_genes(), 2);
        assert_eq!(expr.num_samples(), 4);
    }

    #[test]
    fn test_rejects_zero_variance_gene() {
        let data = Mat::from_row_slice(2, 4, &[1.0, 2.0, 3.0, 4.0, 5.0, 5.0, 5.0, 5.0]);
        let err = ExpressionMatrix::new(data, names(2)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("zero variance"), "{}", msg);
        assert!(msg.contains("g1"), "{}", msg);
    }

    #[test]
    fn test_rejects_non_finite() {
        let data = Mat::from_row_slice(2, 4, &[1.0, f32::NAN, 3.0, 4.0, 4.0, 3.0, 2.0, 1.0]);
        let err = ExpressionMatrix::new(data, names(2)).unwrap_err();
        assert!(err.to_string().contains("non-finite"));
        assert!(err.to_string().contains("g0"));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let data = Mat::from_row_slice(2, 4, &[1.0, 2.0, 3.0, 4.0, 4.0, 3.0, 2.0, 1.0]);
        let dup = vec!["same".into(), "same".into()];
        let err = ExpressionMatrix::new(data, dup).unwrap_err();
        assert!(err.to_string().contains("duplicated"));
    }

    #[test]
    fn test_rejects_too_few_samples() {
        let data = Mat::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 3.0, 2.0, 1.0]);
        let err = ExpressionMatrix::new(data, names(2)).unwrap_err();
        assert!(err.to_string().contains("samples"));
    }

    #[test]
    fn test_rejects_name_count_mismatch() {
        let data = Mat::from_row_slice(2, 4, &[1.0, 2.0, 3.0, 4.0, 4.0, 3.0, 2.0, 1.0]);
        assert!(ExpressionMatrix::new(data, names(3)).is_err());
    }
}
