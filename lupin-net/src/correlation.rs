use crate::error::Result;
use crate::expression::ExpressionMatrix;
use crate::Mat;

use log::{info, warn};
use rayon::prelude::*;

/// Pairwise gene-gene correlation statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationMethod {
    /// Biweight midcorrelation: median/MAD-weighted, robust to a small
    /// number of outlier samples. Falls back to Pearson per gene when the
    /// MAD is degenerate (extremely peaked expression).
    Bicor,
    /// Ordinary product-moment correlation.
    Pearson,
}

impl std::str::FromStr for CorrelationMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bicor" => Ok(CorrelationMethod::Bicor),
            "pearson" => Ok(CorrelationMethod::Pearson),
            _ => Err(format!("unknown correlation method: {}", s)),
        }
    }
}

/// Outcome of normalizing one gene's sample vector.
enum GeneRow {
    /// Unit-norm weighted deviations; dot products of these are correlations
    Normalized(Vec<f32>),
    /// No usable deviation signal even after the Pearson fallback
    Degenerate,
}

/// Samples further than 9 MADs from the median get zero weight
const BIWEIGHT_C: f32 = 9.0;

/// Below this, a MAD or a deviation norm is treated as zero
const TINY: f32 = 1e-12;

/// Compute the gene-gene similarity matrix of an expression matrix.
///
/// Each gene's sample vector is reduced to unit-norm weighted deviations,
/// so the full G x G correlation matrix is a single cross-product of the
/// G x S normalized matrix, O(G^2 S). Symmetry and the unit diagonal are
/// enforced explicitly rather than trusted to floating point.
///
/// Entries for numerically degenerate genes (no deviation signal after the
/// fallback) are flagged as NaN and a warning names the genes; downstream
/// stages treat flagged pairs as maximally distant.
pub fn similarity_matrix(expr: &ExpressionMatrix, method: CorrelationMethod) -> Result<Mat> {
    let nn = expr.num_genes();
    let ss = expr.num_samples();
    let data = expr.data();

    let rows: Vec<GeneRow> = (0..nn)
        .into_par_iter()
        .map(|i| {
            let x: Vec<f32> = data.row(i).iter().copied().collect();
            normalize_gene_row(&x, method)
        })
        .collect();

    let degenerate: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter_map(|(i, r)| matches!(r, GeneRow::Degenerate).then_some(i))
        .collect();

    if !degenerate.is_empty() {
        let names: Vec<&str> = degenerate
            .iter()
            .take(10)
            .map(|&i| expr.gene_names()[i].as_ref())
            .collect();
        warn!(
            "{} gene(s) with degenerate correlation, flagged as NaN: {}{}",
            degenerate.len(),
            names.join(", "),
            if degenerate.len() > 10 { ", ..." } else { "" }
        );
    }

    let mut aa = Mat::zeros(nn, ss);
    for (i, row) in rows.iter().enumerate() {
        if let GeneRow::Normalized(v) = row {
            for (j, &x) in v.iter().enumerate() {
                aa[(i, j)] = x;
            }
        }
    }

    info!("correlating {} genes across {} samples", nn, ss);
    let mut sim = &aa * aa.transpose();

    // explicit symmetry and bounds; mirror the upper triangle
    for j in 0..nn {
        for i in 0..j {
            let v = sim[(i, j)].clamp(-1.0, 1.0);
            sim[(i, j)] = v;
            sim[(j, i)] = v;
        }
        sim[(j, j)] = 1.0;
    }

    for &i in degenerate.iter() {
        for j in 0..nn {
            if i != j {
                sim[(i, j)] = f32::NAN;
                sim[(j, i)] = f32::NAN;
            }
        }
    }

    Ok(sim)
}

/// Reduce one gene's sample vector to unit-norm weighted deviations.
///
/// Biweight path: deviations from the median, downweighted by
/// `w = (1 - u^2)^2` with `u = (x - median) / (9 MAD)`, zero beyond
/// `|u| >= 1`. A degenerate MAD falls back to the Pearson path.
fn normalize_gene_row(x: &[f32], method: CorrelationMethod) -> GeneRow {
    if method == CorrelationMethod::Bicor {
        let med = median_f32(x);
        let abs_dev: Vec<f32> = x.iter().map(|&v| (v - med).abs()).collect();
        let mad = median_f32(&abs_dev);

        if mad > TINY {
            let weighted: Vec<f32> = x
                .iter()
                .map(|&v| {
                    let u = (v - med) / (BIWEIGHT_C * mad);
                    if u.abs() < 1.0 {
                        let w = (1.0 - u * u) * (1.0 - u * u);
                        (v - med) * w
                    } else {
                        0.0
                    }
                })
                .collect();

            let norm = l2_norm(&weighted);
            if norm > TINY {
                return GeneRow::Normalized(weighted.iter().map(|&v| v / norm).collect());
            }
            // all weight collapsed onto the median; fall through to Pearson
        }
    }

    let mean = x.iter().sum::<f32>() / x.len() as f32;
    let centred: Vec<f32> = x.iter().map(|&v| v - mean).collect();
    let norm = l2_norm(&centred);

    if norm > TINY {
        GeneRow::Normalized(centred.iter().map(|&v| v / norm).collect())
    } else {
        GeneRow::Degenerate
    }
}

fn l2_norm(x: &[f32]) -> f32 {
    x.iter().map(|&v| v * v).sum::<f32>().sqrt()
}

fn median_f32(values: &[f32]) -> f32 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}
