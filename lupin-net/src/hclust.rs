use crate::dendrogram::{Dendrogram, Merge, Node};
use crate::error::{NetworkError, Result};
use crate::Mat;

use log::info;
use rayon::prelude::*;

/// Agglomerative average-linkage clustering of a dissimilarity matrix.
///
/// Starts from singleton clusters and repeatedly merges the closest pair,
/// where cluster distance is the mean pairwise dissimilarity across the two
/// member sets. Distances are maintained incrementally with the
/// Lance-Williams average-linkage update
/// `d(k, i+j) = (n_i d_ki + n_j d_kj) / (n_i + n_j)`, and a per-row
/// nearest-neighbour cache keeps the scan near O(n^2) overall.
///
/// Ties in the minimum distance break to the lowest cluster index pair, so
/// identical input yields an identical tree. Non-finite input entries are
/// treated as maximum distance (1.0). Merge heights are clamped
/// non-decreasing against floating-point jitter; average linkage is monotone
/// in exact arithmetic.
pub fn average_linkage(dissim: &Mat) -> Result<Dendrogram> {
    const STAGE: &str = "hclust";

    if dissim.nrows() != dissim.ncols() {
        return Err(NetworkError::parameter(
            STAGE,
            format!("dissimilarity matrix is {} x {}", dissim.nrows(), dissim.ncols()),
        ));
    }
    let nn = dissim.nrows();
    if nn == 0 {
        return Err(NetworkError::data_quality(STAGE, "empty dissimilarity matrix"));
    }
    if nn == 1 {
        return Dendrogram::new(1, vec![]);
    }

    // flat working copy, sanitized; d(i,j) at i*nn + j
    let mut dist: Vec<f32> = dissim
        .transpose() // row-major flat order
        .as_slice()
        .iter()
        .map(|&x| if x.is_finite() { x.max(0.0) } else { 1.0 })
        .collect();

    let mut active = vec![true; nn];
    let mut sizes = vec![1_usize; nn];
    let mut handles: Vec<Node> = (0..nn).map(Node::Leaf).collect();

    // nearest active neighbour per active row; lowest index wins ties
    let row_min = |dist: &[f32], active: &[bool], i: usize| -> (f32, usize) {
        let mut best = (f32::INFINITY, usize::MAX);
        for j in 0..nn {
            if j != i && active[j] {
                let d = dist[i * nn + j];
                if d < best.0 {
                    best = (d, j);
                }
            }
        }
        best
    };

    let mut cache: Vec<(f32, usize)> = (0..nn)
        .into_par_iter()
        .map(|i| row_min(&dist, &active, i))
        .collect();

    info!("average-linkage clustering of {} leaves", nn);

    let mut merges: Vec<Merge> = Vec::with_capacity(nn - 1);
    let mut last_height = 0.0_f32;

    for m in 0..(nn - 1) {
        // global minimum over cached rows; strict < keeps the lowest pair
        let mut ii = usize::MAX;
        let mut dd = f32::INFINITY;
        for i in 0..nn {
            if active[i] && cache[i].0 < dd {
                dd = cache[i].0;
                ii = i;
            }
        }
        let jj = cache[ii].1;
        debug_assert!(ii < jj);

        let height = dd.max(last_height);
        last_height = height;

        let (ni, nj) = (sizes[ii] as f32, sizes[jj] as f32);
        merges.push(Merge {
            left: handles[ii],
            right: handles[jj],
            height,
            size: sizes[ii] + sizes[jj],
        });

        handles[ii] = Node::Cluster(m);
        sizes[ii] += sizes[jj];
        active[jj] = false;

        for k in 0..nn {
            if k != ii && active[k] {
                let d_new = (ni * dist[ii * nn + k] + nj * dist[jj * nn + k]) / (ni + nj);
                dist[ii * nn + k] = d_new;
                dist[k * nn + ii] = d_new;
            }
        }

        if m + 2 == nn {
            break;
        }

        // rows whose cached neighbour was touched must rescan; everyone
        // else's cached minimum is still a valid lower bound (the updated
        // distance is an average of two values it already undercut)
        let stale: Vec<usize> = (0..nn)
            .filter(|&k| active[k] && (k == ii || cache[k].1 == ii || cache[k].1 == jj))
            .collect();

        let refreshed: Vec<(usize, (f32, usize))> = stale
            .par_iter()
            .map(|&k| (k, row_min(&dist, &active, k)))
            .collect();
        for (k, entry) in refreshed {
            cache[k] = entry;
        }
    }

    Dendrogram::new(nn, merges)
}
