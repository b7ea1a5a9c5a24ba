use crate::error::{NetworkError, Result};
use crate::Mat;

use rayon::prelude::*;

/// Network sign convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignMode {
    /// Similarity rescaled to [0,1] via (s+1)/2 before the power transform;
    /// anti-correlated genes end up unconnected
    Signed,
    /// Power transform of |s|; correlation sign is discarded
    Unsigned,
}

impl std::str::FromStr for SignMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "signed" => Ok(SignMode::Signed),
            "unsigned" => Ok(SignMode::Unsigned),
            _ => Err(format!("unknown sign mode: {}", s)),
        }
    }
}

/// Soft-threshold a similarity matrix into edge weights.
///
/// Raising similarities to `power` suppresses weak correlations much faster
/// than strong ones, a soft version of hard thresholding. Flagged (NaN)
/// similarity entries become zero adjacency, i.e. maximally distant pairs.
/// The diagonal is forced to 1 afterwards by convention; connectivity sums
/// exclude it.
pub fn adjacency_matrix(sim: &Mat, power: f32, sign: SignMode) -> Result<Mat> {
    const STAGE: &str = "adjacency";

    if !(power >= 1.0) {
        return Err(NetworkError::parameter(
            STAGE,
            format!("power {} < 1", power),
        ));
    }
    if sim.nrows() != sim.ncols() {
        return Err(NetworkError::parameter(
            STAGE,
            format!("similarity matrix is {} x {}", sim.nrows(), sim.ncols()),
        ));
    }

    let nn = sim.nrows();
    let mut adj = sim.clone();

    // element-wise transform, one column chunk per job
    adj.as_mut_slice()
        .par_chunks_mut(nn.max(1))
        .for_each(|col| {
            for x in col.iter_mut() {
                let s = *x;
                *x = if s.is_finite() {
                    let base = match sign {
                        SignMode::Signed => (s + 1.0) / 2.0,
                        SignMode::Unsigned => s.abs(),
                    };
                    base.powf(power).clamp(0.0, 1.0)
                } else {
                    0.0
                };
            }
        });

    for i in 0..nn {
        adj[(i, i)] = 1.0;
    }

    Ok(adj)
}
