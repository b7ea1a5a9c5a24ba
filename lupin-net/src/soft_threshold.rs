use crate::adjacency::{adjacency_matrix, SignMode};
use crate::error::{NetworkError, Result};
use crate::Mat;

use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;

/// Candidate-power scan settings.
#[derive(Debug, Clone)]
pub struct PowerScanArgs {
    /// Candidate soft-threshold powers, each >= 1
    pub powers: Vec<f32>,
    /// Signed or unsigned adjacency
    pub sign: SignMode,
    /// Number of connectivity histogram bins for the scale-free fit
    pub num_bins: usize,
    /// Fit index a power should reach to be considered credible
    pub fit_target: f32,
}

impl Default for PowerScanArgs {
    fn default() -> Self {
        Self {
            powers: default_powers(),
            sign: SignMode::Signed,
            num_bins: 10,
            fit_target: 0.9,
        }
    }
}

/// The customary candidate grid: 1..10 then even powers up to 20.
pub fn default_powers() -> Vec<f32> {
    (1..=10)
        .map(|p| p as f32)
        .chain((6..=10).map(|p| (2 * p) as f32))
        .collect()
}

/// Scale-free topology fit of the network built at one candidate power.
#[derive(Debug, Clone, Serialize)]
pub struct PowerFit {
    pub power: f32,
    /// Sign-corrected R^2 of the log-log connectivity fit; negative when
    /// the fitted slope has the empirically wrong sign
    pub fit_index: f32,
    /// Fitted slope of log10(frequency) on log10(connectivity)
    pub slope: f32,
    pub mean_connectivity: f32,
    pub median_connectivity: f32,
    pub max_connectivity: f32,
}

/// One [`PowerFit`] per scanned power, in the scanned order.
#[derive(Debug, Clone, Serialize)]
pub struct PowerScanReport {
    pub fits: Vec<PowerFit>,
    pub fit_target: f32,
}

impl PowerScanReport {
    /// Smallest scanned power whose fit index reaches the target.
    ///
    /// The choice of power remains an external decision; this is the
    /// customary reading of the scan table, nothing more.
    pub fn recommended_power(&self) -> Option<f32> {
        self.fits
            .iter()
            .find(|f| f.fit_index >= self.fit_target)
            .map(|f| f.power)
    }

    /// True when no scanned power reaches the target fit. Advisory only.
    pub fn low_confidence(&self) -> bool {
        self.recommended_power().is_none()
    }
}

/// Evaluate every candidate power against scale-free topology.
///
/// Powers are scored independently (no shared state), so the scan is a
/// parallel map over the candidate list. The similarity matrix is borrowed
/// read-only throughout.
pub fn scan_powers(sim: &Mat, args: &PowerScanArgs) -> Result<PowerScanReport> {
    const STAGE: &str = "soft_threshold";

    if args.powers.is_empty() {
        return Err(NetworkError::parameter(STAGE, "empty candidate power list"));
    }
    if let Some(p) = args.powers.iter().find(|&&p| !(p >= 1.0)) {
        return Err(NetworkError::parameter(
            STAGE,
            format!("candidate power {} < 1", p),
        ));
    }
    if args.num_bins < 2 {
        return Err(NetworkError::parameter(
            STAGE,
            format!("{} histogram bins, need at least 2", args.num_bins),
        ));
    }

    let fits = args
        .powers
        .par_iter()
        .map(|&power| {
            let adj = adjacency_matrix(sim, power, args.sign)?;
            Ok(evaluate_power(&adj, power, args.num_bins))
        })
        .collect::<Result<Vec<_>>>()?;

    let report = PowerScanReport {
        fits,
        fit_target: args.fit_target,
    };

    match report.recommended_power() {
        Some(p) => info!("smallest power reaching fit {}: {}", args.fit_target, p),
        None => warn!(
            "no candidate power reaches scale-free fit {}; treat the scan as low-confidence",
            args.fit_target
        ),
    }

    Ok(report)
}

fn evaluate_power(adj: &Mat, power: f32, num_bins: usize) -> PowerFit {
    let nn = adj.nrows();

    // connectivity excludes the conventional unit self-adjacency
    let mut connectivity: Vec<f32> = (0..nn)
        .map(|j| adj.column(j).sum() - adj[(j, j)])
        .collect();

    let mean = connectivity.iter().sum::<f32>() / nn.max(1) as f32;
    let max = connectivity.iter().cloned().fold(0.0_f32, f32::max);
    connectivity.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let median = if nn % 2 == 0 {
        (connectivity[nn / 2 - 1] + connectivity[nn / 2]) / 2.0
    } else {
        connectivity[nn / 2]
    };

    let (fit_index, slope) = scale_free_fit(&connectivity, num_bins);

    PowerFit {
        power,
        fit_index,
        slope,
        mean_connectivity: mean,
        median_connectivity: median,
        max_connectivity: max,
    }
}

/// Sign-corrected R^2 of log10(frequency) vs log10(mean connectivity) over
/// equal-width connectivity bins. Empty bins are dropped; a slope with the
/// wrong (positive) sign flips the fit index negative so such networks are
/// penalized rather than rewarded.
fn scale_free_fit(connectivity: &[f32], num_bins: usize) -> (f32, f32) {
    let kmin = connectivity.iter().cloned().fold(f32::INFINITY, f32::min);
    let kmax = connectivity.iter().cloned().fold(0.0_f32, f32::max);

    if !(kmax > kmin) || kmax <= 0.0 {
        // all connectivities identical; a one-point "distribution" has no fit
        return (0.0, 0.0);
    }

    let width = (kmax - kmin) / num_bins as f32;
    let mut counts = vec![0_usize; num_bins];
    let mut sums = vec![0.0_f32; num_bins];

    for &k in connectivity {
        let b = (((k - kmin) / width) as usize).min(num_bins - 1);
        counts[b] += 1;
        sums[b] += k;
    }

    let mut xs = vec![];
    let mut ys = vec![];
    for b in 0..num_bins {
        if counts[b] == 0 {
            continue;
        }
        let mean_k = sums[b] / counts[b] as f32;
        let freq = counts[b] as f32 / connectivity.len() as f32;
        if mean_k > 0.0 {
            xs.push(mean_k.log10());
            ys.push(freq.log10());
        }
    }

    if xs.len() < 2 {
        return (0.0, 0.0);
    }

    let (slope, r2) = ols_fit(&xs, &ys);
    (-slope.signum() * r2, slope)
}

/// Simple least squares of y on x; returns (slope, R^2).
fn ols_fit(xs: &[f32], ys: &[f32]) -> (f32, f32) {
    let n = xs.len() as f32;
    let mx = xs.iter().sum::<f32>() / n;
    let my = ys.iter().sum::<f32>() / n;

    let sxy: f32 = xs.iter().zip(ys).map(|(&x, &y)| (x - mx) * (y - my)).sum();
    let sxx: f32 = xs.iter().map(|&x| (x - mx) * (x - mx)).sum();
    let syy: f32 = ys.iter().map(|&y| (y - my) * (y - my)).sum();

    if sxx <= 0.0 || syy <= 0.0 {
        return (0.0, 0.0);
    }

    let slope = sxy / sxx;
    let r2 = (sxy * sxy) / (sxx * syy);
    (slope, r2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Block-diagonal similarity: two tight groups, weak background
    fn blocky_similarity(nn: usize) -> Mat {
        let mut sim = Mat::from_element(nn, nn, 0.1);
        let half = nn / 2;
        for i in 0..nn {
            for j in 0..nn {
                if (i < half) == (j < half) {
                    sim[(i, j)] = 0.8;
                }
            }
            sim[(i, i)] = 1.0;
        }
        sim
    }

    #[test]
    fn test_scan_reports_every_power() {
        let sim = blocky_similarity(40);
        let args = PowerScanArgs {
            powers: vec![1.0, 2.0, 4.0, 6.0],
            ..Default::default()
        };
        let report = scan_powers(&sim, &args).unwrap();
        assert_eq!(report.fits.len(), 4);
        for (f, &p) in report.fits.iter().zip(args.powers.iter()) {
            assert_eq!(f.power, p);
            assert!(f.fit_index.abs() <= 1.0 + 1e-6);
            assert!(f.mean_connectivity >= 0.0);
            assert!(f.max_connectivity >= f.mean_connectivity - 1e-4);
        }
    }

    #[test]
    fn test_mean_connectivity_decreases_with_power() {
        let sim = blocky_similarity(40);
        let args = PowerScanArgs {
            powers: vec![1.0, 3.0, 6.0, 9.0],
            sign: SignMode::Unsigned,
            ..Default::default()
        };
        let report = scan_powers(&sim, &args).unwrap();
        for w in report.fits.windows(2) {
            assert!(
                w[1].mean_connectivity <= w[0].mean_connectivity + 1e-4,
                "connectivity must shrink as the power grows"
            );
        }
    }

    #[test]
    fn test_rejects_empty_power_list() {
        let sim = blocky_similarity(10);
        let args = PowerScanArgs {
            powers: vec![],
            ..Default::default()
        };
        assert!(scan_powers(&sim, &args).is_err());
    }

    #[test]
    fn test_rejects_power_below_one() {
        let sim = blocky_similarity(10);
        let args = PowerScanArgs {
            powers: vec![2.0, 0.5],
            ..Default::default()
        };
        let err = scan_powers(&sim, &args).unwrap_err();
        assert!(err.to_string().contains("0.5"));
    }

    #[test]
    fn test_low_confidence_flag() {
        let report = PowerScanReport {
            fits: vec![PowerFit {
                power: 6.0,
                fit_index: 0.4,
                slope: -1.0,
                mean_connectivity: 3.0,
                median_connectivity: 2.5,
                max_connectivity: 8.0,
            }],
            fit_target: 0.9,
        };
        assert!(report.low_confidence());
        assert_eq!(report.recommended_power(), None);
    }

    #[test]
    fn test_recommends_smallest_crossing_power() {
        let fit = |power, fit_index| PowerFit {
            power,
            fit_index,
            slope: -1.2,
            mean_connectivity: 1.0,
            median_connectivity: 1.0,
            max_connectivity: 2.0,
        };
        let report = PowerScanReport {
            fits: vec![fit(2.0, 0.5), fit(4.0, 0.91), fit(6.0, 0.95)],
            fit_target: 0.9,
        };
        assert_eq!(report.recommended_power(), Some(4.0));
        assert!(!report.low_confidence());
    }

    #[test]
    fn test_ols_recovers_line() {
        let xs: Vec<f32> = (1..=10).map(|v| v as f32).collect();
        let ys: Vec<f32> = xs.iter().map(|&x| 3.0 - 2.0 * x).collect();
        let (slope, r2) = ols_fit(&xs, &ys);
        assert_abs_diff_eq!(slope, -2.0, epsilon = 1e-4);
        assert_abs_diff_eq!(r2, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_default_power_grid() {
        let powers = default_powers();
        assert_eq!(powers.first(), Some(&1.0));
        assert_eq!(powers.last(), Some(&20.0));
        assert_eq!(powers.len(), 15);
    }
}
