use crate::error::{NetworkError, Result};
use crate::expression::{ExpressionMatrix, MIN_SAMPLES};
use crate::Mat;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Settings for synthetic modular expression data.
#[derive(Debug, Clone)]
pub struct SimulateArgs {
    /// Number of planted co-expression modules
    pub num_modules: usize,
    /// Genes per planted module
    pub genes_per_module: usize,
    /// Additional background genes with no shared factor
    pub num_background: usize,
    pub num_samples: usize,
    /// Standard deviation of the per-gene additive noise
    pub noise_level: f32,
    pub seed: u64,
}

impl Default for SimulateArgs {
    fn default() -> Self {
        Self {
            num_modules: 3,
            genes_per_module: 30,
            num_background: 20,
            num_samples: 40,
            noise_level: 0.3,
            seed: 13,
        }
    }
}

/// Synthetic data plus the planted ground truth (0 = background,
/// 1..=num_modules = planted module).
pub struct SimulatedExpression {
    pub expression: ExpressionMatrix,
    pub truth: Vec<usize>,
}

/// Draw a latent-factor expression matrix with planted modules.
///
/// Each module is driven by one standard-normal factor per sample; member
/// genes load on their factor with a random positive loading plus Gaussian
/// noise. Background genes are pure noise. Deterministic for a fixed seed.
pub fn simulate_modular_expression(args: &SimulateArgs) -> Result<SimulatedExpression> {
    const STAGE: &str = "simulate";

    let num_genes = args.num_modules * args.genes_per_module + args.num_background;
    if num_genes < 2 {
        return Err(NetworkError::parameter(
            STAGE,
            "need at least two genes in total",
        ));
    }
    if args.num_samples < MIN_SAMPLES {
        return Err(NetworkError::parameter(
            STAGE,
            format!("{} samples, need at least {}", args.num_samples, MIN_SAMPLES),
        ));
    }
    if !(args.noise_level >= 0.0 && args.noise_level.is_finite()) {
        return Err(NetworkError::parameter(
            STAGE,
            format!("noise_level {} must be finite and non-negative", args.noise_level),
        ));
    }

    let mut rng = StdRng::seed_from_u64(args.seed);
    let ss = args.num_samples;

    let factors: Vec<Vec<f32>> = (0..args.num_modules)
        .map(|_| (0..ss).map(|_| rng.sample::<f32, _>(StandardNormal)).collect())
        .collect();

    let mut data = Mat::zeros(num_genes, ss);
    let mut truth = vec![0_usize; num_genes];

    for g in 0..num_genes {
        let module = if g < args.num_modules * args.genes_per_module {
            Some(g / args.genes_per_module)
        } else {
            None
        };
        truth[g] = module.map(|k| k + 1).unwrap_or(0);

        let loading = module.map(|_| rng.random_range(0.6..1.0_f32));
        for s in 0..ss {
            let noise: f32 = rng.sample::<f32, _>(StandardNormal);
            data[(g, s)] = match (module, loading) {
                (Some(k), Some(w)) => w * factors[k][s] + args.noise_level * noise,
                _ => noise,
            };
        }
    }

    let gene_names = (0..num_genes)
        .map(|g| format!("gene_{:04}", g).into_boxed_str())
        .collect();

    Ok(SimulatedExpression {
        expression: ExpressionMatrix::new(data, gene_names)?,
        truth,
    })
}
