#![allow(dead_code)]

pub use log::{info, warn};

pub use lupin_net::Mat;

use clap::ValueEnum;
use lupin_net::{CorrelationMethod, SignMode};

/// Network sign convention, as a command-line option.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
#[clap(rename_all = "lowercase")]
pub enum SignOpt {
    Signed,
    Unsigned,
}

impl From<SignOpt> for SignMode {
    fn from(opt: SignOpt) -> Self {
        match opt {
            SignOpt::Signed => SignMode::Signed,
            SignOpt::Unsigned => SignMode::Unsigned,
        }
    }
}

/// Pairwise correlation statistic, as a command-line option.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
#[clap(rename_all = "lowercase")]
pub enum CorrOpt {
    Bicor,
    Pearson,
}

impl From<CorrOpt> for CorrelationMethod {
    fn from(opt: CorrOpt) -> Self {
        match opt {
            CorrOpt::Bicor => CorrelationMethod::Bicor,
            CorrOpt::Pearson => CorrelationMethod::Pearson,
        }
    }
}

/// Cap the global rayon pool and report the effective size.
pub fn setup_thread_pool(max_threads: usize) -> anyhow::Result<()> {
    let num_threads = num_cpus::get().min(max_threads.max(1));

    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    info!("will use {} threads", rayon::current_num_threads());
    Ok(())
}
