use crate::common::*;
use crate::input::read_expression_tsv;

use lupin_net::common_io::write_lines;
use lupin_net::soft_threshold::default_powers;
use lupin_net::{scan_powers, similarity_matrix, PowerScanArgs};

use clap::Parser;

#[derive(Parser, Debug, Clone)]
pub struct ScanArgs {
    /// expression matrix: TSV (optionally gzipped) with a header line and
    /// gene identifiers in the first column. This should be the clean,
    /// normalized output of the upstream filtering pipeline.
    #[arg(required = true)]
    data_file: Box<str>,

    /// candidate soft-threshold powers (comma-separated, each >= 1);
    /// defaults to 1..10 plus even powers up to 20
    #[arg(long, short = 'p', value_delimiter(','))]
    powers: Option<Vec<f32>>,

    /// network sign convention
    #[arg(long, value_enum, default_value_t = SignOpt::Signed)]
    sign: SignOpt,

    /// pairwise correlation statistic
    #[arg(long, value_enum, default_value_t = CorrOpt::Bicor)]
    correlation: CorrOpt,

    /// connectivity histogram bins for the scale-free fit
    #[arg(long, default_value_t = 10)]
    num_bins: usize,

    /// scale-free fit index a power should reach
    #[arg(long, default_value_t = 0.9)]
    fit_target: f32,

    /// maximum number of threads for parallel processing
    #[arg(long, default_value_t = 16)]
    max_threads: usize,

    /// output file prefix
    #[arg(long, short, required = true)]
    out: Box<str>,

    /// verbosity
    #[arg(long, short)]
    verbose: bool,
}

/// Score every candidate power and write the scan table; choosing the power
/// stays with the analyst.
pub fn run_scan_powers(args: &ScanArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    setup_thread_pool(args.max_threads)?;

    let expr = read_expression_tsv(&args.data_file)?;

    info!("computing pairwise similarity...");
    let sim = similarity_matrix(&expr, args.correlation.into())?;

    info!("scanning candidate powers...");
    let report = scan_powers(
        &sim,
        &PowerScanArgs {
            powers: args.powers.clone().unwrap_or_else(default_powers),
            sign: args.sign.into(),
            num_bins: args.num_bins,
            fit_target: args.fit_target,
        },
    )?;

    let mut table = vec![
        "#power\tfit_index\tslope\tmean_connectivity\tmedian_connectivity\tmax_connectivity"
            .to_string(),
    ];
    for fit in report.fits.iter() {
        table.push(format!(
            "{}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{:.4}",
            fit.power,
            fit.fit_index,
            fit.slope,
            fit.mean_connectivity,
            fit.median_connectivity,
            fit.max_connectivity
        ));
    }
    write_lines(&table, &format!("{}.power_scan.tsv", args.out))?;

    let json = serde_json::to_string_pretty(&report)?;
    write_lines(&[json], &format!("{}.power_scan.json", args.out))?;

    match report.recommended_power() {
        Some(p) => info!("suggested power (external choice still applies): {}", p),
        None => warn!("low-confidence scan: no power reached fit {}", args.fit_target),
    }

    info!("Done");
    Ok(())
}
