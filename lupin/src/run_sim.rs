use crate::common::*;

use lupin_net::common_io::write_lines;
use lupin_net::simulate::{simulate_modular_expression, SimulateArgs};

use clap::Parser;

#[derive(Parser, Debug, Clone)]
pub struct SimArgs {
    /// number of planted co-expression modules
    #[arg(long, short = 'k', default_value_t = 3)]
    num_modules: usize,

    /// genes per planted module
    #[arg(long, short = 'g', default_value_t = 30)]
    genes_per_module: usize,

    /// background genes with no shared factor
    #[arg(long, default_value_t = 20)]
    num_background: usize,

    /// number of samples
    #[arg(long, short = 'n', default_value_t = 40)]
    num_samples: usize,

    /// standard deviation of the additive noise
    #[arg(long, default_value_t = 0.3)]
    noise_level: f32,

    /// random seed
    #[arg(long, default_value_t = 13)]
    seed: u64,

    /// output file prefix
    #[arg(long, short, required = true)]
    out: Box<str>,

    /// verbosity
    #[arg(long, short)]
    verbose: bool,
}

/// Write a synthetic expression table plus its planted module labels.
pub fn run_simulate(args: &SimArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let data = simulate_modular_expression(&SimulateArgs {
        num_modules: args.num_modules,
        genes_per_module: args.genes_per_module,
        num_background: args.num_background,
        num_samples: args.num_samples,
        noise_level: args.noise_level,
        seed: args.seed,
    })?;

    let expr = &data.expression;

    let header = std::iter::once("gene".to_string())
        .chain((0..expr.num_samples()).map(|s| format!("s{}", s + 1)))
        .collect::<Vec<_>>()
        .join("\t");
    let mut table = vec![header];
    for (g, gene) in expr.gene_names().iter().enumerate() {
        let row = std::iter::once(gene.to_string())
            .chain((0..expr.num_samples()).map(|s| format!("{:.6}", expr.data()[(g, s)])))
            .collect::<Vec<_>>()
            .join("\t");
        table.push(row);
    }
    write_lines(&table, &format!("{}.expression.tsv", args.out))?;

    let mut truth = vec!["#gene\tmodule".to_string()];
    for (gene, &label) in expr.gene_names().iter().zip(data.truth.iter()) {
        truth.push(format!("{}\t{}", gene, label));
    }
    write_lines(&truth, &format!("{}.truth.tsv", args.out))?;

    info!(
        "simulated {} genes x {} samples with {} planted modules",
        expr.num_genes(),
        expr.num_samples(),
        args.num_modules
    );

    info!("Done");
    Ok(())
}
