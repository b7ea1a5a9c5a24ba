use crate::common::*;
use crate::input::read_expression_tsv;

use lupin_net::common_io::write_lines;
use lupin_net::{
    adjacency_matrix, average_linkage, similarity_matrix, sweep_deep_split, tom_dissimilarity,
    DynamicCutArgs,
};

use clap::Parser;

#[derive(Parser, Debug, Clone)]
pub struct ModuleArgs {
    /// expression matrix: TSV (optionally gzipped) with a header line and
    /// gene identifiers in the first column. This should be the clean,
    /// normalized output of the upstream filtering pipeline.
    #[arg(required = true)]
    data_file: Box<str>,

    /// chosen soft-threshold power (pick it from `scan-powers`)
    #[arg(long, short = 'b', required = true)]
    power: f32,

    /// network sign convention
    #[arg(long, value_enum, default_value_t = SignOpt::Signed)]
    sign: SignOpt,

    /// pairwise correlation statistic
    #[arg(long, value_enum, default_value_t = CorrOpt::Bicor)]
    correlation: CorrOpt,

    /// smallest admissible module
    #[arg(long, default_value_t = 30)]
    min_module_size: usize,

    /// merges above this dissimilarity never join modules
    #[arg(long, default_value_t = 0.99)]
    cut_height: f32,

    /// deep-split sensitivity levels to sweep (comma-separated, 0..=3)
    #[arg(long, value_delimiter(','), default_values_t = vec![0, 1, 2, 3])]
    deep_split: Vec<u8>,

    /// row block size for the topological overlap stage
    #[arg(long, default_value_t = 500)]
    block_size: usize,

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

/// Run the full network pipeline and write per-deep-split module labels
/// plus the dendrogram merge table for external rendering.
pub fn run_detect_modules(args: &ModuleArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    setup_thread_pool(args.max_threads)?;

    let expr = read_expression_tsv(&args.data_file)?;

    info!("computing pairwise similarity...");
    let sim = similarity_matrix(&expr, args.correlation.into())?;

    info!("building adjacency at power {}...", args.power);
    let adj = adjacency_matrix(&sim, args.power, args.sign.into())?;
    drop(sim);

    info!("computing topological overlap...");
    let dissim = tom_dissimilarity(&adj, args.block_size)?;
    drop(adj);

    info!("clustering...");
    let tree = average_linkage(&dissim)?;
    drop(dissim);

    info!("cutting the dendrogram at {} sensitivity level(s)...", args.deep_split.len());
    let sweep = sweep_deep_split(
        &tree,
        &DynamicCutArgs {
            min_cluster_size: args.min_module_size,
            cut_height: args.cut_height,
            deep_split: 0,
        },
        &args.deep_split,
    )?;

    for (level, assignment) in sweep.iter() {
        info!(
            "deep_split {}: {} modules",
            level,
            assignment.num_modules()
        );
    }

    // gene x deep-split label table
    let header = std::iter::once("#gene".to_string())
        .chain(sweep.iter().map(|(level, _)| format!("ds{}", level)))
        .collect::<Vec<_>>()
        .join("\t");
    let mut table = vec![header];
    for (g, gene) in expr.gene_names().iter().enumerate() {
        let row = std::iter::once(gene.to_string())
            .chain(sweep.iter().map(|(_, a)| a.label(g).to_string()))
            .collect::<Vec<_>>()
            .join("\t");
        table.push(row);
    }
    write_lines(&table, &format!("{}.modules.tsv", args.out))?;

    // merge table; leaves are negative one-based, merges positive one-based
    let mut merges = vec!["#merge\tleft\tright\theight\tsize".to_string()];
    for (m, merge) in tree.merges().iter().enumerate() {
        merges.push(format!(
            "{}\t{}\t{}\t{:.6}\t{}",
            m + 1,
            merge.left.encode(),
            merge.right.encode(),
            merge.height,
            merge.size
        ));
    }
    write_lines(&merges, &format!("{}.dendrogram.tsv", args.out))?;

    info!("Done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lupin_net::cut_dendrogram;

    #[test]
    fn test_single_level_cut_matches_sweep() {
        // the sweep is one independent cut per level; spot-check against a
        // direct single cut on a tiny simulated data set
        let sim_args = lupin_net::simulate::SimulateArgs {
            num_modules: 2,
            genes_per_module: 6,
            num_background: 2,
            num_samples: 30,
            noise_level: 0.2,
            seed: 17,
        };
        let data = lupin_net::simulate::simulate_modular_expression(&sim_args).unwrap();
        let sim = similarity_matrix(&data.expression, lupin_net::CorrelationMethod::Bicor).unwrap();
        let adj = adjacency_matrix(&sim, 6.0, lupin_net::SignMode::Signed).unwrap();
        let dissim = tom_dissimilarity(&adj, 0).unwrap();
        let tree = average_linkage(&dissim).unwrap();

        let base = DynamicCutArgs {
            min_cluster_size: 4,
            cut_height: 0.99,
            deep_split: 0,
        };
        let sweep = sweep_deep_split(&tree, &base, &[2]).unwrap();
        let direct = cut_dendrogram(
            &tree,
            &DynamicCutArgs {
                deep_split: 2,
                ..base
            },
        )
        .unwrap();

        assert_eq!(sweep.len(), 1);
        assert_eq!(sweep[0].0, 2);
        assert_eq!(sweep[0].1.labels(), direct.labels());
    }
}
