mod common;
mod input;
mod run_modules;
mod run_scan;
mod run_sim;

use crate::run_modules::*;
use crate::run_scan::*;
use crate::run_sim::*;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "LUPIN",
    long_about = "Weighted gene co-expression networks from clean expression tables:\n\
		  robust correlation, soft-threshold selection, topological overlap,\n\
		  hierarchical clustering, and dynamic module detection.\n\
		  Expression input is TSV (optionally gzipped), genes x samples."
)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Scan candidate soft-threshold powers",
        long_about = "Score each candidate power by the scale-free topology fit of the\n\
		      resulting network and its mean connectivity. The scan only\n\
		      informs the choice of power; it does not make it.",
        visible_alias = "scan"
    )]
    ScanPowers(ScanArgs),

    #[command(
        about = "Build the network and detect co-expression modules",
        long_about = "Run the full pipeline at a chosen power:\n\
		      (1) robust pairwise correlation\n\
		      (2) soft-threshold adjacency and topological overlap\n\
		      (3) average-linkage clustering\n\
		      (4) dynamic branch cuts, one per deep-split level.\n",
        visible_alias = "modules"
    )]
    DetectModules(ModuleArgs),

    /// Simulate modular expression data with planted ground truth
    Simulate(SimArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.commands {
        Commands::ScanPowers(args) => {
            run_scan_powers(args)?;
        }
        Commands::DetectModules(args) => {
            run_detect_modules(args)?;
        }
        Commands::Simulate(args) => {
            run_simulate(args)?;
        }
    }

    Ok(())
}
