use std::process;

use clap::Parser;

#[macro_use]
extern crate log;

/// Parse command line arguments and run the pileup engine.
fn main() {
    // ----------------------------- Run CLI Parser
    let cli = parser::Cli::parse();

    // ----------------------------- Init logger.
    if let Err(e) = logger::init_logger(cli.verbose + u8::from(!cli.quiet)) {
        eprintln!("Failed to initialize logger: {e}");
        process::exit(1);
    }

    // ----------------------------- Run the engine.
    match snp_pileup::run(&cli) {
        Ok(summary) => {
            info!(
                "{} locus/loci genotyped across {} worker(s)",
                summary.retained_snps, summary.workers
            );
        }
        Err(e) => {
            error!("{e:?}");
            process::exit(1);
        }
    };
}
