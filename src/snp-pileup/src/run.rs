use std::path::{Path, PathBuf};

use ahash::AHashSet;
use anyhow::{Context, Result};
use log::{info, warn};
use rust_htslib::bam::{self, Read};

use cellpile_io::read::{read_barcodes, SnpReader};
use cellpile_io::{prepare_output_dir, OutputPaths};
use genome::SnpSet;
use parser::{Cli, UmiMode};

use crate::config::{ConfigError, FilterParams, PileupConfig, SampleMode, Thresholds, DEPTH_WARN_CEILING};
use crate::shard::{run_sharded, RunSummary};

/// Assemble the engine configuration from the parsed command line and run the
/// full pileup.
///
/// # Errors
/// Configuration errors (bad arguments, unknown chromosomes, unreadable
/// panels) and any error propagated by the shard manager.
pub fn run(cli: &Cli) -> Result<RunSummary> {
    cli.validate()?;
    cli.serialize();

    // ----------------------------- Resolve the grouping mode
    let (sample_mode, groups, cell_tag) = match &cli.barcodes {
        Some(panel) => {
            let groups = read_barcodes(panel)?;
            (SampleMode::Barcodes, groups, Some(tag_bytes(&cli.cell_tag)?))
        }
        None => {
            let groups = match &cli.sample_ids {
                Some(ids) => ids.clone(),
                None => cli
                    .bams
                    .iter()
                    .map(|path| sample_name_from_path(path))
                    .collect::<Result<Vec<String>>>()?,
            };
            info!("Sample-id mode: one output column per input file ({})", groups.join(", "));
            (SampleMode::SampleIds, groups, None)
        }
    };

    // ----------------------------- Resolve UMI handling
    let umi_tag = match cli.umi_mode()? {
        UmiMode::Auto     => (sample_mode == SampleMode::Barcodes).then_some(*b"UB"),
        UmiMode::None     => None,
        UmiMode::Tag(tag) => Some(tag_bytes(&tag)?),
    };
    match umi_tag {
        Some(tag) => info!("UMI deduplication active (tag {})", String::from_utf8_lossy(&tag)),
        None      => info!("UMI deduplication disabled"),
    }

    // ----------------------------- Parse the candidate loci
    let snps = match &cli.snps {
        Some(path) => {
            info!("Parsing candidate SNP list {}", path.display());
            let set = SnpReader::new(path, cli.nproc)?.read_snp_set()?;
            if set.is_empty() {
                return Err(ConfigError::EmptySnpList(path.display().to_string()).into());
            }
            set
        }
        None => {
            info!("No SNP list provided: de-novo mode, alleles are inferred at every covered locus");
            SnpSet::new()
        }
    };

    // ----------------------------- Resolve the chromosome set
    let mut chroms = match &cli.chroms {
        Some(list) => list.clone(),
        None       => snps.chroms().to_vec(),
    };
    let mut seen = AHashSet::new();
    chroms.retain(|chrom| seen.insert(chrom.clone()));
    if chroms.is_empty() {
        return Err(ConfigError::NoChromosomes.into());
    }
    info!("Chromosomes to process: {chroms:?}");
    verify_chromosomes(&cli.bams, &chroms)?;

    // ----------------------------- Filters and thresholds
    if cli.filters.max_depth > 0 && cli.filters.max_depth > DEPTH_WARN_CEILING / cli.bams.len() as u32 {
        warn!(
            "--max-depth {} exceeds {} / {} input file(s); expect high memory use",
            cli.filters.max_depth,
            DEPTH_WARN_CEILING,
            cli.bams.len()
        );
    }
    let filters = FilterParams {
        min_mapq     : cli.filters.min_mapq,
        min_len      : cli.filters.min_len,
        rflag_filter : cli.rflag_filter(umi_tag.is_some())?,
        rflag_require: cli.rflag_require()?,
        no_orphan    : !cli.filters.count_orphans,
        plp_max_depth: cli.filters.max_depth,
    };
    let thresholds = Thresholds {
        min_count: cli.thresholds.min_count,
        min_maf  : cli.thresholds.min_maf,
    };

    // ----------------------------- Prepare outputs and go
    prepare_output_dir(&cli.out_dir)?;
    let config = PileupConfig {
        inputs       : cli.bams.clone(),
        sample_mode,
        groups,
        snps,
        chroms,
        cell_tag,
        umi_tag,
        filters,
        thresholds,
        emit_genotype: cli.genotype,
        double_gl    : cli.doublet_gl,
        gzip         : cli.gzip,
        n_workers    : cli.nproc,
        paths        : OutputPaths::new(&cli.out_dir, cli.gzip),
    };
    run_sharded(&config)
}

/// Every configured chromosome must resolve in every input's header; the
/// first input's `tid -> name` mapping is otherwise authoritative.
fn verify_chromosomes(inputs: &[PathBuf], chroms: &[String]) -> Result<()> {
    for path in inputs {
        let reader = bam::Reader::from_path(path)
            .with_context(|| format!("Failed to open alignment file {}", path.display()))?;
        let header = reader.header();
        for chrom in chroms {
            if header.tid(chrom.as_bytes()).is_none() {
                return Err(ConfigError::UnknownChromosome {
                    chrom: chrom.clone(),
                    path : path.display().to_string(),
                }
                .into());
            }
        }
    }
    Ok(())
}

fn sample_name_from_path(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .with_context(|| format!("Cannot derive a sample name from {}", path.display()))
}

fn tag_bytes(tag: &str) -> Result<[u8; 2]> {
    tag.as_bytes()
        .try_into()
        .ok()
        .with_context(|| format!("Auxiliary tag '{tag}' is not two characters"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_names_from_stems() {
        assert_eq!(sample_name_from_path(Path::new("data/s0.bam")).unwrap(), "s0");
        assert_eq!(sample_name_from_path(Path::new("s1.sorted.bam")).unwrap(), "s1.sorted");
    }

    #[test]
    fn tag_conversion() {
        assert_eq!(tag_bytes("CB").unwrap(), *b"CB");
        assert!(tag_bytes("LONG").is_err());
    }
}
