use std::collections::HashSet;
use std::path::PathBuf;

use clap::{Args, Parser};
use log::info;
use serde::Serialize;

use crate::{parse_flag_string, ParserError};

/// Default read-exclusion mask when UMIs are in use: UNMAP | SECONDARY | QCFAIL
pub const DEFAULT_EXCL_FLAG_UMI: u16 = 772;
/// Default read-exclusion mask without UMIs: additionally DUP
pub const DEFAULT_EXCL_FLAG_NO_UMI: u16 = 1796;

/// Resolved UMI handling mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UmiMode {
    /// `UB` in barcode mode, disabled in sample-id mode.
    Auto,
    /// Deduplication disabled.
    None,
    /// Explicit two-character auxiliary tag.
    Tag(String),
}

/// Genotype known (or de-novo) SNP loci across one or more indexed
/// alignment files, aggregating allele counts per cell barcode or per
/// input sample.
#[derive(Parser, Debug, Serialize)]
#[clap(name = "cellpile", version, about)]
pub struct Cli {
    /// Set the verbosity level (-v -vv -vvv)
    ///
    /// Set the verbosity level of this program. With multiple levels
    ///    -v : Info  |  -vv : Debug  | -vvv : Trace
    /// By default, the program will still output Warnings. Use --quiet/-q to disable them.
    #[clap(short = 'v', long, parse(from_occurrences))]
    pub verbose: u8,

    /// Disable warnings.
    ///
    /// By default, warnings are emitted and redirected to the console, even without
    /// verbose mode on. Use this argument to disable this. Only errors will be displayed.
    #[clap(short = 'q', long)]
    pub quiet: bool,

    /// Input alignment file(s) (indexed BAM), comma-separated.
    ///
    /// With --barcodes, a single file is the usual case and read groups are
    /// taken from the per-read cell tag. Without --barcodes, every file is
    /// one sample and contributes one output column.
    #[clap(short = 'b', long, required(true), use_value_delimiter(true))]
    pub bams: Vec<PathBuf>,

    /// File listing the cell barcodes to genotype (one barcode per line).
    ///
    /// Switches the engine to barcode mode: each read is assigned to the
    /// column of its cell-tag value; reads carrying unlisted barcodes are
    /// ignored.
    #[clap(short = 'B', long)]
    pub barcodes: Option<PathBuf>,

    /// Comma-separated sample names, one per alignment file.
    ///
    /// Only meaningful without --barcodes. Defaults to the alignment file
    /// stems.
    #[clap(short = 'i', long, use_value_delimiter(true))]
    pub sample_ids: Option<Vec<String>>,

    /// Candidate SNP list ('.vcf[.gz]', '.tsv', '.csv' or '.txt').
    ///
    /// Loci absent from this list are skipped. When omitted, every covered
    /// locus is a candidate and alleles are always inferred (de-novo mode);
    /// --chroms is then required.
    #[clap(short = 's', long)]
    pub snps: Option<PathBuf>,

    /// Restrict processing to these chromosomes (comma-separated).
    ///
    /// Defaults to the chromosomes present in the SNP list.
    #[clap(short = 'c', long, use_value_delimiter(true))]
    pub chroms: Option<Vec<String>>,

    /// Auxiliary tag carrying the cell barcode.
    #[clap(long, default_value("CB"))]
    pub cell_tag: String,

    /// Auxiliary tag carrying the UMI ('Auto', 'None', or a tag name).
    ///
    /// 'Auto' resolves to 'UB' in barcode mode and disables deduplication in
    /// sample-id mode.
    #[clap(long, default_value("Auto"))]
    pub umi_tag: String,

    #[clap(flatten)]
    #[serde(flatten)]
    pub filters: FilterArgs,

    #[clap(flatten)]
    #[serde(flatten)]
    pub thresholds: ThresholdArgs,

    /// Emit per-group genotypes and likelihoods in the variant output.
    #[clap(long)]
    pub genotype: bool,

    /// Emit ten genotype likelihoods instead of three (adds non-ref het models).
    #[clap(long)]
    pub doublet_gl: bool,

    /// Compress the variant output with gzip.
    #[clap(long)]
    pub gzip: bool,

    /// Number of parallel workers.
    #[clap(short = 'p', long, default_value("1"))]
    pub nproc: usize,

    /// Output directory (created if missing).
    #[clap(short = 'O', long)]
    pub out_dir: PathBuf,
}

/// Read- and event-level filters.
#[derive(Args, Debug, Serialize)]
pub struct FilterArgs {
    /// Minimal required mapping quality (MAPQ) of a read.
    #[clap(long, default_value("20"))]
    pub min_mapq: u8,

    /// Minimal aligned length of a read (sum of M/=/X CIGAR operations).
    #[clap(long, default_value("30"))]
    pub min_len: u32,

    /// Reads carrying any of these SAM flag bits are rejected.
    ///
    /// Accepts decimal, hex (0x..), octal (0..) or comma-separated flag names,
    /// e.g. 'UNMAP,SECONDARY,QCFAIL'. Defaults to 772, or 1796 when UMI
    /// deduplication is off (DUP is then also rejected).
    #[clap(long)]
    pub excl_flag: Option<String>,

    /// Reads must carry all of these SAM flag bits.
    #[clap(long, default_value("0"))]
    pub incl_flag: String,

    /// Count orphan reads (paired but not in proper pair).
    #[clap(long)]
    pub count_orphans: bool,

    /// Per-locus read cap handed to the pileup engine (0 = unlimited).
    #[clap(long, default_value("0"))]
    pub max_depth: u32,
}

/// Locus-retention thresholds.
#[derive(Args, Debug, Serialize)]
pub struct ThresholdArgs {
    /// Minimal aggregated base count (UMIs when deduplicating) to retain a locus.
    #[clap(long, default_value("20"))]
    pub min_count: u32,

    /// Minimal minor-allele fraction to retain a locus.
    #[clap(long, default_value("0.0"))]
    pub min_maf: f64,
}

impl Cli {
    /// Log the full invocation as YAML.
    pub fn serialize(&self) {
        match serde_yaml::to_string(&self) {
            Ok(serialized) => info!("\n---- Command line args ----\n{serialized}\n---"),
            Err(e)         => info!("Failed to serialize command line arguments: {e}"),
        }
    }

    /// Resolve the requested UMI handling mode.
    ///
    /// # Errors
    /// [`ParserError::InvalidUmiTag`] on a tag that is not two characters.
    pub fn umi_mode(&self) -> Result<UmiMode, ParserError> {
        match self.umi_tag.as_str() {
            "Auto" | "auto" => Ok(UmiMode::Auto),
            "None" | "none" => Ok(UmiMode::None),
            tag if tag.len() == 2 && tag.is_ascii() => Ok(UmiMode::Tag(tag.to_string())),
            tag => Err(ParserError::InvalidUmiTag(tag.to_string())),
        }
    }

    /// Resolve the read-exclusion mask, defaulting on whether UMIs are in use.
    ///
    /// # Errors
    /// [`ParserError::InvalidFlagString`] on an unparseable --excl-flag.
    pub fn rflag_filter(&self, umi_in_use: bool) -> Result<u16, ParserError> {
        match &self.filters.excl_flag {
            Some(spec) => parse_flag_string(spec),
            None if umi_in_use => Ok(DEFAULT_EXCL_FLAG_UMI),
            None               => Ok(DEFAULT_EXCL_FLAG_NO_UMI),
        }
    }

    /// Resolve the read-requirement mask.
    ///
    /// # Errors
    /// [`ParserError::InvalidFlagString`] on an unparseable --incl-flag.
    pub fn rflag_require(&self) -> Result<u16, ParserError> {
        parse_flag_string(&self.filters.incl_flag)
    }

    /// Sanity-check argument arity and ranges before any file is touched.
    ///
    /// # Errors
    /// The first violated [`ParserError`] rule.
    pub fn validate(&self) -> Result<(), ParserError> {
        if self.bams.is_empty() {
            return Err(ParserError::EmptyInputs);
        }
        let mut seen = HashSet::new();
        for bam in &self.bams {
            if !seen.insert(bam) {
                return Err(ParserError::DuplicateInput(bam.clone()));
            }
        }
        if self.barcodes.is_some() && self.sample_ids.is_some() {
            return Err(ParserError::AmbiguousSampleMode);
        }
        if let Some(ids) = &self.sample_ids {
            if ids.len() != self.bams.len() {
                return Err(ParserError::SampleCountMismatch { expected: self.bams.len(), got: ids.len() });
            }
        }
        if !(0.0..=1.0).contains(&self.thresholds.min_maf) {
            return Err(ParserError::InvalidMaf(self.thresholds.min_maf));
        }
        if self.nproc == 0 {
            return Err(ParserError::InvalidWorkerCount);
        }
        if self.cell_tag.len() != 2 || !self.cell_tag.is_ascii() {
            return Err(ParserError::InvalidCellTag(self.cell_tag.clone()));
        }
        self.umi_mode()?;
        self.rflag_require()?;
        Ok(())
    }
}
