mod error;
pub use error::ConfigError;

use std::path::PathBuf;

use cellpile_io::OutputPaths;
use genome::SnpSet;

/// Ceiling on the file descriptors a run may keep open simultaneously.
/// Every worker holds one handle per input plus its five outputs.
pub const TP_MAX_OPEN: usize = 1024;

/// Per-locus depth caps above `1M / n_inputs` only cost memory without
/// improving calls; requesting one logs a warning.
pub const DEPTH_WARN_CEILING: u32 = 1_000_000;

/// How reads are assigned to output columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    /// Group key is the per-read cell-tag value, looked up in the barcode panel.
    Barcodes,
    /// Group key is the index of the input file the read came from.
    SampleIds,
}

/// Read- and event-level filter parameters, expressed on raw SAM flag bits.
#[derive(Debug, Clone)]
pub struct FilterParams {
    pub min_mapq     : u8,
    pub min_len      : u32,
    /// Reads carrying any of these bits are rejected.
    pub rflag_filter : u16,
    /// Reads must carry all of these bits.
    pub rflag_require: u16,
    /// Reject paired reads that are not in a proper pair.
    pub no_orphan    : bool,
    /// Per-locus read retention cap. 0 = unlimited.
    pub plp_max_depth: u32,
}

/// Locus-retention thresholds.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub min_count: u32,
    pub min_maf  : f64,
}

/// Immutable run configuration, shared read-only across every worker.
#[derive(Debug)]
pub struct PileupConfig {
    /// Ordered input alignment files. Order defines the column order in
    /// sample-id mode.
    pub inputs       : Vec<PathBuf>,
    pub sample_mode  : SampleMode,
    /// Ordered group names (barcodes or sample IDs); one output column each.
    pub groups       : Vec<String>,
    /// Candidate loci. Empty = de-novo mode (every covered locus is a candidate).
    pub snps         : SnpSet,
    /// Chromosomes to process, in processing (and output) order.
    pub chroms       : Vec<String>,
    /// Cell-tag name in barcode mode.
    pub cell_tag     : Option<[u8; 2]>,
    /// UMI-tag name when deduplication is active.
    pub umi_tag      : Option<[u8; 2]>,
    pub filters      : FilterParams,
    pub thresholds   : Thresholds,
    pub emit_genotype: bool,
    pub double_gl    : bool,
    pub gzip         : bool,
    pub n_workers    : usize,
    pub paths        : OutputPaths,
}

impl PileupConfig {
    /// De-novo mode: no SNP list, every covered locus is a candidate.
    #[must_use]
    pub fn denovo(&self) -> bool {
        self.snps.is_empty()
    }

    /// Worker count actually used: bounded by the requested parallelism, the
    /// number of chromosomes, and the open-fd ceiling.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        let fd_bound = TP_MAX_OPEN / (self.inputs.len() + 6);
        self.n_workers
            .min(self.chroms.len())
            .min(fd_bound.max(1))
            .max(1)
    }

    /// Sanity-check the assembled configuration before any file is touched.
    ///
    /// # Errors
    /// The first violated [`ConfigError`] rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inputs.is_empty() {
            return Err(ConfigError::NoInputs);
        }
        if self.groups.is_empty() {
            return Err(ConfigError::NoGroups);
        }
        if self.chroms.is_empty() {
            return Err(ConfigError::NoChromosomes);
        }
        if self.sample_mode == SampleMode::SampleIds && self.groups.len() != self.inputs.len() {
            return Err(ConfigError::GroupInputMismatch {
                groups: self.groups.len(),
                inputs: self.inputs.len(),
            });
        }
        if self.sample_mode == SampleMode::Barcodes && self.cell_tag.is_none() {
            return Err(ConfigError::MissingCellTag);
        }
        Ok(())
    }
}
