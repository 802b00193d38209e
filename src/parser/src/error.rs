use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Invalid SAM flag specification '{0}'. Expected a decimal, hex (0x..), octal (0..) integer, or comma-separated flag names")]
    InvalidFlagString(String),

    #[error("No alignment file was provided")]
    EmptyInputs,

    #[error("Duplicate alignment file '{}'", .0.display())]
    DuplicateInput(PathBuf),

    #[error("--sample-ids lists {got} name(s) for {expected} alignment file(s)")]
    SampleCountMismatch { expected: usize, got: usize },

    #[error("--barcodes and --sample-ids are mutually exclusive")]
    AmbiguousSampleMode,

    #[error("--min-maf must lie within [0, 1] (got {0})")]
    InvalidMaf(f64),

    #[error("--nproc must be at least 1")]
    InvalidWorkerCount,

    #[error("Invalid --umi-tag '{0}'. Expected 'Auto', 'None', or a two-character tag name")]
    InvalidUmiTag(String),

    #[error("Invalid --cell-tag '{0}'. Expected a two-character tag name")]
    InvalidCellTag(String),
}
