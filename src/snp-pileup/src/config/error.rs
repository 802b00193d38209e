use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No input alignment file was provided")]
    NoInputs,

    #[error("No group (barcode or sample) was provided")]
    NoGroups,

    #[error("No chromosome to process: provide --chroms or a SNP list carrying loci")]
    NoChromosomes,

    #[error("{groups} group name(s) for {inputs} input file(s) in sample-id mode")]
    GroupInputMismatch { groups: usize, inputs: usize },

    #[error("Barcode mode requires a cell tag")]
    MissingCellTag,

    #[error("Chromosome '{chrom}' is absent from the header of '{path}'")]
    UnknownChromosome { chrom: String, path: String },

    #[error("SNP list '{0}' contains no usable locus")]
    EmptySnpList(String),
}
