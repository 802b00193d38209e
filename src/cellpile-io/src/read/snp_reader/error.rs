use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnpReaderError {
    #[error("Cannot handle SNP list file format '.{0}'. Accepted: .vcf[.gz] .tsv .csv .txt")]
    InvalidFileFormat(String),

    #[error("Record at line {line} carries {found} field(s), fewer than its format requires")]
    MissingField { line: usize, found: usize },

    #[error("Record at line {line} carries an invalid position (expected a 1-based integer)")]
    InvalidPosition { line: usize },
}
