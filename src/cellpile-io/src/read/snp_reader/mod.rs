mod error;
pub use error::SnpReaderError;

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use gzp::{deflate::Bgzf, par::decompress::ParDecompressBuilder};
use log::{debug, info};

use genome::{Allele, Snp, SnpSet};

/// Column layout and separator of a candidate-SNP file.
///
/// ## Accepted file formats:
///    EXT      NAME                   CHR  POS  REF  ALT  SEP
/// - .vcf[.gz] variant call format    0    1    3    4    '\t'
/// - .tsv      tab separated          0    1    2    3    '\t'
/// - .csv      comma separated        0    1    2    3    ','
/// - .txt      space separated        0    1    2    3    ' '
///
/// Positions are expected 1-based in every format and shifted to 0-based on
/// read. REF/ALT fields that are not a single nucleotide (indels, multi-allelic
/// records) cause the record to be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnpFormat { Vcf, Tsv, Csv, Txt }

impl SnpFormat {
    /// (chrom, pos, ref, alt) column indices of this format.
    const fn columns(self) -> [usize; 4] {
        match self {
            Self::Vcf => [0, 1, 3, 4],
            Self::Tsv | Self::Csv | Self::Txt => [0, 1, 2, 3],
        }
    }

    const fn separator(self) -> char {
        match self {
            Self::Vcf | Self::Tsv => '\t',
            Self::Csv             => ',',
            Self::Txt             => ' ',
        }
    }

    /// Infer the format from a file path, looking through a trailing `.gz`.
    fn detect(path: &Path) -> Result<(Self, bool), SnpReaderError> {
        let name = path.file_name().and_then(|name| name.to_str()).unwrap_or_default();
        let (stem, gz) = match name.strip_suffix(".gz") {
            Some(stem) => (stem, true),
            None       => (name, false),
        };
        let format = match stem.rsplit('.').next() {
            Some("vcf") => Self::Vcf,
            Some("tsv") => Self::Tsv,
            Some("csv") => Self::Csv,
            Some("txt") => Self::Txt,
            ext => return Err(SnpReaderError::InvalidFileFormat(ext.unwrap_or("").to_string())),
        };
        Ok((format, gz))
    }
}

/// Generic reader for candidate-SNP list files.
pub struct SnpReader<'a> {
    source: Box<dyn BufRead + 'a>,
    format: SnpFormat,
}

impl<'a> SnpReader<'a> {
    /// Open a SNP list, transparently decompressing `.gz` inputs.
    ///
    /// # Errors
    /// - [`SnpReaderError::InvalidFileFormat`] on an unrecognized extension.
    /// - Any underlying `io` error.
    pub fn new(path: &Path, decompression_threads: usize) -> Result<Self> {
        let (format, gz) = SnpFormat::detect(path)?;
        let file = File::open(path)
            .with_context(|| format!("Failed to open SNP list {}", path.display()))?;
        let source: Box<dyn Read> = match gz {
            false => Box::new(file),
            true  => ParDecompressBuilder::<Bgzf>::new()
                .maybe_num_threads(decompression_threads)
                .maybe_par_from_reader(file),
        };
        debug!("Opened SNP list {} as {format:?} (gzipped: {gz})", path.display());
        Ok(Self { source: Box::new(BufReader::new(source)), format })
    }

    /// Build a reader over an arbitrary buffered source (tests, mainly).
    #[must_use]
    pub fn from_reader(source: Box<dyn BufRead + 'a>, format: SnpFormat) -> Self {
        Self { source, format }
    }

    /// Read every record into a position-sorted [`SnpSet`].
    ///
    /// Comment lines (`#`) and records without a single-nucleotide REF and ALT
    /// are skipped; the skip count is logged.
    ///
    /// # Errors
    /// - [`SnpReaderError::MissingField`] on a truncated record.
    /// - [`SnpReaderError::InvalidPosition`] on an unparseable or 0 position.
    pub fn read_snp_set(self) -> Result<SnpSet> {
        let columns = self.format.columns();
        let sep     = self.format.separator();
        let needed  = columns.iter().max().copied().unwrap_or(0);

        let mut set = SnpSet::new();
        let mut skipped = 0usize;
        for (line_idx, line) in self.source.lines().enumerate() {
            let line = line.context("Failed to read line from SNP list")?;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split(sep).filter(|field| !field.is_empty()).collect();
            if fields.len() <= needed {
                return Err(SnpReaderError::MissingField { line: line_idx + 1, found: fields.len() }.into());
            }

            let chrom = fields[columns[0]];
            let pos: u32 = fields[columns[1]]
                .parse()
                .ok()
                .filter(|pos| *pos > 0)
                .ok_or(SnpReaderError::InvalidPosition { line: line_idx + 1 })?;

            let (reference, alternate) = match (Self::parse_allele(fields[columns[2]]), Self::parse_allele(fields[columns[3]])) {
                (Some(reference), Some(alternate)) => (reference, alternate),
                _ => { skipped += 1; continue } // indel or multi-allelic record
            };
            set.insert(chrom, Snp::new(pos - 1, reference, alternate));
        }
        set.finish();
        info!("Parsed {} candidate loci across {} chromosome(s) ({skipped} non-SNV record(s) skipped)",
            set.len(), set.chroms().len());
        Ok(set)
    }

    /// A single-nucleotide allele field. `.`/`N` are accepted as unknown.
    fn parse_allele(field: &str) -> Option<Allele> {
        let mut chars = field.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Allele::try_from(c).ok(),
            _ => None,
        }
    }
}
