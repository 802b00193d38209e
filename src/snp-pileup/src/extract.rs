use genome::Allele;
use rust_htslib::bam::pileup::Alignment;
use rust_htslib::bam::record::{Aux, Cigar, Record};

/// Highest base quality carried forward; anything above is clamped.
pub const QUAL_CAP: u8 = 93;

/// One accepted read observation at a locus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub base: Allele,
    pub qual: u8,
    /// Cell-tag value (barcode mode only).
    pub cell: Option<String>,
    /// UMI-tag value (when deduplication is active).
    pub umi : Option<String>,
}

/// Outcome of extracting one pileup event.
#[derive(Debug, PartialEq, Eq)]
pub enum Extracted {
    Keep(Observation),
    /// Deletion, refskip, or aligned-match length below the floor.
    SkipFilter,
    /// A required auxiliary tag is absent.
    SkipFormat,
}

/// Converts a pileup event into an [`Observation`], or classifies it as
/// skipped.
#[derive(Debug, Clone, Copy)]
pub struct EventExtractor {
    min_len : u32,
    cell_tag: Option<[u8; 2]>,
    umi_tag : Option<[u8; 2]>,
}

impl EventExtractor {
    #[must_use]
    pub fn new(min_len: u32, cell_tag: Option<[u8; 2]>, umi_tag: Option<[u8; 2]>) -> Self {
        Self { min_len, cell_tag, umi_tag }
    }

    /// Extract the observation carried by one aligned read at the current
    /// pileup column. `record` must be the record of `alignment`.
    #[must_use]
    pub fn extract(&self, alignment: &Alignment, record: &Record) -> Extracted {
        self.classify(record, alignment.qpos(), alignment.is_del(), alignment.is_refskip())
    }

    fn classify(&self, record: &Record, qpos: Option<usize>, is_del: bool, is_refskip: bool) -> Extracted {
        let cell = match self.cell_tag {
            Some(tag) => match aux_string(record, &tag) {
                Some(value) => Some(value),
                None        => return Extracted::SkipFormat,
            },
            None => None,
        };
        let umi = match self.umi_tag {
            Some(tag) => match aux_string(record, &tag) {
                Some(value) => Some(value),
                None        => return Extracted::SkipFormat,
            },
            None => None,
        };

        if is_del || is_refskip {
            return Extracted::SkipFilter;
        }
        if self.min_len > 0 && aligned_match_len(record) < self.min_len {
            return Extracted::SkipFilter;
        }

        // A query position outside the read sequence still counts, as an
        // unknown base of quality 0.
        let (base, qual) = match qpos {
            Some(qpos) if qpos < record.seq_len() => (
                Allele::from_seq_byte(record.seq()[qpos]),
                record.qual()[qpos].min(QUAL_CAP),
            ),
            _ => (Allele::N, 0),
        };
        Extracted::Keep(Observation { base, qual, cell, umi })
    }
}

/// Sum of the M/=/X CIGAR operation lengths of a read.
#[must_use]
pub fn aligned_match_len(record: &Record) -> u32 {
    record
        .cigar()
        .iter()
        .map(|op| match op {
            Cigar::Match(len) | Cigar::Equal(len) | Cigar::Diff(len) => *len,
            _ => 0,
        })
        .sum()
}

fn aux_string(record: &Record, tag: &[u8; 2]) -> Option<String> {
    match record.aux(tag) {
        Ok(Aux::String(value)) => Some(value.to_string()),
        _ => None,
    }
}
