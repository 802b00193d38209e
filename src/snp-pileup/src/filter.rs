use rust_htslib::bam::record::Record;

use crate::config::FilterParams;

/// Read-level predicate applied to every raw alignment before it reaches the
/// extractor. Rejected reads are invisible downstream.
#[derive(Debug, Clone, Copy)]
pub struct ReadFilter {
    min_mapq     : u8,
    rflag_filter : u16,
    rflag_require: u16,
    no_orphan    : bool,
}

impl ReadFilter {
    #[must_use]
    pub fn new(params: &FilterParams) -> Self {
        Self {
            min_mapq     : params.min_mapq,
            rflag_filter : params.rflag_filter,
            rflag_require: params.rflag_require,
            no_orphan    : params.no_orphan,
        }
    }

    /// A read is accepted iff it is mapped to a reference, reaches the MAPQ
    /// floor, carries none of the filtered flag bits, carries all of the
    /// required ones, and (with `no_orphan`) is not an orphaned mate.
    #[must_use]
    pub fn accept(&self, record: &Record) -> bool {
        if record.tid() < 0 || record.is_unmapped() {
            return false;
        }
        if record.mapq() < self.min_mapq {
            return false;
        }
        let flags = record.flags();
        if flags & self.rflag_filter != 0 {
            return false;
        }
        if flags & self.rflag_require != self.rflag_require {
            return false;
        }
        if self.no_orphan && record.is_paired() && !record.is_proper_pair() {
            return false;
        }
        true
    }
}
