use rust_htslib::bam::pileup::{Pileup, Pileups};
use rust_htslib::bam::IndexedReader;
use rust_htslib::errors::Error as HtsError;

/// All pileup columns covering one position, one slot per input file
/// (`None` for files without coverage there).
pub struct LocusColumns {
    pub pos    : u32,
    pub columns: Vec<Option<Pileup>>,
}

/// K-way positional merge over per-file pileup iterators.
///
/// Every inner iterator must span the same chromosome (the caller fetches the
/// same region in every file before construction); the merge then yields each
/// covered position exactly once, in ascending order, together with the
/// columns of every file covering it.
///
/// Columns handed out by [`MultiPileup::next_locus`] must be consumed before
/// the next call: advancing a file's iterator invalidates the buffers backing
/// its previous column.
pub struct MultiPileup<'io> {
    files  : Vec<Pileups<'io, IndexedReader>>,
    heads  : Vec<Option<Pileup>>,
    pending: Vec<usize>,
}

impl<'io> MultiPileup<'io> {
    #[must_use]
    pub fn new(files: Vec<Pileups<'io, IndexedReader>>) -> Self {
        let n_files = files.len();
        Self {
            files,
            heads  : (0..n_files).map(|_| None).collect(),
            pending: (0..n_files).collect(),
        }
    }

    /// Number of merged input files.
    #[must_use]
    pub fn n_files(&self) -> usize {
        self.files.len()
    }

    /// Advance to the next covered position across all files.
    ///
    /// # Errors
    /// The first decoding error reported by any inner iterator.
    pub fn next_locus(&mut self) -> Result<Option<LocusColumns>, HtsError> {
        // refill the heads consumed by the previous locus
        let pending = std::mem::take(&mut self.pending);
        for index in pending {
            self.heads[index] = match self.files[index].next() {
                Some(Ok(column)) => Some(column),
                Some(Err(e))     => return Err(e),
                None             => None,
            };
        }

        let Some(pos) = self.heads.iter().flatten().map(Pileup::pos).min() else {
            return Ok(None);
        };

        let mut columns: Vec<Option<Pileup>> = (0..self.heads.len()).map(|_| None).collect();
        for (index, head) in self.heads.iter_mut().enumerate() {
            if head.as_ref().map(Pileup::pos) == Some(pos) {
                columns[index] = head.take();
                self.pending.push(index);
            }
        }
        Ok(Some(LocusColumns { pos, columns }))
    }
}
