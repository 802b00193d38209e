mod error;
pub use error::SparseWriterError;

use std::fmt::{self, Display};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;

/// Leading lines of every Matrix Market coordinate file.
pub const MTX_BANNER: &str = "%%MatrixMarket matrix coordinate integer general\n%\n";

/// Width reserved for the dimensions line when it must be rewritten in place
/// (single-worker direct output).
const HEADER_PAD_WIDTH: usize = 42;

/// Dimensions line of a merged matrix: `<rows>\t<cols>\t<nnz>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixHeader {
    pub rows: u64,
    pub cols: u64,
    pub nnz : u64,
}

impl Display for MatrixHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.rows, self.cols, self.nnz)
    }
}

/// Streaming writer of sparse-matrix triplets, either into a worker shard
/// (bare rows, renumbered at merge) or directly into the final file behind a
/// reserved header (single-worker path).
pub struct MatrixWriter {
    path: PathBuf,
    sink: BufWriter<File>,
    nnz : u64,
}

impl MatrixWriter {
    /// Open a header-less shard. Row indices are worker-local and 1-based.
    ///
    /// # Errors
    /// Any underlying `io` error.
    pub fn shard(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create matrix shard {}", path.display()))?;
        Ok(Self { path: path.to_path_buf(), sink: BufWriter::new(file), nnz: 0 })
    }

    /// Open a final output file, writing the banner and a space-padded
    /// placeholder dimensions line to be rewritten by
    /// [`MatrixWriter::finalize_direct`].
    ///
    /// # Errors
    /// Any underlying `io` error.
    pub fn direct(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create matrix {}", path.display()))?;
        let mut sink = BufWriter::new(file);
        write!(sink, "{MTX_BANNER}{:HEADER_PAD_WIDTH$}\n", "")
            .with_context(|| format!("Failed to reserve matrix header in {}", path.display()))?;
        Ok(Self { path: path.to_path_buf(), sink, nnz: 0 })
    }

    /// Append one `<row>\t<col>\t<value>` triplet (both indices 1-based).
    ///
    /// # Errors
    /// Any underlying `io` error.
    pub fn push(&mut self, row: u64, col: u64, value: u32) -> Result<()> {
        writeln!(self.sink, "{row}\t{col}\t{value}")
            .with_context(|| format!("Failed to write matrix row to {}", self.path.display()))?;
        self.nnz += 1;
        Ok(())
    }

    #[must_use]
    pub fn nnz(&self) -> u64 {
        self.nnz
    }

    /// Flush and close, returning the number of written triplets.
    ///
    /// # Errors
    /// Any underlying `io` error.
    pub fn finish(mut self) -> Result<u64> {
        self.sink
            .flush()
            .with_context(|| format!("Failed to flush matrix {}", self.path.display()))?;
        Ok(self.nnz)
    }

    /// Rewrite the reserved dimensions line of a file opened through
    /// [`MatrixWriter::direct`].
    ///
    /// # Errors
    /// - [`SparseWriterError::HeaderOverflow`] if the dimensions do not fit
    ///   the reserved width.
    /// - Any underlying `io` error.
    pub fn finalize_direct(path: &Path, header: &MatrixHeader) -> Result<()> {
        let dims = header.to_string();
        if dims.len() > HEADER_PAD_WIDTH {
            return Err(SparseWriterError::HeaderOverflow { dims, width: HEADER_PAD_WIDTH }.into());
        }
        let mut file = OpenOptions::new()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to re-open matrix {}", path.display()))?;
        file.seek(SeekFrom::Start(MTX_BANNER.len() as u64))?;
        write!(file, "{dims:<HEADER_PAD_WIDTH$}")
            .with_context(|| format!("Failed to rewrite matrix header of {}", path.display()))?;
        Ok(())
    }
}

/// Concatenate worker shards into the final matrix, prepending the banner and
/// dimensions line and rebasing each shard's 1-based local row indices by the
/// number of loci retained by earlier workers.
///
/// # Errors
/// - [`SparseWriterError::MalformedShardRow`] on an unparseable shard line.
/// - Any underlying `io` error.
pub fn merge_shards(dest: &Path, shards: &[PathBuf], row_bases: &[u64], header: &MatrixHeader) -> Result<()> {
    debug_assert_eq!(shards.len(), row_bases.len());
    debug!("Merging {} shard(s) into {}", shards.len(), dest.display());

    let file = File::create(dest).with_context(|| format!("Failed to create matrix {}", dest.display()))?;
    let mut sink = BufWriter::new(file);
    write!(sink, "{MTX_BANNER}{header}\n")?;

    for (shard, base) in shards.iter().zip(row_bases) {
        let source = BufReader::new(
            File::open(shard).with_context(|| format!("Failed to open matrix shard {}", shard.display()))?,
        );
        for line in source.lines() {
            let line = line?;
            let (row, rest) = line
                .split_once('\t')
                .and_then(|(row, rest)| Some((row.parse::<u64>().ok()?, rest)))
                .ok_or_else(|| SparseWriterError::MalformedShardRow { shard: shard.clone(), line: line.clone() })?;
            writeln!(sink, "{}\t{rest}", base + row)?;
        }
    }
    sink.flush().with_context(|| format!("Failed to flush matrix {}", dest.display()))?;
    Ok(())
}
