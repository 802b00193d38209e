mod error;
pub use error::VariantWriterError;

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use gzp::{deflate::Gzip, par::compress::{ParCompress, ParCompressBuilder}, ZWriter};
use itertools::Itertools;

use genome::Allele;

/// Static description lines of the variant output.
const VCF_META: &str = "\
##fileformat=VCFv4.2\n\
##source=cellpile-rs\n\
##INFO=<ID=AD,Number=1,Type=Integer,Description=\"Alternate allele depth\">\n\
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Reference plus alternate allele depth\">\n\
##INFO=<ID=OTH,Number=1,Type=Integer,Description=\"Depth of other bases\">\n";

const VCF_FORMAT_META: &str = "\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
##FORMAT=<ID=AD,Number=1,Type=Integer,Description=\"Alternate allele depth\">\n\
##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Reference plus alternate allele depth\">\n\
##FORMAT=<ID=OTH,Number=1,Type=Integer,Description=\"Depth of other bases\">\n\
##FORMAT=<ID=PL,Number=G,Type=Integer,Description=\"Phred-scaled genotype likelihoods\">\n\
##FORMAT=<ID=ALL,Number=5,Type=Integer,Description=\"Base counts for A,C,G,T,N\">\n";

/// Per-group block of a variant record, emitted when genotyping is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupGenotype {
    pub gt    : String,
    pub ad    : u32,
    pub dp    : u32,
    pub oth   : u32,
    pub pl    : Vec<u32>,
    pub counts: [u32; 5],
}

/// One retained locus, ready for formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRecord {
    /// 0-based position (shifted to 1-based on write).
    pub pos      : u32,
    pub reference: Allele,
    pub alternate: Allele,
    pub ad       : u32,
    pub dp       : u32,
    pub oth      : u32,
    /// One entry per group, in column order. `None` when genotyping is off.
    pub genotypes: Option<Vec<GroupGenotype>>,
}

impl VariantRecord {
    /// Render this record as a single tab-separated line (newline excluded).
    #[must_use]
    pub fn format_line(&self, chrom: &str) -> String {
        let mut line = format!(
            "{chrom}\t{pos}\t.\t{reference}\t{alternate}\t.\tPASS\tAD={ad};DP={dp};OTH={oth}",
            pos = self.pos + 1,
            reference = self.reference,
            alternate = self.alternate,
            ad = self.ad,
            dp = self.dp,
            oth = self.oth,
        );
        if let Some(genotypes) = &self.genotypes {
            line.push_str("\tGT:AD:DP:OTH:PL:ALL");
            for group in genotypes {
                line.push_str(&format!(
                    "\t{gt}:{ad}:{dp}:{oth}:{pl}:{counts}",
                    gt = group.gt,
                    ad = group.ad,
                    dp = group.dp,
                    oth = group.oth,
                    pl = group.pl.iter().join(","),
                    counts = group.counts.iter().join(","),
                ));
            }
        }
        line
    }
}

enum Sink {
    Plain(BufWriter<File>),
    Gzip(ParCompress<Gzip>),
}

/// Writer of the VCF-like variant output, optionally gzip-compressed.
pub struct VariantWriter {
    sink: Sink,
}

impl VariantWriter {
    /// Create the output file; compression is keyed on `gzip`.
    ///
    /// # Errors
    /// Any underlying `io` error.
    pub fn create(path: &Path, gzip: bool) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create variant file {}", path.display()))?;
        let sink = match gzip {
            false => Sink::Plain(BufWriter::new(file)),
            true  => Sink::Gzip(ParCompressBuilder::new().from_writer(file)),
        };
        Ok(Self { sink })
    }

    /// Write the meta lines and the `#CHROM` header. `groups` adds the FORMAT
    /// meta lines and one column name per group.
    ///
    /// # Errors
    /// Any underlying `io` error.
    pub fn write_header(&mut self, groups: Option<&[String]>) -> Result<()> {
        self.write_all(VCF_META.as_bytes())?;
        let mut header = String::from("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO");
        if let Some(groups) = groups {
            self.write_all(VCF_FORMAT_META.as_bytes())?;
            header.push_str("\tFORMAT");
            for group in groups {
                header.push('\t');
                header.push_str(group);
            }
        }
        header.push('\n');
        self.write_all(header.as_bytes())?;
        Ok(())
    }

    /// Append one record.
    ///
    /// # Errors
    /// Any underlying `io` error.
    pub fn write_record(&mut self, chrom: &str, record: &VariantRecord) -> Result<()> {
        let mut line = record.format_line(chrom);
        line.push('\n');
        self.write_all(line.as_bytes())
            .with_context(|| format!("Failed to write variant record at {chrom}:{}", record.pos + 1))?;
        Ok(())
    }

    /// Stream the raw bytes of a worker shard into this writer.
    ///
    /// # Errors
    /// Any underlying `io` error.
    pub fn append_raw<R: Read>(&mut self, mut source: R) -> Result<u64> {
        Ok(io::copy(&mut source, self)?)
    }

    /// Flush and close the output (finishing the gzip stream when active).
    ///
    /// # Errors
    /// Any underlying `io` or compression error.
    pub fn finish(self) -> Result<()> {
        match self.sink {
            Sink::Plain(mut sink) => sink.flush().context("Failed to flush variant file")?,
            Sink::Gzip(mut sink)  => sink.finish().map_err(VariantWriterError::Compression)?,
        }
        Ok(())
    }
}

impl Write for VariantWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.sink {
            Sink::Plain(sink) => sink.write(buf),
            Sink::Gzip(sink)  => sink.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.sink {
            Sink::Plain(sink) => sink.flush(),
            Sink::Gzip(sink)  => sink.flush(),
        }
    }
}
