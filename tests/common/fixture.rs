use std::path::PathBuf;

use rust_htslib::bam::{self, header::HeaderRecord, Header, HeaderView, Record};

/// Temporary directory holding synthesized alignment files, panels and
/// outputs for one end-to-end run.
pub struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self { dir: tempfile::tempdir().expect("Failed to create test workspace") }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn out_dir(&self) -> PathBuf {
        self.path("out")
    }

    /// Write a text file (SNP list, barcode panel) and return its path.
    pub fn write_text(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, content).expect("Failed to write test input");
        path
    }

    /// Synthesize a coordinate-sorted, BAI-indexed BAM from SAM record lines.
    /// `chroms` populates the @SQ header lines; records must already be sorted
    /// by (chrom order, position).
    pub fn write_bam(&self, name: &str, chroms: &[(&str, u32)], sam_lines: &[String]) -> PathBuf {
        let path = self.path(name);

        let mut header = Header::new();
        let mut hd = HeaderRecord::new(b"HD");
        hd.push_tag(b"VN", &"1.6");
        hd.push_tag(b"SO", &"coordinate");
        header.push_record(&hd);
        for (chrom, len) in chroms {
            let mut record = HeaderRecord::new(b"SQ");
            record.push_tag(b"SN", chrom);
            record.push_tag(b"LN", len);
            header.push_record(&record);
        }
        let header_view = HeaderView::from_header(&header);

        {
            let mut writer = bam::Writer::from_path(&path, &header, bam::Format::Bam)
                .expect("Failed to create test BAM");
            for line in sam_lines {
                let record = Record::from_sam(&header_view, line.as_bytes())
                    .unwrap_or_else(|e| panic!("Invalid SAM line '{line}': {e}"));
                writer.write(&record).expect("Failed to write test BAM record");
            }
        }
        bam::index::build(&path, None, bam::index::Type::Bai, 1).expect("Failed to index test BAM");
        path
    }
}

/// One single-end mapped SAM line (flag 0, MAPQ 60, full-match CIGAR) with a
/// uniform base quality, plus optional auxiliary tags (`"CB:Z:c1"` form).
pub fn sam_read(qname: &str, chrom: &str, pos_1based: u32, seq: &str, qual: u8, tags: &[&str]) -> String {
    let quals: String = std::iter::repeat((qual + 33) as char).take(seq.len()).collect();
    let mut line = format!(
        "{qname}\t0\t{chrom}\t{pos_1based}\t60\t{len}M\t*\t0\t0\t{seq}\t{quals}",
        len = seq.len()
    );
    for tag in tags {
        line.push('\t');
        line.push_str(tag);
    }
    line
}
