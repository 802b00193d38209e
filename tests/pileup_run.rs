mod common;

use clap::Parser;
use common::{read_matrix, read_variant_lines, sam_read, Workspace};
use pretty_assertions::assert_eq;

/// 30bp read whose first base sits on the queried locus: passes the default
/// `--min-len 30` floor while only the leading base matters to the test.
fn read_at(qname: &str, chrom: &str, pos_1based: u32, base: char, qual: u8, tags: &[&str]) -> String {
    let seq = format!("{base}{}", "G".repeat(29));
    sam_read(qname, chrom, pos_1based, &seq, qual, tags)
}

fn run_cli(args: &[&str]) -> snp_pileup::RunSummary {
    let cli = parser::Cli::parse_from(std::iter::once("cellpile").chain(args.iter().copied()));
    snp_pileup::run(&cli).expect("pileup run failed")
}

#[test]
fn barcode_mode_inferred_alleles() {
    let ws = Workspace::new();
    let bam = ws.write_bam(
        "cells.bam",
        &[("1", 1000)],
        &[
            read_at("r1", "1", 101, 'A', 30, &["CB:Z:c1", "UB:Z:u1"]),
            read_at("r2", "1", 101, 'A', 30, &["CB:Z:c1", "UB:Z:u2"]),
            read_at("r3", "1", 101, 'C', 30, &["CB:Z:c1", "UB:Z:u3"]),
        ],
    );
    let barcodes = ws.write_text("barcodes.tsv", "c1\n");
    let snps = ws.write_text("snps.tsv", "1\t101\t.\t.\n");
    let out = ws.out_dir();

    let summary = run_cli(&[
        "-b", bam.to_str().unwrap(),
        "-B", barcodes.to_str().unwrap(),
        "-s", snps.to_str().unwrap(),
        "-O", out.to_str().unwrap(),
        "--min-count", "3",
        "--min-maf", "0.2",
    ]);
    assert_eq!(summary.retained_snps, 1);

    let variants = read_variant_lines(&out.join("cellpile.base.vcf"));
    assert_eq!(variants, vec!["1\t101\t.\tA\tC\t.\tPASS\tAD=1;DP=3;OTH=0".to_string()]);

    let ad = read_matrix(&out.join("cellpile.tag.AD.mtx"));
    assert_eq!((ad.rows, ad.cols, ad.nnz), (1, 1, 1));
    assert_eq!(ad.data, vec![(1, 1, 1)]);

    let dp = read_matrix(&out.join("cellpile.tag.DP.mtx"));
    assert_eq!(dp.data, vec![(1, 1, 3)]);

    let oth = read_matrix(&out.join("cellpile.tag.OTH.mtx"));
    assert_eq!(oth.nnz, 0);
    assert!(oth.data.is_empty());

    assert_eq!(std::fs::read_to_string(out.join("cellpile.samples.tsv")).unwrap(), "c1\n");
}

#[test]
fn umi_duplicates_leave_counts_unchanged() {
    let ws = Workspace::new();
    let bam = ws.write_bam(
        "cells.bam",
        &[("1", 1000)],
        &[
            read_at("r1", "1", 101, 'A', 30, &["CB:Z:c1", "UB:Z:u1"]),
            read_at("r2", "1", 101, 'A', 30, &["CB:Z:c1", "UB:Z:u2"]),
            read_at("r3", "1", 101, 'C', 30, &["CB:Z:c1", "UB:Z:u3"]),
            // PCR copy of r3: same barcode, same UMI, worse quality
            read_at("r4", "1", 101, 'C', 20, &["CB:Z:c1", "UB:Z:u3"]),
        ],
    );
    let barcodes = ws.write_text("barcodes.tsv", "c1\n");
    let snps = ws.write_text("snps.tsv", "1\t101\t.\t.\n");
    let out = ws.out_dir();

    let summary = run_cli(&[
        "-b", bam.to_str().unwrap(),
        "-B", barcodes.to_str().unwrap(),
        "-s", snps.to_str().unwrap(),
        "-O", out.to_str().unwrap(),
        "--min-count", "3",
        "--min-maf", "0.2",
    ]);
    assert_eq!(summary.skips.umi_duplicates, 1);

    let variants = read_variant_lines(&out.join("cellpile.base.vcf"));
    assert_eq!(variants, vec!["1\t101\t.\tA\tC\t.\tPASS\tAD=1;DP=3;OTH=0".to_string()]);
}

#[test]
fn sample_mode_one_column_per_file() {
    let ws = Workspace::new();
    let chroms = [("1", 1000)];
    let s0 = ws.write_bam(
        "s0.bam",
        &chroms,
        &[
            read_at("a1", "1", 101, 'G', 30, &[]),
            read_at("a2", "1", 101, 'G', 30, &[]),
        ],
    );
    let s1 = ws.write_bam(
        "s1.bam",
        &chroms,
        &[
            read_at("b1", "1", 101, 'G', 30, &[]),
            read_at("b2", "1", 101, 'T', 30, &[]),
        ],
    );
    let snps = ws.write_text("snps.tsv", "1\t101\t.\t.\n");
    let out = ws.out_dir();

    let bams = format!("{},{}", s0.to_str().unwrap(), s1.to_str().unwrap());
    run_cli(&[
        "-b", &bams,
        "-s", snps.to_str().unwrap(),
        "-O", out.to_str().unwrap(),
        "--min-count", "4",
    ]);

    let variants = read_variant_lines(&out.join("cellpile.base.vcf"));
    assert_eq!(variants, vec!["1\t101\t.\tG\tT\t.\tPASS\tAD=1;DP=4;OTH=0".to_string()]);

    let ad = read_matrix(&out.join("cellpile.tag.AD.mtx"));
    assert_eq!((ad.rows, ad.cols), (1, 2));
    assert_eq!(ad.data, vec![(1, 2, 1)]);

    let dp = read_matrix(&out.join("cellpile.tag.DP.mtx"));
    assert_eq!(dp.data, vec![(1, 1, 2), (1, 2, 2)]);

    // sample names default to the file stems
    assert_eq!(std::fs::read_to_string(out.join("cellpile.samples.tsv")).unwrap(), "s0\ns1\n");
}

#[test]
fn worker_count_does_not_change_results() {
    let ws = Workspace::new();
    let chroms = [("1", 1000), ("2", 1000)];
    let mut reads = Vec::new();
    for chrom in ["1", "2"] {
        reads.push(read_at("r1", chrom, 101, 'A', 30, &["CB:Z:c1", "UB:Z:u1"]));
        reads.push(read_at("r2", chrom, 101, 'A', 30, &["CB:Z:c1", "UB:Z:u2"]));
        reads.push(read_at("r3", chrom, 101, 'C', 30, &["CB:Z:c1", "UB:Z:u3"]));
    }
    let bam = ws.write_bam("cells.bam", &chroms, &reads);
    let barcodes = ws.write_text("barcodes.tsv", "c1\n");
    let snps = ws.write_text("snps.tsv", "1\t101\t.\t.\n2\t101\t.\t.\n");

    let (out_serial, out_parallel) = (ws.path("out1"), ws.path("out2"));
    for (out, nproc) in [(&out_serial, "1"), (&out_parallel, "2")] {
        let summary = run_cli(&[
            "-b", bam.to_str().unwrap(),
            "-B", barcodes.to_str().unwrap(),
            "-s", snps.to_str().unwrap(),
            "-O", out.to_str().unwrap(),
            "--min-count", "3",
            "-p", nproc,
        ]);
        assert_eq!(summary.retained_snps, 2);
    }

    for matrix in ["cellpile.tag.AD.mtx", "cellpile.tag.DP.mtx", "cellpile.tag.OTH.mtx"] {
        assert_eq!(read_matrix(&out_serial.join(matrix)), read_matrix(&out_parallel.join(matrix)));
    }
    assert_eq!(
        read_variant_lines(&out_serial.join("cellpile.base.vcf")),
        read_variant_lines(&out_parallel.join("cellpile.base.vcf"))
    );

    // submission order: chromosome 1's locus is row 1, chromosome 2's is row 2
    let dp = read_matrix(&out_parallel.join("cellpile.tag.DP.mtx"));
    assert_eq!(dp.rows, 2);
    assert_eq!(dp.data, vec![(1, 1, 3), (2, 1, 3)]);
}

#[test]
fn genotype_emission() {
    let ws = Workspace::new();
    let bam = ws.write_bam(
        "cells.bam",
        &[("1", 1000)],
        &[read_at("r1", "1", 101, 'A', 30, &["CB:Z:c1", "UB:Z:u1"])],
    );
    let barcodes = ws.write_text("barcodes.tsv", "c1\n");
    let snps = ws.write_text("snps.tsv", "1\t101\tA\tC\n");
    let out = ws.out_dir();

    run_cli(&[
        "-b", bam.to_str().unwrap(),
        "-B", barcodes.to_str().unwrap(),
        "-s", snps.to_str().unwrap(),
        "-O", out.to_str().unwrap(),
        "--min-count", "1",
        "--genotype",
    ]);

    let content = std::fs::read_to_string(out.join("cellpile.base.vcf")).unwrap();
    assert!(content.contains("##FORMAT=<ID=PL"));
    assert!(content.contains("\tFORMAT\tc1\n"));

    let variants = read_variant_lines(&out.join("cellpile.base.vcf"));
    assert_eq!(
        variants,
        vec!["1\t101\t.\tA\tC\t.\tPASS\tAD=0;DP=1;OTH=0\tGT:AD:DP:OTH:PL:ALL\t0/0:0:1:0:0,3,10:1,0,0,0,0".to_string()]
    );
}

#[test]
fn below_min_count_emits_nothing() {
    let ws = Workspace::new();
    let bam = ws.write_bam(
        "cells.bam",
        &[("1", 1000)],
        &[
            read_at("r1", "1", 101, 'A', 30, &["CB:Z:c1", "UB:Z:u1"]),
            read_at("r2", "1", 101, 'C', 30, &["CB:Z:c1", "UB:Z:u2"]),
        ],
    );
    let barcodes = ws.write_text("barcodes.tsv", "c1\n");
    let snps = ws.write_text("snps.tsv", "1\t101\t.\t.\n");
    let out = ws.out_dir();

    let summary = run_cli(&[
        "-b", bam.to_str().unwrap(),
        "-B", barcodes.to_str().unwrap(),
        "-s", snps.to_str().unwrap(),
        "-O", out.to_str().unwrap(),
        "--min-count", "3",
    ]);
    assert_eq!(summary.retained_snps, 0);
    assert_eq!(summary.skips.dropped_loci, 1);

    assert!(read_variant_lines(&out.join("cellpile.base.vcf")).is_empty());
    let ad = read_matrix(&out.join("cellpile.tag.AD.mtx"));
    assert_eq!((ad.rows, ad.nnz), (0, 0));
}

#[test]
fn denovo_mode_calls_covered_loci() {
    let ws = Workspace::new();
    let bam = ws.write_bam(
        "cells.bam",
        &[("1", 1000)],
        &[
            read_at("r1", "1", 101, 'A', 30, &["CB:Z:c1", "UB:Z:u1"]),
            read_at("r2", "1", 101, 'A', 30, &["CB:Z:c1", "UB:Z:u2"]),
            read_at("r3", "1", 101, 'C', 30, &["CB:Z:c1", "UB:Z:u3"]),
        ],
    );
    let barcodes = ws.write_text("barcodes.tsv", "c1\n");
    let out = ws.out_dir();

    // no SNP list: --chroms is required, and every covered locus is a candidate
    let summary = run_cli(&[
        "-b", bam.to_str().unwrap(),
        "-B", barcodes.to_str().unwrap(),
        "-c", "1",
        "-O", out.to_str().unwrap(),
        "--min-count", "3",
        "--min-maf", "0.2",
    ]);
    assert_eq!(summary.retained_snps, 1);

    let variants = read_variant_lines(&out.join("cellpile.base.vcf"));
    assert_eq!(variants, vec!["1\t101\t.\tA\tC\t.\tPASS\tAD=1;DP=3;OTH=0".to_string()]);
}
