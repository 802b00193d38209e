use ahash::AHashMap;
use anyhow::{bail, Context, Result};
use log::{debug, info};
use rust_htslib::bam::{IndexedReader, Read};

use cellpile_io::write::{GroupGenotype, MatrixWriter, VariantRecord, VariantWriter};
use genome::{Allele, Snp};

use crate::aggregate::{GroupKeyer, LocusState, PushOutcome};
use crate::config::{PileupConfig, SampleMode};
use crate::extract::{EventExtractor, Extracted};
use crate::filter::ReadFilter;
use crate::mplp::{LocusColumns, MultiPileup};
use crate::stats::{self, LocusCall, QualTable};

/// Writers of one worker's four output streams. In multi-worker runs these
/// target `<final>.<w>` shards; in single-worker runs they target the final
/// files directly.
pub struct WorkerOutput {
    pub ad      : MatrixWriter,
    pub dp      : MatrixWriter,
    pub oth     : MatrixWriter,
    pub variants: VariantWriter,
}

/// Tallies of silently-skipped events. None of these is an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkipCounts {
    /// Reads rejected by the read filter, per covered position.
    pub reads_rejected   : u64,
    /// Events lacking a required auxiliary tag.
    pub format_skips     : u64,
    /// Deletions, refskips, and short-alignment events.
    pub filter_skips     : u64,
    /// Observations dropped by `(group, UMI)` deduplication.
    pub umi_duplicates   : u64,
    /// Observations carrying a barcode outside the panel.
    pub unlisted_barcodes: u64,
    /// Candidate loci dropped by the statistics kernel.
    pub dropped_loci     : u64,
}

impl SkipCounts {
    pub fn add(&mut self, other: &SkipCounts) {
        self.reads_rejected    += other.reads_rejected;
        self.format_skips      += other.format_skips;
        self.filter_skips      += other.filter_skips;
        self.umi_duplicates    += other.umi_duplicates;
        self.unlisted_barcodes += other.unlisted_barcodes;
        self.dropped_loci      += other.dropped_loci;
    }
}

/// Public result of one worker, read by the shard manager after the join.
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkerResult {
    pub retained_snps: u64,
    pub nr_ad        : u64,
    pub nr_dp        : u64,
    pub nr_oth       : u64,
    pub skips        : SkipCounts,
}

/// Processes an ordered batch of chromosomes against its own alignment-file
/// handles, streaming retained loci into its shard writers.
pub struct ChromWorker<'cfg> {
    id       : usize,
    chroms   : &'cfg [String],
    config   : &'cfg PileupConfig,
    group_map: &'cfg AHashMap<String, usize>,
}

impl<'cfg> ChromWorker<'cfg> {
    #[must_use]
    pub fn new(
        id: usize,
        chroms: &'cfg [String],
        config: &'cfg PileupConfig,
        group_map: &'cfg AHashMap<String, usize>,
    ) -> Self {
        Self { id, chroms, config, group_map }
    }

    /// Stream every assigned chromosome, then close the output writers.
    ///
    /// # Errors
    /// Any `io`/`format` error from the alignment files or the writers, and
    /// `internal` inconsistencies of the aggregation state.
    pub fn run(self, mut output: WorkerOutput) -> Result<WorkerResult> {
        let filter    = ReadFilter::new(&self.config.filters);
        let extractor = EventExtractor::new(
            self.config.filters.min_len,
            self.config.cell_tag,
            self.config.umi_tag,
        );
        let keyer = match self.config.sample_mode {
            SampleMode::Barcodes  => GroupKeyer::Barcodes(self.group_map),
            SampleMode::SampleIds => GroupKeyer::SampleIds,
        };
        let table      = self.config.emit_genotype.then(QualTable::new);
        let genotyping = table.as_ref().map(|table| (table, self.config.double_gl));

        let depth_cap = match self.config.filters.plp_max_depth {
            0   => i32::MAX as u32,
            cap => cap,
        };

        let mut readers = Vec::with_capacity(self.config.inputs.len());
        for path in &self.config.inputs {
            let reader = IndexedReader::from_path(path)
                .with_context(|| format!("[worker {}] Failed to open {}", self.id, path.display()))?;
            readers.push(reader);
        }

        let mut state  = LocusState::new(self.config.groups.len());
        let mut result = WorkerResult::default();

        for chrom in self.chroms {
            let targets = match self.config.denovo() {
                true  => None,
                false => match self.config.snps.chrom_snps(chrom)? {
                    Some(snps) if !snps.is_empty() => Some(snps),
                    _ => {
                        debug!("[worker {}] No candidate locus on chromosome {chrom}, skipping", self.id);
                        continue;
                    }
                },
            };
            debug!("[worker {}] Processing chromosome {chrom}", self.id);

            for (reader, path) in readers.iter_mut().zip(&self.config.inputs) {
                reader.fetch(chrom.as_str()).with_context(|| {
                    format!("[worker {}] Failed to fetch chromosome {chrom} in {}", self.id, path.display())
                })?;
            }
            let pileups = readers
                .iter_mut()
                .map(|reader| {
                    let mut pileup = reader.pileup();
                    pileup.set_max_depth(depth_cap);
                    pileup
                })
                .collect();
            let mut mplp = MultiPileup::new(pileups);

            let mut target_iter = targets.unwrap_or(&[]).iter().peekable();
            while let Some(locus) = mplp
                .next_locus()
                .with_context(|| format!("[worker {}] Pileup error on chromosome {chrom}", self.id))?
            {
                let snp = match targets {
                    None => Snp::unknown(locus.pos),
                    Some(_) => {
                        // sweep past targets the stream has already overtaken
                        // (uncovered loci never reach the depth gate anyway)
                        while target_iter.next_if(|target| target.pos < locus.pos).is_some() {}
                        match target_iter.peek() {
                            Some(target) if target.pos == locus.pos => **target,
                            _ => continue,
                        }
                    }
                };
                self.process_locus(chrom, &locus, snp, &filter, &extractor, &keyer, genotyping, &mut state, &mut output, &mut result)?;
            }
        }

        result.nr_ad  = output.ad.finish()?;
        result.nr_dp  = output.dp.finish()?;
        result.nr_oth = output.oth.finish()?;
        output.variants.finish()?;

        info!(
            "[worker {}] Done: {} locus/loci retained, {} dropped ({} read(s) filtered, {} UMI duplicate(s))",
            self.id, result.retained_snps, result.skips.dropped_loci,
            result.skips.reads_rejected, result.skips.umi_duplicates
        );
        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    fn process_locus(
        &self,
        chrom: &str,
        locus: &LocusColumns,
        snp: Snp,
        filter: &ReadFilter,
        extractor: &EventExtractor,
        keyer: &GroupKeyer,
        genotyping: Option<(&QualTable, bool)>,
        state: &mut LocusState,
        output: &mut WorkerOutput,
        result: &mut WorkerResult,
    ) -> Result<()> {
        state.reset();
        for (file_index, column) in locus.columns.iter().enumerate() {
            let Some(column) = column else { continue };
            for alignment in column.alignments() {
                let record = alignment.record();
                if !filter.accept(&record) {
                    result.skips.reads_rejected += 1;
                    continue;
                }
                match extractor.extract(&alignment, &record) {
                    Extracted::Keep(observation) => {
                        let outcome = state.push(observation, file_index, keyer).with_context(|| {
                            format!("[worker {}] Aggregation failed at {chrom}:{}", self.id, locus.pos + 1)
                        })?;
                        match outcome {
                            PushOutcome::Inserted     => (),
                            PushOutcome::DuplicateUmi => result.skips.umi_duplicates += 1,
                            PushOutcome::NotInSet     => result.skips.unlisted_barcodes += 1,
                        }
                    }
                    Extracted::SkipFilter => result.skips.filter_skips += 1,
                    Extracted::SkipFormat => result.skips.format_skips += 1,
                }
            }
        }

        match stats::finalize_locus(state, &snp, &self.config.thresholds, genotyping) {
            LocusCall::Drop   => {
                result.skips.dropped_loci += 1;
                return Ok(());
            }
            LocusCall::Retain => (),
        }

        let (Some(ref_idx), Some(alt_idx)) = (state.ref_idx, state.alt_idx) else {
            bail!("[worker {}] Locus {chrom}:{} retained without settled alleles", self.id, locus.pos + 1);
        };

        // local 1-based row; the shard manager rebases it at merge time
        let row = result.retained_snps + 1;
        for (group_index, group) in state.groups.iter().enumerate() {
            let col = (group_index + 1) as u64;
            if group.ad > 0 {
                output.ad.push(row, col, group.ad)?;
            }
            if group.dp > 0 {
                output.dp.push(row, col, group.dp)?;
            }
            if group.oth > 0 {
                output.oth.push(row, col, group.oth)?;
            }
        }

        let genotypes = genotyping.map(|(_, double_gl)| {
            state
                .groups
                .iter()
                .map(|group| {
                    let pl = stats::phred_scaled(&group.gl);
                    let gt = stats::genotype_call(&pl, ref_idx, alt_idx, double_gl);
                    GroupGenotype { gt, ad: group.ad, dp: group.dp, oth: group.oth, pl, counts: group.bc }
                })
                .collect()
        });
        let record = VariantRecord {
            pos      : locus.pos,
            reference: Allele::from_index(ref_idx).unwrap_or(Allele::N),
            alternate: Allele::from_index(alt_idx).unwrap_or(Allele::N),
            ad       : state.ad,
            dp       : state.dp,
            oth      : state.oth,
            genotypes,
        };
        output.variants.write_record(chrom, &record)?;

        result.retained_snps += 1;
        Ok(())
    }
}
