use std::fs::{self, File};
use std::path::PathBuf;

use ahash::AHashMap;
use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};
use parking_lot::Mutex;

use cellpile_io::shard_path;
use cellpile_io::write::{merge_shards, write_samples, MatrixHeader, MatrixWriter, VariantWriter};

use crate::config::{PileupConfig, SampleMode};
use crate::worker::{ChromWorker, SkipCounts, WorkerOutput, WorkerResult};

/// Aggregated outcome of a completed run.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub workers      : usize,
    pub retained_snps: u64,
    pub nr_ad        : u64,
    pub nr_dp        : u64,
    pub nr_oth       : u64,
    pub skips        : SkipCounts,
}

/// Assign chromosomes to workers as contiguous batches, preserving order.
fn plan_batches(chroms: &[String], n_workers: usize) -> Vec<&[String]> {
    let n_batches = n_workers.min(chroms.len()).max(1);
    let base  = chroms.len() / n_batches;
    let extra = chroms.len() % n_batches;

    let mut batches = Vec::with_capacity(n_batches);
    let mut start = 0;
    for index in 0..n_batches {
        let len = base + usize::from(index < extra);
        batches.push(&chroms[start..start + len]);
        start += len;
    }
    batches
}

fn remove_files(paths: &[PathBuf]) {
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => (),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (),
            Err(e) => warn!("Failed to remove {}: {e}", path.display()),
        }
    }
}

/// Fan the configured chromosomes out over a fixed worker pool, join, and
/// reconcile the per-worker shards into the final outputs.
///
/// On any worker error the remaining workers are drained, every intermediate
/// file is removed, and the first error is propagated; no partial output is
/// left behind.
///
/// # Errors
/// Propagates configuration, worker, and merge errors.
pub fn run_sharded(config: &PileupConfig) -> Result<RunSummary> {
    config.validate()?;
    let batches = plan_batches(&config.chroms, config.effective_workers());
    let n_workers = batches.len();
    let direct = n_workers == 1;
    info!(
        "Launching {n_workers} worker(s) over {} chromosome(s) and {} input file(s)",
        config.chroms.len(),
        config.inputs.len()
    );

    let group_map: AHashMap<String, usize> = match config.sample_mode {
        SampleMode::Barcodes => config
            .groups
            .iter()
            .enumerate()
            .map(|(index, group)| (group.clone(), index))
            .collect(),
        SampleMode::SampleIds => AHashMap::new(),
    };

    // ----------------------------- Allocate per-worker outputs
    let paths = &config.paths;
    let mut outputs: Vec<Option<WorkerOutput>> = Vec::with_capacity(n_workers);
    let mut intermediates: Vec<PathBuf> = Vec::new();
    let mut matrix_shards: [Vec<PathBuf>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    let mut variant_shards: Vec<PathBuf> = Vec::new();

    if direct {
        // single worker: write behind a reserved matrix header, rewritten at the end
        let mut variants = VariantWriter::create(&paths.variants, config.gzip)?;
        variants.write_header(config.emit_genotype.then(|| config.groups.as_slice()))?;
        outputs.push(Some(WorkerOutput {
            ad      : MatrixWriter::direct(&paths.ad)?,
            dp      : MatrixWriter::direct(&paths.dp)?,
            oth     : MatrixWriter::direct(&paths.oth)?,
            variants,
        }));
        intermediates.extend([paths.ad.clone(), paths.dp.clone(), paths.oth.clone(), paths.variants.clone()]);
    } else {
        for worker_id in 0..n_workers {
            let (ad, dp, oth) = (
                shard_path(&paths.ad, worker_id),
                shard_path(&paths.dp, worker_id),
                shard_path(&paths.oth, worker_id),
            );
            let variants = shard_path(&paths.variants, worker_id);
            outputs.push(Some(WorkerOutput {
                ad      : MatrixWriter::shard(&ad)?,
                dp      : MatrixWriter::shard(&dp)?,
                oth     : MatrixWriter::shard(&oth)?,
                variants: VariantWriter::create(&variants, false)?,
            }));
            intermediates.extend([ad.clone(), dp.clone(), oth.clone(), variants.clone()]);
            matrix_shards[0].push(ad);
            matrix_shards[1].push(dp);
            matrix_shards[2].push(oth);
            variant_shards.push(variants);
        }
    }

    // ----------------------------- Submit and join
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_workers)
        .build()
        .context("Failed to build the worker pool")?;
    let results: Mutex<Vec<Option<Result<WorkerResult>>>> =
        Mutex::new((0..n_workers).map(|_| None).collect());

    pool.scope(|scope| {
        for (worker_id, batch) in batches.iter().copied().enumerate() {
            let output = outputs[worker_id].take().expect("worker output consumed twice");
            let (results, group_map) = (&results, &group_map);
            scope.spawn(move |_| {
                let result = ChromWorker::new(worker_id, batch, config, group_map).run(output);
                results.lock()[worker_id] = Some(result);
            });
        }
    });

    // ----------------------------- Collect worker results
    let mut worker_results: Vec<WorkerResult> = Vec::with_capacity(n_workers);
    let mut first_error: Option<anyhow::Error> = None;
    for (worker_id, slot) in results.into_inner().into_iter().enumerate() {
        match slot {
            Some(Ok(result)) => worker_results.push(result),
            Some(Err(e)) => {
                error!("[worker {worker_id}] {e:#}");
                first_error.get_or_insert(e);
            }
            None => {
                first_error
                    .get_or_insert_with(|| anyhow!("[worker {worker_id}] Worker terminated without a result"));
            }
        }
    }
    if let Some(e) = first_error {
        remove_files(&intermediates);
        return Err(e.context("Pileup run failed; intermediate outputs removed"));
    }

    // ----------------------------- Reconcile shards into the final outputs
    let retained_snps: u64 = worker_results.iter().map(|result| result.retained_snps).sum();
    let nr_ad : u64 = worker_results.iter().map(|result| result.nr_ad).sum();
    let nr_dp : u64 = worker_results.iter().map(|result| result.nr_dp).sum();
    let nr_oth: u64 = worker_results.iter().map(|result| result.nr_oth).sum();
    let mut skips = SkipCounts::default();
    for result in &worker_results {
        skips.add(&result.skips);
    }

    let n_groups = config.groups.len() as u64;
    let headers = [
        (&paths.ad,  &matrix_shards[0], MatrixHeader { rows: retained_snps, cols: n_groups, nnz: nr_ad }),
        (&paths.dp,  &matrix_shards[1], MatrixHeader { rows: retained_snps, cols: n_groups, nnz: nr_dp }),
        (&paths.oth, &matrix_shards[2], MatrixHeader { rows: retained_snps, cols: n_groups, nnz: nr_oth }),
    ];
    if direct {
        for (path, _, header) in &headers {
            MatrixWriter::finalize_direct(path, header)?;
        }
    } else {
        let row_bases: Vec<u64> = worker_results
            .iter()
            .scan(0u64, |base, result| {
                let current = *base;
                *base += result.retained_snps;
                Some(current)
            })
            .collect();
        for (path, shards, header) in &headers {
            merge_shards(path, shards, &row_bases, header)?;
        }

        let mut variants = VariantWriter::create(&paths.variants, config.gzip)?;
        variants.write_header(config.emit_genotype.then(|| config.groups.as_slice()))?;
        for shard in &variant_shards {
            let source = File::open(shard)
                .with_context(|| format!("Failed to open variant shard {}", shard.display()))?;
            variants.append_raw(source)?;
        }
        variants.finish()?;

        remove_files(&intermediates);
    }

    write_samples(&paths.samples, &config.groups)?;

    info!(
        "Run complete: {retained_snps} locus/loci retained ({} dropped), nnz AD/DP/OTH = {nr_ad}/{nr_dp}/{nr_oth}",
        skips.dropped_loci
    );
    info!(
        "Skipped events: {} read(s) filtered, {} missing tag(s), {} deletion/refskip/short, {} UMI duplicate(s), {} unlisted barcode(s)",
        skips.reads_rejected, skips.format_skips, skips.filter_skips, skips.umi_duplicates, skips.unlisted_barcodes
    );
    Ok(RunSummary { workers: n_workers, retained_snps, nr_ad, nr_dp, nr_oth, skips })
}
