use genome::allele::ALLELE_SPACE;
use genome::Snp;

use crate::aggregate::{GroupState, LocusState};
use crate::config::Thresholds;

/// Base qualities are clipped to this PHRED score before entering the
/// likelihood model.
pub const PHRED_MAX: u8 = 45;

/// Floor on the per-base error probability.
pub const ERR_FLOOR: f64 = 0.25;

/// Number of non-N alleles (likelihood matrix columns).
const N_ALLELES: usize = 4;

/// Verdict of the statistics kernel for one locus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocusCall {
    /// Locus passes the thresholds; the state carries AD/DP/OTH (and GLs).
    Retain,
    /// Locus filtered out; nothing is emitted.
    Drop,
}

/// Precomputed per-quality likelihood contributions, in log10 domain.
///
/// For a read of quality `q` (clipped to `[0, PHRED_MAX]`) with
/// `p_err = max(10^(-q/10), ERR_FLOOR)`, an observed base contributes
/// `log10(1 - p_err)` to its own allele column and `log10(p_err / 3)` to
/// every other column.
#[derive(Debug, Clone)]
pub struct QualTable {
    match_l   : [f64; PHRED_MAX as usize + 1],
    mismatch_l: [f64; PHRED_MAX as usize + 1],
    log_half  : f64,
}

impl Default for QualTable {
    fn default() -> Self {
        Self::new()
    }
}

impl QualTable {
    #[must_use]
    pub fn new() -> Self {
        let mut match_l    = [0f64; PHRED_MAX as usize + 1];
        let mut mismatch_l = [0f64; PHRED_MAX as usize + 1];
        for (q, (matched, mismatched)) in match_l.iter_mut().zip(mismatch_l.iter_mut()).enumerate() {
            let p_err = f64::powf(10.0, -(q as f64) / 10.0).max(ERR_FLOOR);
            *matched    = (1.0 - p_err).log10(); // -inf at q = 0; saturated away at PL scaling
            *mismatched = (p_err / 3.0).log10();
        }
        Self { match_l, mismatch_l, log_half: 0.5f64.log10() }
    }

    /// `(log10(1 - p_err), log10(p_err / 3))` for a quality score.
    #[must_use]
    pub fn lookup(&self, qual: u8) -> (f64, f64) {
        let q = qual.min(PHRED_MAX) as usize;
        (self.match_l[q], self.mismatch_l[q])
    }
}

/// Infer `(ref, alt)` alphabet indices as the top-two base counts over
/// {A, C, G, T}; N is ignored. Ties break toward the smaller index. `None`
/// when no non-N base was observed.
#[must_use]
pub fn infer_alleles(bc: &[u32; ALLELE_SPACE]) -> Option<(usize, usize)> {
    if bc[..N_ALLELES].iter().all(|&count| count == 0) {
        return None;
    }
    let mut order = [0usize, 1, 2, 3];
    // stable sort: equal counts keep their (ascending) index order
    order.sort_by_key(|&index| std::cmp::Reverse(bc[index]));
    Some((order[0], order[1]))
}

/// Run the statistics kernel over a fully-pushed locus: aggregate per-group
/// counts, apply the `min_count` and `min_maf` gates, settle REF/ALT, derive
/// AD/DP/OTH globally and per group, and compute genotype likelihoods when
/// requested.
pub fn finalize_locus(
    state: &mut LocusState,
    snp: &Snp,
    thresholds: &Thresholds,
    genotyping: Option<(&QualTable, bool)>,
) -> LocusCall {
    // 1. fold per-group counts into the locus totals
    for group in &state.groups {
        for (total, count) in state.bc.iter_mut().zip(group.bc.iter()) {
            *total += count;
        }
        state.tc += group.tc;
    }

    // 2. depth gate
    if state.tc < thresholds.min_count {
        return LocusCall::Drop;
    }

    // 3. allele inference (an all-N locus cannot be typed)
    let Some((inf_rid, inf_aid)) = infer_alleles(&state.bc) else {
        return LocusCall::Drop;
    };
    state.inf_rid = Some(inf_rid);
    state.inf_aid = Some(inf_aid);

    // 4. minor-allele-fraction gate, on the inferred alternate
    if f64::from(state.bc[inf_aid]) < f64::from(state.tc) * thresholds.min_maf {
        return LocusCall::Drop;
    }

    // 5. settle REF/ALT: the SNP list wins when it supplies a proper pair
    let (ref_idx, alt_idx) = match snp.has_known_alleles() && snp.reference != snp.alternate {
        true  => (snp.reference.index(), snp.alternate.index()),
        false => (inf_rid, inf_aid),
    };
    state.ref_idx = Some(ref_idx);
    state.alt_idx = Some(alt_idx);

    // 6. global AD/DP/OTH
    state.ad  = state.bc[alt_idx];
    state.dp  = state.bc[ref_idx] + state.ad;
    state.oth = state.tc - state.dp;

    // 7.-8. per-group AD/DP/OTH and genotype likelihoods
    for group in &mut state.groups {
        group.ad  = group.bc[alt_idx];
        group.dp  = group.bc[ref_idx] + group.ad;
        group.oth = group.tc - group.dp;
        if let Some((table, double_gl)) = genotyping {
            group.gl = genotype_likelihoods(group, ref_idx, alt_idx, table, double_gl);
        }
    }
    LocusCall::Retain
}

/// log10 genotype likelihoods of one group, from its 5×4 quality matrix.
///
/// `qmat[i][j]` accumulates the per-allele contribution of every quality
/// observed for base `i`; genotypes then combine columns:
/// hom(a) sums column `a`, het(a, b) takes the matched contributions of `a`
/// and `b`, the mismatch mass of the remaining bases, and a `log10(1/2)` term
/// per ref/alt read.
#[must_use]
pub fn genotype_likelihoods(
    group: &GroupState,
    ref_idx: usize,
    alt_idx: usize,
    table: &QualTable,
    double_gl: bool,
) -> Vec<f64> {
    let mut qmat = [[0f64; N_ALLELES]; ALLELE_SPACE];
    for (base, quals) in group.qu.iter().enumerate() {
        for &qual in quals {
            let (match_l, mismatch_l) = table.lookup(qual);
            for (allele, slot) in qmat[base].iter_mut().enumerate() {
                *slot += if allele == base { match_l } else { mismatch_l };
            }
        }
    }

    let hom = |allele: usize| -> f64 { (0..ALLELE_SPACE).map(|base| qmat[base][allele]).sum() };
    let het = |a: usize, b: usize| -> f64 {
        let mismatches: f64 = (0..ALLELE_SPACE)
            .filter(|base| *base != a && *base != b)
            .map(|base| qmat[base][a])
            .sum();
        qmat[a][a]
            + qmat[b][b]
            + mismatches
            + f64::from(group.bc[a] + group.bc[b]) * table.log_half
    };

    match double_gl {
        false => vec![hom(ref_idx), het(ref_idx, alt_idx), hom(alt_idx)],
        true => {
            // all ten unordered allele pairs, VCF genotype order
            let mut gl = Vec::with_capacity(10);
            for k in 0..N_ALLELES {
                for j in 0..=k {
                    gl.push(if j == k { hom(k) } else { het(j, k) });
                }
            }
            gl
        }
    }
}

/// Index of genotype `(j, k)` (`j <= k`, alphabet indices) in the VCF
/// genotype ordering.
#[must_use]
pub fn pair_index(j: usize, k: usize) -> usize {
    let (j, k) = if j <= k { (j, k) } else { (k, j) };
    k * (k + 1) / 2 + j
}

/// Phred-scale log10 genotype likelihoods, saturated at 255.
#[must_use]
pub fn phred_scaled(gl: &[f64]) -> Vec<u32> {
    let best = gl.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    gl.iter()
        .map(|&likelihood| {
            let pl = -10.0 * (likelihood - best);
            if pl.is_finite() && pl < 255.0 {
                pl.round() as u32
            } else {
                255
            }
        })
        .collect()
}

/// Derive the genotype string from phred-scaled likelihoods: the smallest PL
/// among the biallelic {ref/ref, ref/alt, alt/alt} triplet wins, ties give an
/// uncalled `./.`.
#[must_use]
pub fn genotype_call(pl: &[u32], ref_idx: usize, alt_idx: usize, double_gl: bool) -> String {
    let triplet = match double_gl {
        false => [pl[0], pl[1], pl[2]],
        true  => [
            pl[pair_index(ref_idx, ref_idx)],
            pl[pair_index(ref_idx, alt_idx)],
            pl[pair_index(alt_idx, alt_idx)],
        ],
    };
    let best = *triplet.iter().min().expect("triplet is never empty");
    if triplet.iter().filter(|&&value| value == best).count() > 1 {
        return "./.".to_string();
    }
    match triplet.iter().position(|&value| value == best) {
        Some(0) => "0/0",
        Some(1) => "0/1",
        _       => "1/1",
    }
    .to_string()
}
