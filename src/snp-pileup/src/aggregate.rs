mod error;
pub use error::AggregateError;

use ahash::{AHashMap, AHashSet};
use genome::allele::ALLELE_SPACE;

use crate::extract::Observation;

/// Outcome of pushing one observation into the aggregation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Inserted,
    /// The `(group, UMI)` pair was already counted at this locus.
    DuplicateUmi,
    /// Barcode mode: the cell tag is not part of the panel.
    NotInSet,
}

/// Resolves an observation to its output column.
#[derive(Debug, Clone, Copy)]
pub enum GroupKeyer<'a> {
    /// Lookup of the cell-tag value in the barcode panel.
    Barcodes(&'a AHashMap<String, usize>),
    /// Column = index of the originating input file.
    SampleIds,
}

impl GroupKeyer<'_> {
    fn key(&self, observation: &Observation, file_index: usize) -> Option<usize> {
        match self {
            Self::Barcodes(map) => {
                let cell = observation.cell.as_deref()?;
                map.get(cell).copied()
            }
            Self::SampleIds => Some(file_index),
        }
    }
}

/// Per-group aggregation state: base counts, per-base quality lists, and the
/// UMI deduplication set. Allocated once per worker, cleared between loci.
#[derive(Debug, Default)]
pub struct GroupState {
    /// Base counts over {A, C, G, T, N}.
    pub bc: [u32; ALLELE_SPACE],
    /// Base qualities observed per base.
    pub qu: [Vec<u8>; ALLELE_SPACE],
    /// Total observation count. Maintained equal to `bc` summed.
    pub tc: u32,
    /// Filled by the statistics kernel on retained loci.
    pub ad : u32,
    pub dp : u32,
    pub oth: u32,
    /// log10 genotype likelihoods (3 or 10 entries) when genotyping.
    pub gl : Vec<f64>,
    seen_umis: AHashSet<String>,
}

impl GroupState {
    fn reset(&mut self) {
        self.bc = [0; ALLELE_SPACE];
        for quals in &mut self.qu {
            quals.clear();
        }
        self.tc = 0;
        self.ad = 0;
        self.dp = 0;
        self.oth = 0;
        self.gl.clear();
        self.seen_umis.clear();
    }
}

/// Full per-locus aggregation state (every group plus the global counters),
/// reset between loci.
#[derive(Debug)]
pub struct LocusState {
    pub groups : Vec<GroupState>,
    /// Global base counts (sum of the per-group ones, filled at statistics).
    pub bc     : [u32; ALLELE_SPACE],
    pub tc     : u32,
    pub ad     : u32,
    pub dp     : u32,
    pub oth    : u32,
    /// Working REF/ALT alphabet indices. `None` until supplied or inferred.
    pub ref_idx: Option<usize>,
    pub alt_idx: Option<usize>,
    /// Inferred REF/ALT indices (always computed on retained loci).
    pub inf_rid: Option<usize>,
    pub inf_aid: Option<usize>,
}

impl LocusState {
    #[must_use]
    pub fn new(n_groups: usize) -> Self {
        Self {
            groups : (0..n_groups).map(|_| GroupState::default()).collect(),
            bc     : [0; ALLELE_SPACE],
            tc     : 0,
            ad     : 0,
            dp     : 0,
            oth    : 0,
            ref_idx: None,
            alt_idx: None,
            inf_rid: None,
            inf_aid: None,
        }
    }

    /// Clear every per-group structure and global counter. Buffers keep their
    /// allocations.
    pub fn reset(&mut self) {
        for group in &mut self.groups {
            group.reset();
        }
        self.bc = [0; ALLELE_SPACE];
        self.tc = 0;
        self.ad = 0;
        self.dp = 0;
        self.oth = 0;
        self.ref_idx = None;
        self.alt_idx = None;
        self.inf_rid = None;
        self.inf_aid = None;
    }

    /// Route one observation into its group, deduplicating on `(group, UMI)`:
    /// the first observation of a UMI wins, later copies are dropped silently.
    ///
    /// # Errors
    /// [`AggregateError::GroupIndexOutOfRange`] when the resolved column does
    /// not exist (internal inconsistency).
    pub fn push(
        &mut self,
        observation: Observation,
        file_index: usize,
        keyer: &GroupKeyer,
    ) -> Result<PushOutcome, AggregateError> {
        let Some(key) = keyer.key(&observation, file_index) else {
            return Ok(PushOutcome::NotInSet);
        };
        let n_groups = self.groups.len();
        let group = self
            .groups
            .get_mut(key)
            .ok_or(AggregateError::GroupIndexOutOfRange { key, groups: n_groups })?;

        if let Some(umi) = observation.umi {
            if !group.seen_umis.insert(umi) {
                return Ok(PushOutcome::DuplicateUmi);
            }
        }

        let base = observation.base.index();
        group.bc[base] += 1;
        group.qu[base].push(observation.qual);
        group.tc += 1;
        Ok(PushOutcome::Inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genome::Allele;

    fn observation(base: Allele, qual: u8, cell: Option<&str>, umi: Option<&str>) -> Observation {
        Observation {
            base,
            qual,
            cell: cell.map(str::to_string),
            umi: umi.map(str::to_string),
        }
    }

    fn barcode_map(barcodes: &[&str]) -> AHashMap<String, usize> {
        barcodes.iter().enumerate().map(|(index, barcode)| (barcode.to_string(), index)).collect()
    }

    #[test]
    fn counts_accumulate_per_group() {
        let map = barcode_map(&["c1", "c2"]);
        let keyer = GroupKeyer::Barcodes(&map);
        let mut state = LocusState::new(2);

        for (base, cell) in [(Allele::A, "c1"), (Allele::A, "c1"), (Allele::C, "c2")] {
            let outcome = state.push(observation(base, 30, Some(cell), None), 0, &keyer).unwrap();
            assert_eq!(outcome, PushOutcome::Inserted);
        }

        assert_eq!(state.groups[0].bc[0], 2);
        assert_eq!(state.groups[0].tc, 2);
        assert_eq!(state.groups[0].qu[0], vec![30, 30]);
        assert_eq!(state.groups[1].bc[1], 1);
    }

    #[test]
    fn group_tc_matches_base_counts() {
        let keyer = GroupKeyer::SampleIds;
        let mut state = LocusState::new(1);
        for base in [Allele::A, Allele::G, Allele::G, Allele::N] {
            state.push(observation(base, 10, None, None), 0, &keyer).unwrap();
        }
        let group = &state.groups[0];
        assert_eq!(group.tc, group.bc.iter().sum::<u32>());
    }

    #[test]
    fn unknown_barcode_is_not_counted() {
        let map = barcode_map(&["c1"]);
        let keyer = GroupKeyer::Barcodes(&map);
        let mut state = LocusState::new(1);

        let outcome = state.push(observation(Allele::A, 30, Some("cX"), None), 0, &keyer).unwrap();
        assert_eq!(outcome, PushOutcome::NotInSet);
        assert_eq!(state.groups[0].tc, 0);
    }

    #[test]
    fn duplicate_umi_first_seen_wins() {
        let map = barcode_map(&["c1"]);
        let keyer = GroupKeyer::Barcodes(&map);
        let mut state = LocusState::new(1);

        assert_eq!(
            state.push(observation(Allele::C, 30, Some("c1"), Some("UMI-1")), 0, &keyer).unwrap(),
            PushOutcome::Inserted
        );
        assert_eq!(
            state.push(observation(Allele::C, 20, Some("c1"), Some("UMI-1")), 0, &keyer).unwrap(),
            PushOutcome::DuplicateUmi
        );

        // first-seen quality is the one retained
        assert_eq!(state.groups[0].bc[1], 1);
        assert_eq!(state.groups[0].qu[1], vec![30]);
    }

    #[test]
    fn same_umi_in_distinct_groups_counts_twice() {
        let map = barcode_map(&["c1", "c2"]);
        let keyer = GroupKeyer::Barcodes(&map);
        let mut state = LocusState::new(2);

        for cell in ["c1", "c2"] {
            assert_eq!(
                state.push(observation(Allele::T, 30, Some(cell), Some("UMI-1")), 0, &keyer).unwrap(),
                PushOutcome::Inserted
            );
        }
        assert_eq!(state.groups[0].bc[3] + state.groups[1].bc[3], 2);
    }

    #[test]
    fn sample_mode_keys_on_file_index() {
        let keyer = GroupKeyer::SampleIds;
        let mut state = LocusState::new(2);
        state.push(observation(Allele::G, 30, None, None), 1, &keyer).unwrap();
        assert_eq!(state.groups[0].tc, 0);
        assert_eq!(state.groups[1].bc[2], 1);
    }

    #[test]
    fn out_of_range_file_index_is_internal_error() {
        let keyer = GroupKeyer::SampleIds;
        let mut state = LocusState::new(1);
        assert!(state.push(observation(Allele::G, 30, None, None), 3, &keyer).is_err());
    }

    #[test]
    fn reset_clears_umi_memory() {
        let map = barcode_map(&["c1"]);
        let keyer = GroupKeyer::Barcodes(&map);
        let mut state = LocusState::new(1);

        state.push(observation(Allele::A, 30, Some("c1"), Some("UMI-1")), 0, &keyer).unwrap();
        state.reset();
        assert_eq!(
            state.push(observation(Allele::A, 30, Some("c1"), Some("UMI-1")), 0, &keyer).unwrap(),
            PushOutcome::Inserted
        );
    }
}
