pub mod config;
pub use config::{FilterParams, PileupConfig, SampleMode, Thresholds};

pub mod filter;
pub use filter::ReadFilter;

pub mod extract;
pub use extract::{EventExtractor, Extracted, Observation};

pub mod aggregate;
pub use aggregate::{GroupKeyer, GroupState, LocusState, PushOutcome};

pub mod stats;
pub use stats::{LocusCall, QualTable};

pub mod mplp;
pub use mplp::{LocusColumns, MultiPileup};

pub mod worker;
pub use worker::{ChromWorker, WorkerResult};

pub mod shard;
pub use shard::{run_sharded, RunSummary};

mod run;
pub use run::run;
