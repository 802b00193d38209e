mod sparse;
pub use sparse::{merge_shards, MatrixHeader, MatrixWriter, MTX_BANNER};

mod variant;
pub use variant::{GroupGenotype, VariantRecord, VariantWriter};

mod samples;
pub use samples::write_samples;
