pub mod allele;
pub use allele::Allele;

pub mod phred;
pub use phred::Phred;

pub mod snp;
pub use snp::{Snp, SnpSet};
