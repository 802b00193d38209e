mod snp_reader;
pub use snp_reader::{SnpFormat, SnpReader};

mod panel_reader;
pub use panel_reader::read_barcodes;
