pub mod read;
pub mod write;

mod paths;
pub use paths::{prepare_output_dir, shard_path, OutputPaths};
