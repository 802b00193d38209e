use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SparseWriterError {
    #[error("Matrix dimensions line '{dims}' exceeds the {width} characters reserved for in-place rewrite")]
    HeaderOverflow { dims: String, width: usize },

    #[error("Malformed row '{line}' in matrix shard {}", .shard.display())]
    MalformedShardRow { shard: PathBuf, line: String },
}
