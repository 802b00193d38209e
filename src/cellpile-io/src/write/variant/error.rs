use thiserror::Error;

#[derive(Error, Debug)]
pub enum VariantWriterError {
    #[error("Failed to finish gzip stream of variant file")]
    Compression(#[source] gzp::GzpError),
}
