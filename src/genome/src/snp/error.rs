use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnpSetError {
    #[error("SnpSet was queried before being sorted. Call finish() once all loci are inserted")]
    Unsorted,
}
