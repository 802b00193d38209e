use thiserror::Error;

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Observation resolved to group {key}, but only {groups} group(s) exist")]
    GroupIndexOutOfRange { key: usize, groups: usize },
}
