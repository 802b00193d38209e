use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("A global logger was already initialized")]
    AlreadySet,
}
