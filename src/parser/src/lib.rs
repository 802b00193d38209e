mod parser;
pub use crate::parser::{Cli, FilterArgs, ThresholdArgs, UmiMode};

mod flags;
pub use flags::parse_flag_string;

mod error;
pub use error::ParserError;
