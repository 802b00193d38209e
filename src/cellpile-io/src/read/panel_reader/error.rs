use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PanelReaderError {
    #[error("Barcode panel {} contains no barcode", .0.display())]
    Empty(PathBuf),

    #[error("Duplicate barcode '{barcode}' at line {line}")]
    Duplicate { barcode: String, line: usize },
}
