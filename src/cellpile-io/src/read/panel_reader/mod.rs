mod error;
pub use error::PanelReaderError;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ahash::AHashSet;
use anyhow::{Context, Result};
use log::info;

/// Read a cell-barcode panel: one barcode per line, `#` comments and blank
/// lines ignored. Order is preserved (it defines the output column order).
///
/// # Errors
/// - [`PanelReaderError::Empty`] when no barcode survives.
/// - [`PanelReaderError::Duplicate`] on a repeated barcode.
/// - Any underlying `io` error.
pub fn read_barcodes(path: &Path) -> Result<Vec<String>> {
    let source = BufReader::new(
        File::open(path).with_context(|| format!("Failed to open barcode panel {}", path.display()))?,
    );

    let mut barcodes = Vec::new();
    let mut seen = AHashSet::new();
    for (line_idx, line) in source.lines().enumerate() {
        let line = line.context("Failed to read line from barcode panel")?;
        let barcode = line.trim();
        if barcode.is_empty() || barcode.starts_with('#') {
            continue;
        }
        if !seen.insert(barcode.to_string()) {
            return Err(PanelReaderError::Duplicate { barcode: barcode.to_string(), line: line_idx + 1 }.into());
        }
        barcodes.push(barcode.to_string());
    }

    if barcodes.is_empty() {
        return Err(PanelReaderError::Empty(path.to_path_buf()).into());
    }
    info!("Parsed {} cell barcode(s) from {}", barcodes.len(), path.display());
    Ok(barcodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn panel_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn order_is_preserved() {
        let file = panel_file("# comment\nBC-2\n\nBC-1\nBC-3\n");
        let barcodes = read_barcodes(file.path()).unwrap();
        assert_eq!(barcodes, vec!["BC-2", "BC-1", "BC-3"]);
    }

    #[test]
    fn duplicate_errors() {
        let file = panel_file("BC-1\nBC-1\n");
        assert!(read_barcodes(file.path()).is_err());
    }

    #[test]
    fn empty_panel_errors() {
        let file = panel_file("# only comments\n");
        assert!(read_barcodes(file.path()).is_err());
    }
}
