use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

/// Write the group names (barcodes or sample IDs), one per line, in output
/// column order.
///
/// # Errors
/// Any underlying `io` error.
pub fn write_samples(path: &Path, groups: &[String]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create sample listing {}", path.display()))?;
    let mut sink = BufWriter::new(file);
    for group in groups {
        writeln!(sink, "{group}")?;
    }
    sink.flush().with_context(|| format!("Failed to flush sample listing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_group_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.tsv");
        write_samples(&path, &["AAAC".to_string(), "GGGT".to_string()]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "AAAC\nGGGT\n");
    }
}
