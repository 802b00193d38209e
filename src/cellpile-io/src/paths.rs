use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;

/// Basename of the variant output (`.gz` appended when compressed).
pub const VARIANT_BASENAME: &str = "cellpile.base.vcf";
/// Basenames of the three sparse count matrices.
pub const AD_BASENAME: &str = "cellpile.tag.AD.mtx";
pub const DP_BASENAME: &str = "cellpile.tag.DP.mtx";
pub const OTH_BASENAME: &str = "cellpile.tag.OTH.mtx";
/// Basename of the group-name listing.
pub const SAMPLES_BASENAME: &str = "cellpile.samples.tsv";

/// Resolved locations of every user-visible output.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub dir     : PathBuf,
    pub variants: PathBuf,
    pub ad      : PathBuf,
    pub dp      : PathBuf,
    pub oth     : PathBuf,
    pub samples : PathBuf,
}

impl OutputPaths {
    #[must_use]
    pub fn new(dir: &Path, gzip: bool) -> Self {
        let variant_name = match gzip {
            true  => format!("{VARIANT_BASENAME}.gz"),
            false => VARIANT_BASENAME.to_string(),
        };
        Self {
            dir     : dir.to_path_buf(),
            variants: dir.join(variant_name),
            ad      : dir.join(AD_BASENAME),
            dp      : dir.join(DP_BASENAME),
            oth     : dir.join(OTH_BASENAME),
            samples : dir.join(SAMPLES_BASENAME),
        }
    }
}

/// Location of one worker's intermediate shard for a given final output.
#[must_use]
pub fn shard_path(final_path: &Path, worker: usize) -> PathBuf {
    let mut name = final_path.as_os_str().to_os_string();
    name.push(format!(".{worker}"));
    PathBuf::from(name)
}

/// Create the output directory (and parents) if missing.
///
/// # Errors
/// Any underlying filesystem error.
pub fn prepare_output_dir(dir: &Path) -> Result<()> {
    debug!("Preparing output directory {}", dir.display());
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_names() {
        let paths = OutputPaths::new(Path::new("out"), false);
        assert_eq!(paths.variants, Path::new("out/cellpile.base.vcf"));
        assert_eq!(paths.ad,       Path::new("out/cellpile.tag.AD.mtx"));

        let gz = OutputPaths::new(Path::new("out"), true);
        assert_eq!(gz.variants, Path::new("out/cellpile.base.vcf.gz"));
    }

    #[test]
    fn shard_naming() {
        let shard = shard_path(Path::new("out/cellpile.tag.AD.mtx"), 3);
        assert_eq!(shard, Path::new("out/cellpile.tag.AD.mtx.3"));
    }
}
