mod fixture;
pub use fixture::{sam_read, Workspace};

/// Parsed Matrix Market coordinate file: dimensions line + data triplets.
#[derive(Debug, PartialEq, Eq)]
pub struct Matrix {
    pub rows: u64,
    pub cols: u64,
    pub nnz : u64,
    pub data: Vec<(u64, u64, u32)>,
}

pub fn read_matrix(path: &std::path::Path) -> Matrix {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|_| panic!("Failed to open {}", path.display()));
    let mut lines = content.lines();
    assert_eq!(lines.next().unwrap(), "%%MatrixMarket matrix coordinate integer general");
    assert_eq!(lines.next().unwrap(), "%");

    let dims: Vec<u64> = lines
        .next()
        .unwrap()
        .trim()
        .split('\t')
        .map(|field| field.parse().unwrap())
        .collect();
    let data = lines
        .map(|line| {
            let fields: Vec<&str> = line.split('\t').collect();
            (fields[0].parse().unwrap(), fields[1].parse().unwrap(), fields[2].parse().unwrap())
        })
        .collect();
    Matrix { rows: dims[0], cols: dims[1], nnz: dims[2], data }
}

/// Data lines (non-`#`) of a variant output.
pub fn read_variant_lines(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_else(|_| panic!("Failed to open {}", path.display()))
        .lines()
        .filter(|line| !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
