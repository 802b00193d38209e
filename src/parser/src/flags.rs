use crate::ParserError;

/// Recognized SAM flag names and their bit values.
const FLAG_NAMES: [(&str, u16); 12] = [
    ("PAIRED",         0x1),
    ("PROPER_PAIR",    0x2),
    ("UNMAP",          0x4),
    ("MUNMAP",         0x8),
    ("REVERSE",        0x10),
    ("MREVERSE",       0x20),
    ("READ1",          0x40),
    ("READ2",          0x80),
    ("SECONDARY",      0x100),
    ("QCFAIL",         0x200),
    ("DUP",            0x400),
    ("SUPPLEMENTARY",  0x800),
];

/// Parse a SAM flag mask specification.
///
/// Accepted forms (matching `samtools flags` conventions):
/// - decimal:               `772`
/// - hexadecimal:           `0x304`
/// - octal:                 `01404`
/// - comma-separated names: `UNMAP,SECONDARY,QCFAIL`
///
/// # Errors
/// [`ParserError::InvalidFlagString`] on any unparseable token.
pub fn parse_flag_string(spec: &str) -> Result<u16, ParserError> {
    let spec = spec.trim();
    let invalid = || ParserError::InvalidFlagString(spec.to_string());

    if let Some(hex) = spec.strip_prefix("0x").or_else(|| spec.strip_prefix("0X")) {
        return u16::from_str_radix(hex, 16).map_err(|_| invalid());
    }
    if spec.len() > 1 && spec.starts_with('0') && spec.chars().all(|c| c.is_ascii_digit()) {
        return u16::from_str_radix(&spec[1..], 8).map_err(|_| invalid());
    }
    if spec.chars().all(|c| c.is_ascii_digit()) && !spec.is_empty() {
        return spec.parse::<u16>().map_err(|_| invalid());
    }

    spec.split(',')
        .map(|name| {
            let name = name.trim().to_ascii_uppercase();
            FLAG_NAMES
                .iter()
                .find(|(known, _)| *known == name)
                .map(|(_, bit)| *bit)
                .ok_or_else(invalid)
        })
        .try_fold(0u16, |mask, bit| Ok(mask | bit?))
}
