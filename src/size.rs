//! Human-readable size strings ("10M", "512k") to byte counts and back

use crate::error::{Result, SinkError};

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;

/// Parse a size string into bytes
///
/// Accepts an integer optionally followed by one of `K`, `M` or `G` (either case).
/// Multiples are binary, so `1K` is 1024 bytes. Without a suffix the value is raw bytes.
pub fn parse_size(text: &str) -> Result<u64> {
    let text = text.trim();
    let invalid = || SinkError::InvalidSizeFormat(text.to_string());

    let (digits, multiplier) = match text.char_indices().last() {
        Some((idx, 'K' | 'k')) => (&text[..idx], KIB),
        Some((idx, 'M' | 'm')) => (&text[..idx], MIB),
        Some((idx, 'G' | 'g')) => (&text[..idx], GIB),
        Some(_) => (text, 1),
        None => return Err(invalid()),
    };

    // u64::from_str would accept a leading '+'
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let value: u64 = digits.parse().map_err(|_| invalid())?;
    value.checked_mul(multiplier).ok_or_else(invalid)
}

/// Render a byte count for status output
pub fn format_size(bytes: u64) -> String {
    match bytes {
        b if b >= GIB => format!("{:.1}G", b as f64 / GIB as f64),
        b if b >= MIB => format!("{:.1}M", b as f64 / MIB as f64),
        b if b >= KIB => format!("{:.1}K", b as f64 / KIB as f64),
        b => format!("{}B", b),
    }
}
