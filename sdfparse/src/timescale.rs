//! Timescale strings (`1ps`, `10 ns`, `100.0 us`) to numeric scale.

use crate::SdfError;

/// Unit suffix and its size in femtoseconds.
const UNITS: [(&str, u64); 6] = [
    ("ms", 1_000_000_000_000),
    ("us", 1_000_000_000),
    ("ns", 1_000_000),
    ("ps", 1_000),
    ("fs", 1),
    ("s", 1_000_000_000_000_000),
];

/// Size of the timescale unit in femtoseconds.
///
/// The base must be `1`, `10` or `100`, optionally written with `.0`.
pub fn scale_fs(timescale: &str) -> Result<u64, SdfError> {
    let invalid = || SdfError::InvalidTimescale(timescale.to_string());
    let s = timescale.trim_start();
    let digits = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let base: u64 = match &s[..digits] {
        "1" => 1,
        "10" => 10,
        "100" => 100,
        _ => return Err(invalid()),
    };
    let rest = &s[digits..];
    let rest = rest.strip_prefix(".0").unwrap_or(rest).trim_start();
    let (_, unit) = UNITS
        .iter()
        .find(|(suffix, _)| rest.starts_with(suffix))
        .ok_or_else(invalid)?;
    Ok(base * unit)
}

/// Size of the timescale unit in seconds.
pub fn scale_seconds(timescale: &str) -> Result<f64, SdfError> {
    Ok(1e-15 * scale_fs(timescale)? as f64)
}
