//! Sort keys for comprehensive-rules numbers.
//!
//! Rule numbers are dotted (`100.1`, `100.1a`, `702.19c`) and do not sort
//! correctly as strings: `100.10` would land before `100.2`. The stores keep a
//! normalised `sort_key` column so `ORDER BY sort_key` recovers document order.
//!
//! # Numbering conventions
//!
//! - Three-digit section prefix: 100, 101, ..., 905
//! - Numeric rule within the section: 100.1, 100.2, ..., 100.10
//! - Letter sub-rule: 100.1a, 100.1b, ... (the letters `l` and `o` are skipped
//!   in the printed rulebook, but that does not affect ordering)

/// Normalise a rule number into a lexicographically-sortable string.
///
/// Input: `"100.1"`, `"100.1a"`, `"702.19c"`
/// Output: `"100.001.000"`, `"100.001.001"`, `"702.019.003"`
///
/// A bare section number (`"100"`) sorts before all its rules. Anything
/// unparsable collapses to zeros rather than failing.
pub fn rule_sort_key(rule_number: &str) -> String {
    let s = rule_number.trim().trim_end_matches('.');
    let (section, rest) = s.split_once('.').unwrap_or((s, ""));

    let section: u32 = section.parse().unwrap_or(0);

    let digit_end = rest
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(rest.len());
    let rule: u32 = rest[..digit_end].parse().unwrap_or(0);

    let letter = rest[digit_end..]
        .bytes()
        .next()
        .filter(u8::is_ascii_alphabetic)
        .map_or(0, |b| (b.to_ascii_lowercase() - b'a') as u32 + 1);

    format!("{section:03}.{rule:03}.{letter:03}")
}
