//! Best-effort coercion of raw extract fields.
//!
//! Both extracts come out of spreadsheet tooling, so numeric ids may be
//! rendered as floats (`"42.0"`) and booleans in several spellings. These
//! functions never fail; unusable input becomes `None` / `false`.

use tracing::trace;

/// Parse a manufacturer identifier.
///
/// Accepts ASCII digits optionally followed by a fractional part made only of
/// zeros (`"42"`, `" 42 "`, `"42.0"`). Signs, exponents, letters, empty input
/// and values that overflow `u64` yield `None`.
pub fn parse_manufacturer_id(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (trimmed, None),
    };

    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        trace!("rejecting manufacturer id {:?}", raw);
        return None;
    }

    if let Some(f) = fraction {
        if f.is_empty() || !f.bytes().all(|b| b == b'0') {
            trace!("rejecting fractional manufacturer id {:?}", raw);
            return None;
        }
    }

    whole.parse::<u64>().ok()
}

/// Parse a boolean classification flag.
///
/// `true` (any case), `1` and `1.0` are set; everything else, including an
/// empty or missing field, is unset.
pub fn parse_flag(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.eq_ignore_ascii_case("true") || trimmed == "1" || trimmed == "1.0"
}
