//! Hex digits of `%XX` escapes.
//!
//! The urlencoded decoder folds escapes in one byte at a time, so an escape
//! split across two writes needs nothing more than a digit lookup.

/// Convert an ASCII hex digit to its numeric value.
///
/// # Example
///
/// ```
/// use formstream_http::hex_value;
///
/// assert_eq!(hex_value(b'a'), Some(10));
/// assert_eq!(hex_value(b'G'), None);
/// ```
#[inline]
#[must_use]
pub const fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
