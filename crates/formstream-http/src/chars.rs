//! Byte classification tables for header and parameter grammars.
//!
//! Each table is a 256-entry lookup indexed by the raw byte, built at
//! compile time so classification is a single load.

macro_rules! byte_table {
    ($pred:ident) => {{
        let mut table = [false; 256];
        let mut i = 0;
        while i < 256 {
            #[allow(clippy::cast_possible_truncation)]
            let b = i as u8;
            table[i] = $pred(b);
            i += 1;
        }
        table
    }};
}

const fn tchar(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'^'
                | b'_'
                | b'`'
                | b'|'
                | b'~'
        )
}

const fn qdtext(b: u8) -> bool {
    matches!(b, b'\t' | b' ' | 0x21 | 0x23..=0x5B | 0x5D..=0x7E | 0x80..=0xFF)
}

const fn field_vchar(b: u8) -> bool {
    matches!(b, b'\t' | b' ' | 0x21..=0x7E | 0x80..=0xFF)
}

// RFC 5987 mime-charsetc
const fn charset_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#' | b'$' | b'%' | b'&' | b'+' | b'-' | b'^' | b'_' | b'`' | b'{' | b'}' | b'~'
        )
}

// RFC 5987 attr-char
const fn attr_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#' | b'$' | b'&' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
        )
}

static TOKEN: [bool; 256] = byte_table!(tchar);
static QDTEXT: [bool; 256] = byte_table!(qdtext);
static FIELD_VCHAR: [bool; 256] = byte_table!(field_vchar);
static CHARSET: [bool; 256] = byte_table!(charset_char);
static ATTR_CHAR: [bool; 256] = byte_table!(attr_char);

#[inline]
pub(crate) fn is_token(b: u8) -> bool {
    TOKEN[usize::from(b)]
}

#[inline]
pub(crate) fn is_qdtext(b: u8) -> bool {
    QDTEXT[usize::from(b)]
}

#[inline]
pub(crate) fn is_field_vchar(b: u8) -> bool {
    FIELD_VCHAR[usize::from(b)]
}

#[inline]
pub(crate) fn is_charset_char(b: u8) -> bool {
    CHARSET[usize::from(b)]
}

#[inline]
pub(crate) fn is_attr_char(b: u8) -> bool {
    ATTR_CHAR[usize::from(b)]
}

/// Lower-cases an ASCII token into an owned string.
pub(crate) fn lower_token(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| char::from(b.to_ascii_lowercase()))
        .collect()
}
