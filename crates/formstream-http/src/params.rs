//! `Content-Type` and `Content-Disposition` parsing.
//!
//! Both headers share the grammar
//!
//! ```text
//! value     = token [ "/" token ] *( OWS ";" OWS parameter ) OWS
//! parameter = token "=" ( token / quoted-string )
//! ```
//!
//! Content-Disposition additionally accepts RFC 5987 extended parameters
//! (`name*=charset'lang'pct-encoded`), which are percent-decoded and run
//! through the named charset. Parameter names are lower-cased; when a name
//! repeats, the first occurrence wins.
//!
//! Anything that does not fit the grammar makes the whole header unusable and
//! the parser returns `None`.

use std::collections::BTreeMap;

use crate::chars::{is_attr_char, is_charset_char, is_qdtext, is_token, lower_token};
use crate::charset::{Decoder, EncodeHint, latin1_decode};
use crate::percent::hex_value;

/// A parsed media type such as `multipart/form-data; boundary=x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    main_type: String,
    subtype: String,
    params: BTreeMap<String, String>,
}

impl ContentType {
    /// The lower-cased top-level type (`multipart`).
    #[must_use]
    pub fn main_type(&self) -> &str {
        &self.main_type
    }

    /// The lower-cased subtype (`form-data`).
    #[must_use]
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// `type/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.subtype)
    }

    /// Returns true if this is `main_type/subtype` (compared case-insensitively).
    #[must_use]
    pub fn is(&self, main_type: &str, subtype: &str) -> bool {
        self.main_type.eq_ignore_ascii_case(main_type) && self.subtype.eq_ignore_ascii_case(subtype)
    }

    /// Look up a parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        lookup(&self.params, name)
    }

    /// All parameters, keyed by lower-cased name.
    #[must_use]
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }
}

/// A parsed `Content-Disposition` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disposition {
    kind: String,
    params: BTreeMap<String, String>,
}

impl Disposition {
    /// The lower-cased disposition type (`form-data`).
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Look up a parameter by name. Extended parameters keep their `*`.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        lookup(&self.params, name)
    }

    /// All parameters, keyed by lower-cased name.
    #[must_use]
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// The `name` parameter.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.param("name")
    }

    /// The `filename*` parameter if present, else `filename`.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.param("filename*").or_else(|| self.param("filename"))
    }
}

fn lookup<'a>(params: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    match params.get(name) {
        Some(value) => Some(value.as_str()),
        None if name.bytes().any(|b| b.is_ascii_uppercase()) => {
            params.get(&name.to_ascii_lowercase()).map(String::as_str)
        }
        None => None,
    }
}

/// Parse a `Content-Type` value.
///
/// # Example
///
/// ```
/// use formstream_http::parse_content_type;
///
/// let ct = parse_content_type("Multipart/Form-Data; boundary=\"a b\"").unwrap();
/// assert_eq!(ct.essence(), "multipart/form-data");
/// assert_eq!(ct.param("boundary"), Some("a b"));
///
/// assert!(parse_content_type("text").is_none());
/// ```
#[must_use]
pub fn parse_content_type(input: impl AsRef<[u8]>) -> Option<ContentType> {
    let s = input.as_ref();
    let slash = s.iter().position(|&b| !is_token(b))?;
    if slash == 0 || s[slash] != b'/' {
        return None;
    }

    let sub_start = slash + 1;
    let sub_end = s[sub_start..]
        .iter()
        .position(|&b| !is_token(b))
        .map_or(s.len(), |p| sub_start + p);
    if sub_end == sub_start {
        return None;
    }

    let params = parse_params(s, sub_end, None)?;
    Some(ContentType {
        main_type: lower_token(&s[..slash]),
        subtype: lower_token(&s[sub_start..sub_end]),
        params,
    })
}

/// Parse a `Content-Disposition` value.
///
/// `decoder` handles ordinary parameter values (the caller's default
/// parameter charset). Extended values use the charset they name. A
/// malformed extended value, or one whose charset cannot be decoded,
/// rejects the whole header.
///
/// # Example
///
/// ```
/// use formstream_http::{Decoder, parse_disposition};
///
/// let disp = parse_disposition(
///     "form-data; name=\"doc\"; filename*=UTF-8''%E2%82%AC.txt",
///     Decoder::Latin1,
/// )
/// .unwrap();
/// assert_eq!(disp.kind(), "form-data");
/// assert_eq!(disp.name(), Some("doc"));
/// assert_eq!(disp.filename(), Some("€.txt"));
/// ```
#[must_use]
pub fn parse_disposition(input: impl AsRef<[u8]>, decoder: Decoder) -> Option<Disposition> {
    let s = input.as_ref();
    if s.is_empty() {
        return None;
    }
    let end = s.iter().position(|&b| !is_token(b)).unwrap_or(s.len());
    let params = parse_params(s, end, Some(decoder))?;
    Some(Disposition {
        kind: lower_token(&s[..end]),
        params,
    })
}

fn skip_ws(s: &[u8], mut i: usize) -> usize {
    while i < s.len() && (s[i] == b' ' || s[i] == b'\t') {
        i += 1;
    }
    i
}

/// Parses `*( OWS ";" OWS parameter ) OWS` starting at `i`.
///
/// With a decoder the disposition rules apply: `name*` is an extended
/// parameter and every value is decoded. Without one, values are read as
/// Latin-1 and `*` has no special meaning.
fn parse_params(
    s: &[u8],
    mut i: usize,
    decoder: Option<Decoder>,
) -> Option<BTreeMap<String, String>> {
    let mut params = BTreeMap::new();
    loop {
        i = skip_ws(s, i);
        if i == s.len() {
            return Some(params);
        }
        if s[i] != b';' {
            return None;
        }
        i = skip_ws(s, i + 1);
        if i == s.len() {
            return None;
        }

        let name_start = i;
        while i < s.len() && is_token(s[i]) {
            i += 1;
        }
        if i == s.len() || s[i] != b'=' {
            return None;
        }
        let name = &s[name_start..i];
        i += 1;

        let value = match decoder {
            Some(decoder) if name.last() == Some(&b'*') => {
                let (value, next) = parse_extended_value(s, i)?;
                i = next;
                value
            }
            _ => {
                let (raw, next) = parse_plain_value(s, i)?;
                i = next;
                match decoder {
                    Some(decoder) => decoder.decode(&raw, EncodeHint::PercentHigh)?,
                    None => latin1_decode(&raw),
                }
            }
        };

        params.entry(lower_token(name)).or_insert(value);
    }
}

/// Parses `token / quoted-string` at `i`, returning the raw value bytes.
fn parse_plain_value(s: &[u8], mut i: usize) -> Option<(Vec<u8>, usize)> {
    if i == s.len() {
        return None;
    }
    if s[i] != b'"' {
        let start = i;
        while i < s.len() && is_token(s[i]) {
            i += 1;
        }
        if i == start {
            return None;
        }
        return Some((s[start..i].to_vec(), i));
    }

    i += 1;
    let mut value = Vec::new();
    let mut escaping = false;
    loop {
        let &b = s.get(i)?;
        i += 1;
        match b {
            b'\\' | b'"' if escaping => {
                value.push(b);
                escaping = false;
            }
            b'\\' => escaping = true,
            b'"' => return Some((value, i)),
            _ => {
                if escaping {
                    // a backslash before an ordinary character is kept, so
                    // unescaped Windows paths survive
                    value.push(b'\\');
                    escaping = false;
                }
                if !is_qdtext(b) {
                    return None;
                }
                value.push(b);
            }
        }
    }
}

/// Parses `charset "'" [ language ] "'" value-chars` at `i` and decodes it.
fn parse_extended_value(s: &[u8], mut i: usize) -> Option<(String, usize)> {
    let charset_start = i;
    while i < s.len() && is_charset_char(s[i]) {
        i += 1;
    }
    if i == s.len() || s[i] != b'\'' {
        return None;
    }
    let charset = latin1_decode(&s[charset_start..i]);
    i += 1;

    // language tag: parsed, then ignored
    while i < s.len() && s[i] != b'\'' {
        i += 1;
    }
    if i == s.len() {
        return None;
    }
    i += 1;
    if i == s.len() {
        return None;
    }

    let mut bytes = Vec::new();
    let mut hint = EncodeHint::Ascii;
    while i < s.len() {
        let b = s[i];
        if is_attr_char(b) {
            bytes.push(b);
            i += 1;
        } else if b == b'%' {
            let hi = s.get(i + 1).copied().and_then(hex_value)?;
            let lo = s.get(i + 2).copied().and_then(hex_value)?;
            let byte = (hi << 4) | lo;
            hint = hint.with_escape(byte);
            bytes.push(byte);
            i += 3;
        } else {
            break;
        }
    }

    let value = Decoder::for_charset(&charset).decode(&bytes, hint)?;
    Some((value, i))
}
