//! Streaming needle search.
//!
//! [`StreamSearch`] finds every occurrence of a fixed needle in a byte stream
//! that arrives in arbitrary slices. Each call to [`scan`](StreamSearch::scan)
//! reports one event and how much input it consumed, so a caller can stop at
//! any event and pick up from the same offset later.
//!
//! When a slice ends with a proper prefix of the needle, those bytes are held
//! back until the next slice shows whether they start a match. If they do
//! not, they come back as [`Scan::Carried`] data, always before any byte of
//! the new slice.
//!
//! # Example
//!
//! ```
//! use formstream_http::{Scan, StreamSearch};
//!
//! let mut search = StreamSearch::new(b"\r\n--XYZ");
//! let mut events = Vec::new();
//! for input in [&b"hello\r\n-"[..], &b"-XYZ--"[..]] {
//!     let mut pos = 0;
//!     while pos < input.len() {
//!         let (consumed, scan) = search.scan(&input[pos..]);
//!         pos += consumed;
//!         match scan {
//!             Some(Scan::Data(data)) => events.push(format!("data {}", String::from_utf8_lossy(data))),
//!             Some(Scan::Carried(data)) => events.push(format!("data {}", String::from_utf8_lossy(&data))),
//!             Some(Scan::Match) => events.push("match".to_string()),
//!             None => {}
//!         }
//!     }
//! }
//! assert_eq!(events, ["data hello", "match", "data --"]);
//! ```

use memchr::memmem::Finder;

/// One event from [`StreamSearch::scan`].
#[derive(Debug, PartialEq, Eq)]
pub enum Scan<'a> {
    /// Input bytes that are not part of a match.
    Data(&'a [u8]),
    /// Previously held-back bytes that turned out not to be part of a match.
    Carried(Vec<u8>),
    /// A complete occurrence of the needle.
    Match,
}

/// Incremental search for one needle across slice boundaries.
#[derive(Debug)]
pub struct StreamSearch {
    finder: Finder<'static>,
    lookbehind: Vec<u8>,
    matches: usize,
}

impl StreamSearch {
    /// Create a searcher for `needle`.
    ///
    /// # Panics
    ///
    /// Panics if `needle` is empty.
    #[must_use]
    pub fn new(needle: &[u8]) -> Self {
        assert!(!needle.is_empty(), "search needle must not be empty");
        Self {
            finder: Finder::new(needle).into_owned(),
            lookbehind: Vec::with_capacity(needle.len()),
            matches: 0,
        }
    }

    /// The needle being searched for.
    #[must_use]
    pub fn needle(&self) -> &[u8] {
        self.finder.needle()
    }

    /// Number of matches reported so far.
    #[must_use]
    pub fn matches(&self) -> usize {
        self.matches
    }

    /// Bytes currently held back as a possible match prefix.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.lookbehind
    }

    /// Hold `prefix` as if it had just been scanned, so a needle that starts
    /// with it can match at the very first input byte. If the input does
    /// not complete the needle, `prefix` comes back as carried data.
    ///
    /// # Panics
    ///
    /// Panics if `prefix` is not a proper prefix of the needle.
    pub fn prime(&mut self, prefix: &[u8]) {
        let needle = self.finder.needle();
        assert!(
            prefix.len() < needle.len() && needle.starts_with(prefix),
            "primer must be a proper needle prefix"
        );
        self.lookbehind.clear();
        self.lookbehind.extend_from_slice(prefix);
    }

    /// Forget any held-back bytes.
    pub fn reset(&mut self) {
        self.lookbehind.clear();
    }

    /// Scan `input` for the next event.
    ///
    /// Returns the number of input bytes consumed and the event, if any.
    /// `None` means every consumed byte is being held back as a possible
    /// match prefix and more input is needed. A `Carried` event consumes no
    /// input.
    pub fn scan<'a>(&mut self, input: &'a [u8]) -> (usize, Option<Scan<'a>>) {
        if !self.lookbehind.is_empty() {
            return self.scan_with_lookbehind(input);
        }
        if input.is_empty() {
            return (0, None);
        }

        let needle_len = self.finder.needle().len();
        if let Some(at) = self.finder.find(input) {
            if at == 0 {
                self.matches += 1;
                return (needle_len, Some(Scan::Match));
            }
            return (at, Some(Scan::Data(&input[..at])));
        }

        let tail = self.partial_suffix(input);
        self.lookbehind.extend_from_slice(&input[tail..]);
        if tail == 0 {
            (input.len(), None)
        } else {
            (input.len(), Some(Scan::Data(&input[..tail])))
        }
    }

    fn scan_with_lookbehind<'a>(&mut self, input: &'a [u8]) -> (usize, Option<Scan<'a>>) {
        if input.is_empty() {
            return (0, None);
        }
        let needle = self.finder.needle();
        let held = self.lookbehind.len();
        let rest = &needle[held..];
        let take = rest.len().min(input.len());

        if input[..take] == rest[..take] {
            if take == rest.len() {
                self.lookbehind.clear();
                self.matches += 1;
                return (take, Some(Scan::Match));
            }
            self.lookbehind.extend_from_slice(input);
            return (input.len(), None);
        }

        // Release the shortest head of the lookbehind that leaves a
        // remainder which is still a needle prefix.
        let release = (1..=held)
            .find(|&k| needle.starts_with(&self.lookbehind[k..]))
            .unwrap_or(held);
        let carried: Vec<u8> = self.lookbehind.drain(..release).collect();
        (0, Some(Scan::Carried(carried)))
    }

    /// Start of the longest suffix of `input` that is a proper needle prefix.
    fn partial_suffix(&self, input: &[u8]) -> usize {
        let needle = self.finder.needle();
        let from = input.len().saturating_sub(needle.len() - 1);
        (from..input.len())
            .find(|&start| needle.starts_with(&input[start..]))
            .unwrap_or(input.len())
    }
}
