use formstream_http::{HeaderParser, HeaderStatus, Scan, StreamSearch};
use proptest::prelude::*;

/// Runs the searcher over `input` cut at `cuts`, returning the data between
/// matches.
fn segments(needle: &[u8], input: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
    let mut search = StreamSearch::new(needle);
    let mut out = vec![Vec::new()];
    let mut bounds: Vec<usize> = cuts.iter().map(|c| c % (input.len() + 1)).collect();
    bounds.push(0);
    bounds.push(input.len());
    bounds.sort_unstable();
    bounds.dedup();

    for pair in bounds.windows(2) {
        let slice = &input[pair[0]..pair[1]];
        let mut pos = 0;
        while pos < slice.len() {
            let (consumed, scan) = search.scan(&slice[pos..]);
            pos += consumed;
            match scan {
                Some(Scan::Data(data)) => out.last_mut().unwrap().extend_from_slice(data),
                Some(Scan::Carried(data)) => out.last_mut().unwrap().extend_from_slice(&data),
                Some(Scan::Match) => out.push(Vec::new()),
                None => {}
            }
        }
    }
    out.last_mut().unwrap().extend_from_slice(search.pending());
    out
}

proptest! {
    #[test]
    fn search_is_split_independent(
        parts in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..40), 1..6),
        cuts in proptest::collection::vec(any::<usize>(), 0..8),
    ) {
        let needle = b"\r\n--xq";
        let input = parts.join(&needle[..]);
        let whole = segments(needle, &input, &[]);
        let split = segments(needle, &input, &cuts);
        prop_assert_eq!(&whole, &split);
        prop_assert_eq!(whole.concat().len() + (whole.len() - 1) * needle.len(), input.len());
    }

    #[test]
    fn header_block_is_split_independent(cut in 0usize..80) {
        let block: &[u8] =
            b"Content-Disposition: form-data; name=\"f\"\r\nContent-Type:\r\n text/plain\r\n\r\nbody";
        let cut = cut.min(block.len());

        let mut parser = HeaderParser::new();
        let mut result = None;
        let mut offset = 0;
        for slice in [&block[..cut], &block[cut..]] {
            if result.is_some() {
                break;
            }
            match parser.push(slice).unwrap() {
                HeaderStatus::Partial => offset += slice.len(),
                HeaderStatus::Complete { consumed, headers } => {
                    result = Some((offset + consumed, headers));
                }
            }
        }

        let (end, headers) = result.unwrap();
        prop_assert_eq!(&block[end..], b"body");
        prop_assert_eq!(headers.get("content-disposition"), Some(&b"form-data; name=\"f\""[..]));
        prop_assert_eq!(headers.get("content-type"), Some(&b" text/plain"[..]));
    }
}
