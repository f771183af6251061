//! Streaming `multipart/form-data` decoder.
//!
//! Input runs through a [`StreamSearch`] for `CRLF--boundary`. The searcher
//! is primed with a CRLF so the first boundary, which has no line break in
//! front of it, matches like every other one. Everything between matches is
//! routed by the current [`Phase`]:
//!
//! ```text
//! PREAMBLE --match--> AFTER_BOUNDARY --"--"--> COMPLETE (rest ignored)
//!                          |   \--other--> SKIP (until next match)
//!                         CRLF
//!                          v
//!                       HEADERS --blank line--> BODY --match--> AFTER_BOUNDARY
//! ```
//!
//! Only one part is active at a time. Its payload either accumulates into a
//! field value, streams into a [`FileSink`], or is discarded.

use std::sync::Arc;
use std::task::Waker;

use formstream_http::{
    ContentType, Decoder, EncodeHint, HeaderParser, HeaderStatus, PartHeaders, Scan,
    StreamSearch, latin1_encode, parse_content_type, parse_disposition,
};
use tracing::{debug, trace, warn};

use crate::config::{FormConfig, Limits};
use crate::decoder::{Progress, resolve_charset};
use crate::error::FormError;
use crate::event::{FieldInfo, FileInfo, FormHandler, LimitKind};
use crate::file_stream::{FileSink, Outstanding, PushStatus, channel};

/// Progress through the two bytes that follow a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Start,
    Dash,
    Cr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Preamble,
    AfterBoundary(Marker),
    Headers,
    Body,
    Skip,
    Complete,
    Aborted,
}

#[derive(Debug)]
struct FieldPart {
    name: Option<String>,
    data: Vec<u8>,
    truncated: bool,
    decoder: Decoder,
    encoding: String,
    mime_type: String,
}

#[derive(Debug)]
struct FilePart {
    sink: FileSink,
    size: usize,
    truncated: bool,
}

/// Where the active part's payload goes.
#[derive(Debug)]
enum Target {
    Discard,
    Field(FieldPart),
    File(FilePart),
}

/// Incremental multipart body decoder.
#[derive(Debug)]
pub(crate) struct MultipartDecoder {
    search: StreamSearch,
    header: HeaderParser,
    phase: Phase,
    target: Target,
    limits: Limits,
    field_decoder: Decoder,
    param_decoder: Decoder,
    preserve_path: bool,
    high_water_mark: usize,
    outstanding: Arc<Outstanding>,
    parts: usize,
    files: usize,
    fields: usize,
    parts_hit: bool,
    files_hit: bool,
    fields_hit: bool,
}

impl MultipartDecoder {
    pub(crate) fn new(
        content_type: &ContentType,
        config: &FormConfig,
        outstanding: Arc<Outstanding>,
    ) -> Result<Self, FormError> {
        let boundary = content_type
            .param("boundary")
            .filter(|b| !b.is_empty())
            .and_then(latin1_encode)
            .ok_or(FormError::MissingBoundary)?;
        let field_decoder = resolve_charset(config.get_default_charset())?;
        let param_decoder = resolve_charset(config.get_default_param_charset())?;

        let mut needle = Vec::with_capacity(boundary.len() + 4);
        needle.extend_from_slice(b"\r\n--");
        needle.extend_from_slice(&boundary);
        let mut search = StreamSearch::new(&needle);
        search.prime(b"\r\n");

        debug!(boundary_len = boundary.len(), "multipart decoder created");
        Ok(Self {
            search,
            header: HeaderParser::new(),
            phase: Phase::Preamble,
            target: Target::Discard,
            limits: config.get_limits().clone(),
            field_decoder,
            param_decoder,
            preserve_path: config.get_preserve_path(),
            high_water_mark: config.get_file_high_water_mark(),
            outstanding,
            parts: 0,
            files: 0,
            fields: 0,
            parts_hit: false,
            files_hit: false,
            fields_hit: false,
        })
    }

    /// Feeds `input` until it is used up or a file stream fills up.
    pub(crate) fn write<H: FormHandler>(
        &mut self,
        input: &[u8],
        handler: &mut H,
    ) -> Result<Progress, FormError> {
        let mut pos = 0;
        while pos < input.len() {
            if matches!(self.phase, Phase::Complete | Phase::Aborted) {
                pos = input.len();
                break;
            }
            let (consumed, scan) = self.search.scan(&input[pos..]);
            pos += consumed;
            let status = match scan {
                Some(Scan::Data(data)) => self.on_data(data, handler)?,
                Some(Scan::Carried(data)) => self.on_data(&data, handler)?,
                Some(Scan::Match) => {
                    self.on_boundary(handler)?;
                    PushStatus::Accepted
                }
                None => PushStatus::Accepted,
            };
            if status == PushStatus::Full {
                trace!(consumed = pos, remaining = input.len() - pos, "file stream full");
                return Ok(Progress::blocked(pos));
            }
        }
        Ok(Progress::done(pos))
    }

    /// Validates the end of input.
    pub(crate) fn end(&mut self) -> Result<(), FormError> {
        let err = match self.phase {
            Phase::Complete => return Ok(()),
            Phase::Aborted => return Err(FormError::Closed),
            Phase::Headers => FormError::MalformedPartHeader,
            _ => FormError::UnexpectedEndOfForm,
        };
        warn!(error = %err, "multipart body ended early");
        self.abort(FormError::UnexpectedEndOfFile);
        Err(err)
    }

    /// Tears down the active part. An open file stream fails with `err`.
    pub(crate) fn abort(&mut self, err: FormError) {
        if let Target::File(file) = std::mem::replace(&mut self.target, Target::Discard) {
            file.sink.destroy(err);
        }
        self.header.reset();
        self.search.reset();
        self.phase = Phase::Aborted;
    }

    /// True unless the active file stream is full.
    pub(crate) fn is_ready(&self) -> bool {
        match &self.target {
            Target::File(file) => file.sink.is_ready(),
            _ => true,
        }
    }

    pub(crate) fn register_writer(&self, waker: &Waker) {
        if let Target::File(file) = &self.target {
            file.sink.register_writer(waker);
        }
    }

    fn on_boundary<H: FormHandler>(&mut self, handler: &mut H) -> Result<(), FormError> {
        trace!(parts = self.parts, "boundary");
        match self.phase {
            Phase::Headers => {
                warn!("boundary inside part header block");
                return Err(FormError::MalformedPartHeader);
            }
            Phase::Body => self.finish_part(handler),
            _ => {}
        }
        self.phase = Phase::AfterBoundary(Marker::Start);
        Ok(())
    }

    fn on_data<H: FormHandler>(
        &mut self,
        mut data: &[u8],
        handler: &mut H,
    ) -> Result<PushStatus, FormError> {
        while let Some(&byte) = data.first() {
            match self.phase {
                Phase::Preamble | Phase::Skip | Phase::Complete | Phase::Aborted => break,
                Phase::AfterBoundary(marker) => {
                    match (marker, byte) {
                        (Marker::Start, b'-') => self.phase = Phase::AfterBoundary(Marker::Dash),
                        (Marker::Start, b'\r') => self.phase = Phase::AfterBoundary(Marker::Cr),
                        (Marker::Dash, b'-') => {
                            debug!(parts = self.parts, "multipart body complete");
                            self.phase = Phase::Complete;
                            break;
                        }
                        (Marker::Cr, b'\n') => self.begin_part(handler),
                        _ => {
                            trace!("unexpected bytes after boundary, skipping");
                            self.phase = Phase::Skip;
                            break;
                        }
                    }
                    data = &data[1..];
                }
                Phase::Headers => match self.header.push(data) {
                    Ok(HeaderStatus::Partial) => break,
                    Ok(HeaderStatus::Complete { consumed, headers }) => {
                        data = &data[consumed..];
                        self.start_part(&headers, handler);
                    }
                    Err(err) => {
                        warn!(error = %err, "malformed part header");
                        return Err(FormError::MalformedPartHeader);
                    }
                },
                Phase::Body => return Ok(self.write_body(data)),
            }
        }
        Ok(PushStatus::Accepted)
    }

    fn begin_part<H: FormHandler>(&mut self, handler: &mut H) {
        if self.parts == self.limits.get_parts() {
            if !self.parts_hit {
                self.parts_hit = true;
                debug!(limit = self.parts, "parts limit reached");
                handler.on_limit(LimitKind::Parts);
            }
            self.phase = Phase::Skip;
            return;
        }
        self.parts += 1;
        self.header.reset();
        self.phase = Phase::Headers;
    }

    /// Classifies a part from its finished header block.
    fn start_part<H: FormHandler>(&mut self, headers: &PartHeaders, handler: &mut H) {
        trace!(headers = headers.len(), "part header block");
        self.phase = Phase::Skip;

        let Some(disposition) = headers
            .get("content-disposition")
            .and_then(|raw| parse_disposition(raw, self.param_decoder))
        else {
            debug!("part without usable content-disposition, skipping");
            return;
        };
        if disposition.kind() != "form-data" {
            debug!(kind = disposition.kind(), "non form-data part, skipping");
            return;
        }

        let name = disposition.name().map(str::to_owned);
        let filename = disposition.filename().map(|f| {
            if self.preserve_path {
                f.to_owned()
            } else {
                basename(f)
            }
        });
        let (mime_type, charset) = match headers.get("content-type").and_then(parse_content_type)
        {
            Some(ct) => (
                ct.essence(),
                ct.param("charset").map(str::to_ascii_lowercase),
            ),
            None => ("text/plain".to_owned(), None),
        };
        let encoding = headers
            .get_text("content-transfer-encoding")
            .map_or_else(|| "7bit".to_owned(), |e| e.to_ascii_lowercase());

        if mime_type == "application/octet-stream" || filename.is_some() {
            if self.files == self.limits.get_files() {
                if !self.files_hit {
                    self.files_hit = true;
                    debug!(limit = self.files, "files limit reached");
                    handler.on_limit(LimitKind::Files);
                }
                return;
            }
            self.files += 1;
            if !handler.accepts_files() {
                return;
            }

            debug!(name = ?name, filename = ?filename, mime_type = %mime_type, "file part");
            let (sink, stream) = channel(self.high_water_mark, &self.outstanding);
            self.target = Target::File(FilePart {
                sink,
                size: 0,
                truncated: false,
            });
            self.phase = Phase::Body;
            handler.on_file(
                name,
                stream,
                FileInfo {
                    filename,
                    encoding,
                    mime_type,
                },
            );
        } else {
            if self.fields == self.limits.get_fields() {
                if !self.fields_hit {
                    self.fields_hit = true;
                    debug!(limit = self.fields, "fields limit reached");
                    handler.on_limit(LimitKind::Fields);
                }
                return;
            }
            self.fields += 1;
            if !handler.accepts_fields() {
                return;
            }

            debug!(name = ?name, mime_type = %mime_type, "field part");
            let decoder = charset
                .as_deref()
                .map_or(self.field_decoder, Decoder::for_charset);
            self.target = Target::Field(FieldPart {
                name,
                data: Vec::new(),
                truncated: false,
                decoder,
                encoding,
                mime_type,
            });
            self.phase = Phase::Body;
        }
    }

    fn write_body(&mut self, data: &[u8]) -> PushStatus {
        match &mut self.target {
            Target::Discard => PushStatus::Accepted,
            Target::Field(field) => {
                let room = self.limits.get_field_size().saturating_sub(field.data.len());
                let take = room.min(data.len());
                field.data.extend_from_slice(&data[..take]);
                if take < data.len() && !field.truncated {
                    field.truncated = true;
                    debug!(name = ?field.name, "field size limit reached");
                }
                PushStatus::Accepted
            }
            Target::File(file) => {
                let room = self.limits.get_file_size().saturating_sub(file.size);
                let take = room.min(data.len());
                file.size += take;
                let status = if take > 0 {
                    file.sink.push(&data[..take])
                } else {
                    PushStatus::Accepted
                };
                if take < data.len() && !file.truncated {
                    file.truncated = true;
                    file.sink.mark_truncated();
                    debug!(size = file.size, "file size limit reached");
                }
                status
            }
        }
    }

    fn finish_part<H: FormHandler>(&mut self, handler: &mut H) {
        match std::mem::replace(&mut self.target, Target::Discard) {
            Target::Discard => {}
            Target::File(file) => {
                trace!(size = file.size, truncated = file.truncated, "file part finished");
                file.sink.finish();
            }
            Target::Field(field) => {
                let Some(value) = field.decoder.decode(&field.data, EncodeHint::Ascii) else {
                    debug!(name = ?field.name, "field charset unsupported, dropping value");
                    return;
                };
                handler.on_field(
                    field.name,
                    value,
                    FieldInfo {
                        name_truncated: false,
                        value_truncated: field.truncated,
                        encoding: field.encoding,
                        mime_type: field.mime_type,
                    },
                );
            }
        }
    }
}

/// Strips directory components, treating `/` and `\` as separators.
fn basename(path: &str) -> String {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    if name == "." || name == ".." {
        String::new()
    } else {
        name.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_stream::{FileRead, FileStream};

    const EXAMPLE: &[u8] = b"--XYZ\r\n\
        Content-Disposition: form-data; name=\"a\"\r\n\r\n\
        hello\r\n\
        --XYZ\r\n\
        Content-Disposition: form-data; name=\"f\"; filename=\"t.txt\"\r\n\
        Content-Type: application/octet-stream\r\n\r\n\
        BINARYDATA\r\n\
        --XYZ--\r\n";

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        files: Vec<(FileInfo, FileStream)>,
        reject_files: bool,
    }

    impl FormHandler for Recorder {
        fn on_field(&mut self, name: Option<String>, value: String, info: FieldInfo) {
            let flag = if info.value_truncated { " (truncated)" } else { "" };
            self.events.push(format!(
                "field {}={value}{flag}",
                name.as_deref().unwrap_or("-")
            ));
        }

        fn on_file(&mut self, name: Option<String>, stream: FileStream, info: FileInfo) {
            self.events.push(format!(
                "file {} {}",
                name.as_deref().unwrap_or("-"),
                info.filename.as_deref().unwrap_or("-")
            ));
            self.files.push((info, stream));
        }

        fn on_limit(&mut self, kind: LimitKind) {
            self.events.push(format!("limit {kind}"));
        }

        fn accepts_files(&self) -> bool {
            !self.reject_files
        }
    }

    fn decoder(config: &FormConfig) -> MultipartDecoder {
        let ct = parse_content_type("multipart/form-data; boundary=XYZ").unwrap();
        MultipartDecoder::new(&ct, config, Outstanding::new()).unwrap()
    }

    fn run_with(body: &[u8], config: &FormConfig, rec: &mut Recorder) -> Result<(), FormError> {
        let mut dec = decoder(config);
        let progress = dec.write(body, rec)?;
        assert!(!progress.is_blocked());
        assert_eq!(progress.consumed(), body.len());
        dec.end()
    }

    fn run(body: &[u8], config: &FormConfig) -> (Recorder, Result<(), FormError>) {
        let mut rec = Recorder::default();
        let result = run_with(body, config, &mut rec);
        (rec, result)
    }

    fn read_all(stream: &mut FileStream) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            match stream.try_read() {
                FileRead::Chunk(chunk) => out.extend_from_slice(&chunk),
                FileRead::Limit => {}
                FileRead::End => return out,
                other => panic!("unexpected read: {other:?}"),
            }
        }
    }

    fn part(disposition: &str, extra: &str, body: &str) -> String {
        format!("--XYZ\r\nContent-Disposition: {disposition}\r\n{extra}\r\n{body}\r\n")
    }

    #[test]
    fn test_field_and_file() {
        let (mut rec, result) = run(EXAMPLE, &FormConfig::default());
        assert_eq!(result, Ok(()));
        assert_eq!(rec.events, ["field a=hello", "file f t.txt"]);
        let (info, stream) = &mut rec.files[0];
        assert_eq!(info.mime_type, "application/octet-stream");
        assert_eq!(info.encoding, "7bit");
        assert_eq!(read_all(stream), b"BINARYDATA");
        assert!(!stream.truncated());
    }

    #[test]
    fn test_preamble_and_epilogue_ignored() {
        let mut body = b"this is a preamble\r\n".to_vec();
        body.extend_from_slice(EXAMPLE);
        body.extend_from_slice(b"epilogue --XYZ\r\ngarbage");
        let (rec, result) = run(&body, &FormConfig::default());
        assert_eq!(result, Ok(()));
        assert_eq!(rec.events, ["field a=hello", "file f t.txt"]);
    }

    #[test]
    fn test_empty_form() {
        let (rec, result) = run(b"--XYZ--", &FormConfig::default());
        assert_eq!(result, Ok(()));
        assert!(rec.events.is_empty());
    }

    #[test]
    fn test_part_without_disposition_is_skipped() {
        let body = format!(
            "--XYZ\r\nContent-Type: text/plain\r\n\r\nlost\r\n{}--XYZ--",
            part("form-data; name=\"b\"", "", "kept")
        );
        let (rec, result) = run(body.as_bytes(), &FormConfig::default());
        assert_eq!(result, Ok(()));
        assert_eq!(rec.events, ["field b=kept"]);
    }

    #[test]
    fn test_non_form_data_disposition_is_skipped() {
        let body = format!(
            "{}{}--XYZ--",
            part("attachment; name=\"a\"", "", "lost"),
            part("form-data; name=\"b\"", "", "kept")
        );
        let (rec, _) = run(body.as_bytes(), &FormConfig::default());
        assert_eq!(rec.events, ["field b=kept"]);
    }

    #[test]
    fn test_part_without_name() {
        let body = format!("{}--XYZ--", part("form-data", "", "anon"));
        let (rec, _) = run(body.as_bytes(), &FormConfig::default());
        assert_eq!(rec.events, ["field -=anon"]);
    }

    #[test]
    fn test_extended_filename_wins_and_is_stripped() {
        let body = format!(
            "{}--XYZ--",
            part(
                "form-data; name=\"f\"; filename=\"plain.txt\"; filename*=UTF-8''dir%2F%E2%82%AC.txt",
                "",
                "x"
            )
        );
        let (rec, _) = run(body.as_bytes(), &FormConfig::default());
        assert_eq!(rec.events, ["file f €.txt"]);
    }

    #[test]
    fn test_malformed_extended_parameter_skips_part() {
        let body = format!(
            "{}{}--XYZ--",
            part("form-data; name=\"f\"; filename*=UTF-8''%ZZ", "", "lost"),
            part("form-data; name=\"b\"", "", "kept")
        );
        let (rec, result) = run(body.as_bytes(), &FormConfig::default());
        assert_eq!(result, Ok(()));
        assert_eq!(rec.events, ["field b=kept"]);
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("../../etc/passfile"), "passfile");
        assert_eq!(basename("dir\\sub\\name.txt"), "name.txt");
        assert_eq!(basename("name.txt"), "name.txt");
        assert_eq!(basename("a/.."), "");
        assert_eq!(basename("."), "");
        assert_eq!(basename("dir/"), "");
    }

    #[test]
    fn test_preserve_path() {
        let body = format!(
            "{}--XYZ--",
            part("form-data; name=\"f\"; filename=\"../../etc/passfile\"", "", "x")
        );
        let (rec, _) = run(body.as_bytes(), &FormConfig::default());
        assert_eq!(rec.events, ["file f passfile"]);

        let config = FormConfig::new().preserve_path(true);
        let (rec, _) = run(body.as_bytes(), &config);
        assert_eq!(rec.events, ["file f ../../etc/passfile"]);
    }

    #[test]
    fn test_part_charset_selects_decoder() {
        let mut body = part(
            "form-data; name=\"a\"",
            "Content-Type: text/plain; charset=ISO-8859-1\r\n",
            "caf",
        )
        .into_bytes();
        // splice a raw 0xE9 before the trailing CRLF of the part body
        let at = body.len() - 2;
        body.insert(at, 0xE9);
        body.extend_from_slice(b"--XYZ--");
        let (rec, _) = run(&body, &FormConfig::default());
        assert_eq!(rec.events, ["field a=café"]);
    }

    #[test]
    fn test_unsupported_part_charset_drops_field_but_counts() {
        let body = format!(
            "{}{}--XYZ--",
            part(
                "form-data; name=\"a\"",
                "Content-Type: text/plain; charset=x-unknown\r\n",
                "lost"
            ),
            part("form-data; name=\"b\"", "", "over limit")
        );
        let config = FormConfig::new().limits(Limits::new().fields(1));
        let (rec, result) = run(body.as_bytes(), &config);
        assert_eq!(result, Ok(()));
        assert_eq!(rec.events, ["limit fields"]);
    }

    #[test]
    fn test_field_info() {
        struct Infos(Vec<FieldInfo>);
        impl FormHandler for Infos {
            fn on_field(&mut self, _name: Option<String>, _value: String, info: FieldInfo) {
                self.0.push(info);
            }
        }

        let body = format!(
            "{}--XYZ--",
            part(
                "form-data; name=\"a\"",
                "Content-Type: Text/Markdown; charset=utf-8\r\nContent-Transfer-Encoding: QUOTED-PRINTABLE\r\n",
                "x"
            )
        );
        let mut dec = decoder(&FormConfig::default());
        let mut infos = Infos(Vec::new());
        dec.write(body.as_bytes(), &mut infos).unwrap();
        dec.end().unwrap();
        assert_eq!(
            infos.0,
            [FieldInfo {
                name_truncated: false,
                value_truncated: false,
                encoding: "quoted-printable".into(),
                mime_type: "text/markdown".into(),
            }]
        );
    }

    #[test]
    fn test_files_limit_fires_once() {
        let file = part("form-data; name=\"f\"; filename=\"a\"", "", "data");
        let body = format!("{file}{file}{file}--XYZ--");
        let config = FormConfig::new().limits(Limits::new().files(1));
        let (rec, result) = run(body.as_bytes(), &config);
        assert_eq!(result, Ok(()));
        assert_eq!(rec.events, ["file f a", "limit files"]);
    }

    #[test]
    fn test_rejected_files_still_count() {
        let file = part("form-data; name=\"f\"; filename=\"a\"", "", "data");
        let body = format!("{file}{file}--XYZ--");
        let config = FormConfig::new().limits(Limits::new().files(1));
        let mut rec = Recorder {
            reject_files: true,
            ..Recorder::default()
        };
        run_with(body.as_bytes(), &config, &mut rec).unwrap();
        assert_eq!(rec.events, ["limit files"]);
    }

    #[test]
    fn test_parts_limit() {
        let body = format!(
            "{}{}{}--XYZ--",
            part("form-data; name=\"a\"", "", "1"),
            part("form-data; name=\"b\"", "", "2"),
            part("form-data; name=\"c\"", "", "3")
        );
        let config = FormConfig::new().limits(Limits::new().parts(1));
        let (rec, result) = run(body.as_bytes(), &config);
        assert_eq!(result, Ok(()));
        assert_eq!(rec.events, ["field a=1", "limit parts"]);
    }

    #[test]
    fn test_field_size_truncation() {
        let body = format!(
            "{}{}--XYZ--",
            part("form-data; name=\"a\"", "", "hello"),
            part("form-data; name=\"b\"", "", "abc")
        );
        let config = FormConfig::new().limits(Limits::new().field_size(3));
        let (rec, _) = run(body.as_bytes(), &config);
        assert_eq!(rec.events, ["field a=hel (truncated)", "field b=abc"]);
    }

    #[test]
    fn test_file_size_limit() {
        let config = FormConfig::new().limits(Limits::new().file_size(4));
        let (mut rec, result) = run(EXAMPLE, &config);
        assert_eq!(result, Ok(()));
        let (_, stream) = &mut rec.files[0];
        assert_eq!(stream.try_read(), FileRead::Chunk(b"BINA".to_vec()));
        assert_eq!(stream.try_read(), FileRead::Limit);
        assert_eq!(stream.try_read(), FileRead::End);
        assert!(stream.truncated());
    }

    #[test]
    fn test_file_of_exact_limit_is_not_truncated() {
        let config = FormConfig::new().limits(Limits::new().file_size(10));
        let (mut rec, _) = run(EXAMPLE, &config);
        let (_, stream) = &mut rec.files[0];
        assert_eq!(read_all(stream), b"BINARYDATA");
        assert!(!stream.truncated());
    }

    #[test]
    fn test_illegal_header_byte_is_fatal() {
        let body = b"--XYZ\r\nContent-Disposition: form-data;\x01 name=\"a\"\r\n\r\nx\r\n--XYZ--";
        let (rec, result) = run(body, &FormConfig::default());
        assert_eq!(result, Err(FormError::MalformedPartHeader));
        assert!(rec.events.is_empty());
    }

    #[test]
    fn test_boundary_inside_header_block_is_fatal() {
        let body = b"--XYZ\r\nContent-Disposition: form-data\r\n--XYZ--";
        let mut dec = decoder(&FormConfig::default());
        let mut rec = Recorder::default();
        assert_eq!(
            dec.write(body, &mut rec).unwrap_err(),
            FormError::MalformedPartHeader
        );
    }

    #[test]
    fn test_missing_terminator_fails_open_file() {
        let body = b"--XYZ\r\nContent-Disposition: form-data; name=\"f\"; filename=\"t\"\r\n\r\npartial";
        let (mut rec, result) = run(body, &FormConfig::default());
        assert_eq!(result, Err(FormError::UnexpectedEndOfForm));
        let (_, stream) = &mut rec.files[0];
        assert_eq!(
            stream.try_read(),
            FileRead::Failed(FormError::UnexpectedEndOfFile)
        );
    }

    #[test]
    fn test_unterminated_header_block_at_end() {
        let (_, result) = run(b"--XYZ\r\nContent-Disposition: form", &FormConfig::default());
        assert_eq!(result, Err(FormError::MalformedPartHeader));
    }

    #[test]
    fn test_garbage_after_boundary_skips_part() {
        let body = format!(
            "--XYZjunk\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nlost\r\n{}--XYZ--",
            part("form-data; name=\"b\"", "", "kept")
        );
        let (rec, result) = run(body.as_bytes(), &FormConfig::default());
        assert_eq!(result, Ok(()));
        assert_eq!(rec.events, ["field b=kept"]);
    }

    #[test]
    fn test_backpressure_stops_and_resumes() {
        let config = FormConfig::new().file_high_water_mark(4);
        let mut dec = decoder(&config);
        let mut rec = Recorder::default();

        let progress = dec.write(EXAMPLE, &mut rec).unwrap();
        assert!(progress.is_blocked());
        assert_eq!(&EXAMPLE[progress.consumed()..], b"\r\n--XYZ--\r\n");
        assert!(!dec.is_ready());

        let (_, stream) = &mut rec.files[0];
        assert_eq!(stream.try_read(), FileRead::Chunk(b"BINARYDATA".to_vec()));
        assert!(dec.is_ready());

        let rest = &EXAMPLE[progress.consumed()..];
        let progress = dec.write(rest, &mut rec).unwrap();
        assert!(!progress.is_blocked());
        assert_eq!(dec.end(), Ok(()));
        let (_, stream) = &mut rec.files[0];
        assert_eq!(stream.try_read(), FileRead::End);
    }

    #[test]
    fn test_abort_destroys_active_file() {
        let body = b"--XYZ\r\nContent-Disposition: form-data; name=\"f\"; filename=\"t\"\r\n\r\npart";
        let mut dec = decoder(&FormConfig::default());
        let mut rec = Recorder::default();
        dec.write(body, &mut rec).unwrap();
        dec.abort(FormError::Aborted);
        let (_, stream) = &mut rec.files[0];
        assert_eq!(stream.try_read(), FileRead::Failed(FormError::Aborted));
        assert_eq!(dec.end(), Err(FormError::Closed));
    }

    #[test]
    fn test_missing_boundary() {
        let ct = parse_content_type("multipart/form-data").unwrap();
        let err = MultipartDecoder::new(&ct, &FormConfig::default(), Outstanding::new())
            .unwrap_err();
        assert_eq!(err, FormError::MissingBoundary);

        let ct = parse_content_type("multipart/form-data; boundary=\"\"").unwrap();
        let err = MultipartDecoder::new(&ct, &FormConfig::default(), Outstanding::new())
            .unwrap_err();
        assert_eq!(err, FormError::MissingBoundary);
    }
}
