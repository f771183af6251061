//! Body type dispatch and the write/resume/end driver.
//!
//! [`FormDecoder`] picks a body decoder from the `Content-Type` once, then
//! takes input through [`write`](FormDecoder::write). When a file stream
//! fills up, the decoder keeps the unprocessed input and reports
//! [`WriteStatus::Blocked`]; later writes are queued behind it, never
//! dropped. [`resume`](FormDecoder::resume) or
//! [`ready`](FormDecoder::ready) pick up from the held position once the
//! consumer has read.
//!
//! # Example
//!
//! ```
//! use formstream_core::{Completion, FieldInfo, FormConfig, FormDecoder, FormHandler};
//!
//! #[derive(Default)]
//! struct Fields(Vec<(String, String)>);
//!
//! impl FormHandler for Fields {
//!     fn on_field(&mut self, name: Option<String>, value: String, _info: FieldInfo) {
//!         self.0.push((name.unwrap_or_default(), value));
//!     }
//! }
//!
//! let mut decoder = FormDecoder::new(
//!     "application/x-www-form-urlencoded",
//!     FormConfig::default(),
//!     Fields::default(),
//! )
//! .unwrap();
//! decoder.write(b"greeting=hello+world&n=").unwrap();
//! decoder.write(b"42").unwrap();
//! assert_eq!(decoder.end().unwrap(), Completion::Finished);
//!
//! let fields = decoder.into_handler().0;
//! assert_eq!(fields[0], ("greeting".to_string(), "hello world".to_string()));
//! assert_eq!(fields[1], ("n".to_string(), "42".to_string()));
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};

use formstream_http::{ContentType, Decoder, parse_content_type};
use tracing::{debug, trace};

use crate::config::FormConfig;
use crate::error::FormError;
use crate::event::FormHandler;
use crate::file_stream::Outstanding;
use crate::multipart::MultipartDecoder;
use crate::urlencoded::UrlEncodedDecoder;

/// How much of an input slice a body decoder used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Progress {
    consumed: usize,
    blocked: bool,
}

impl Progress {
    pub(crate) fn done(consumed: usize) -> Self {
        Self {
            consumed,
            blocked: false,
        }
    }

    pub(crate) fn blocked(consumed: usize) -> Self {
        Self {
            consumed,
            blocked: true,
        }
    }

    pub(crate) fn consumed(self) -> usize {
        self.consumed
    }

    pub(crate) fn is_blocked(self) -> bool {
        self.blocked
    }
}

/// Looks up a configured charset, failing if it names no decoder.
pub(crate) fn resolve_charset(label: &str) -> Result<Decoder, FormError> {
    let decoder = Decoder::for_charset(label);
    if decoder.is_supported() {
        Ok(decoder)
    } else {
        Err(FormError::UnsupportedCharset {
            charset: label.to_owned(),
        })
    }
}

/// The body formats a [`FormDecoder`] understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// `multipart/form-data`
    Multipart,
    /// `application/x-www-form-urlencoded`
    UrlEncoded,
}

impl BodyKind {
    /// Picks the body kind for a parsed `Content-Type`.
    #[must_use]
    pub fn detect(content_type: &ContentType) -> Option<Self> {
        if content_type.is("multipart", "form-data") {
            Some(Self::Multipart)
        } else if content_type.is("application", "x-www-form-urlencoded") {
            Some(Self::UrlEncoded)
        } else {
            None
        }
    }
}

/// Outcome of [`FormDecoder::write`] and [`FormDecoder::resume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// All input so far has been processed.
    Ready,
    /// A file stream is full; input is held until the consumer reads it.
    Blocked,
}

/// Outcome of [`FormDecoder::end`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The body is done and `on_close` has fired.
    Finished,
    /// Held input or unread file streams remain.
    Pending,
}

#[derive(Debug)]
enum Machine {
    Multipart(MultipartDecoder),
    UrlEncoded(UrlEncodedDecoder),
}

impl Machine {
    fn is_ready(&self) -> bool {
        match self {
            Self::Multipart(m) => m.is_ready(),
            Self::UrlEncoded(_) => true,
        }
    }

    fn abort(&mut self, err: FormError) {
        if let Self::Multipart(m) = self {
            m.abort(err);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Finished,
    Failed,
    Destroyed,
}

/// Streaming decoder for one form body.
#[derive(Debug)]
pub struct FormDecoder<H: FormHandler> {
    kind: BodyKind,
    machine: Machine,
    handler: H,
    held: Vec<u8>,
    cursor: usize,
    state: State,
    end_requested: bool,
    input_done: bool,
    outstanding: Arc<Outstanding>,
}

impl<H: FormHandler> FormDecoder<H> {
    /// Create a decoder for a body with the given `Content-Type` value.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the content type is missing,
    /// malformed, of an unsupported kind, lacks a multipart boundary, or a
    /// charset names no decoder.
    pub fn new(content_type: &str, config: FormConfig, handler: H) -> Result<Self, FormError> {
        let content_type = content_type.trim();
        if content_type.is_empty() {
            return Err(FormError::MissingContentType);
        }
        let parsed = parse_content_type(content_type).ok_or(FormError::MalformedContentType)?;
        let kind = BodyKind::detect(&parsed).ok_or_else(|| FormError::UnsupportedContentType {
            content_type: parsed.essence(),
        })?;

        let outstanding = Outstanding::new();
        let machine = match kind {
            BodyKind::Multipart => Machine::Multipart(MultipartDecoder::new(
                &parsed,
                &config,
                Arc::clone(&outstanding),
            )?),
            BodyKind::UrlEncoded => {
                Machine::UrlEncoded(UrlEncodedDecoder::new(&parsed, &config)?)
            }
        };

        debug!(kind = ?kind, "form decoder created");
        Ok(Self {
            kind,
            machine,
            handler,
            held: Vec::new(),
            cursor: 0,
            state: State::Open,
            end_requested: false,
            input_done: false,
            outstanding,
        })
    }

    /// Create a decoder from request headers.
    ///
    /// The `content-type` header is looked up case-insensitively.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn from_headers<I, K, V>(headers: I, config: FormConfig, handler: H) -> Result<Self, FormError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let content_type = headers
            .into_iter()
            .find(|(name, _)| name.as_ref().eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value)
            .ok_or(FormError::MissingContentType)?;
        Self::new(content_type.as_ref(), config, handler)
    }

    /// The body kind chosen from the content type.
    #[must_use]
    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    /// Feed the next chunk of the body.
    ///
    /// Returns [`WriteStatus::Blocked`] while the active file stream is full,
    /// even if the whole chunk was processed. Chunks written in that state
    /// are queued, not processed.
    ///
    /// # Errors
    ///
    /// Returns the malformed-input error that stopped decoding, once;
    /// [`FormError::Closed`] after that, after [`end`](Self::end), or after
    /// [`destroy`](Self::destroy).
    pub fn write(&mut self, chunk: &[u8]) -> Result<WriteStatus, FormError> {
        self.check_open()?;
        if self.end_requested {
            return Err(FormError::Closed);
        }
        if self.is_blocked() {
            self.held.drain(..self.cursor);
            self.cursor = 0;
            self.held.extend_from_slice(chunk);
            trace!(held = self.held.len(), "queued input behind full file stream");
            self.drain()?;
            return Ok(self.status());
        }

        let progress = self.process(chunk)?;
        if progress.is_blocked() {
            self.held.clear();
            self.held.extend_from_slice(&chunk[progress.consumed()..]);
            self.cursor = 0;
            trace!(held = self.held.len(), "decoder suspended");
        }
        Ok(self.status())
    }

    /// Retry held input after a file stream has been read.
    ///
    /// If [`end`](Self::end) was already requested and the input drains,
    /// this also attempts completion.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    pub fn resume(&mut self) -> Result<WriteStatus, FormError> {
        self.check_open()?;
        self.drain()?;
        if !self.has_held() && self.end_requested {
            self.complete()?;
        }
        Ok(self.status())
    }

    /// True while a file stream is full or input is held behind one.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.has_held() || !self.machine.is_ready()
    }

    /// Number of file streams the consumer has not finished with.
    #[must_use]
    pub fn outstanding_files(&self) -> usize {
        self.outstanding.count()
    }

    /// True once `on_close` has fired.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Poll until the active file stream has room and held input has been
    /// processed.
    pub fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), FormError>> {
        if let Err(err) = self.check_open() {
            return Poll::Ready(Err(err));
        }
        loop {
            if !self.is_blocked() {
                return Poll::Ready(Ok(()));
            }
            if self.machine.is_ready() {
                if let Err(err) = self.drain() {
                    return Poll::Ready(Err(err));
                }
                continue;
            }
            self.register_writer(cx);
            if !self.machine.is_ready() {
                return Poll::Pending;
            }
        }
    }

    /// Wait until the active file stream has room and held input has been
    /// processed.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    pub async fn ready(&mut self) -> Result<(), FormError> {
        std::future::poll_fn(|cx| self.poll_ready(cx)).await
    }

    /// Signal the end of the body.
    ///
    /// Returns [`Completion::Pending`] while held input or unread file
    /// streams remain; call again, or use [`close`](Self::close), once the
    /// consumer has caught up.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::UnexpectedEndOfForm`] if the closing boundary
    /// never arrived, or any other malformed-input error.
    pub fn end(&mut self) -> Result<Completion, FormError> {
        self.check_open()?;
        self.end_requested = true;
        self.complete()
    }

    /// Poll for completion: process held input, validate the end of the
    /// body and wait for every file stream to finish.
    pub fn poll_close(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), FormError>> {
        if self.state == State::Finished {
            return Poll::Ready(Ok(()));
        }
        if let Err(err) = self.check_open() {
            return Poll::Ready(Err(err));
        }
        self.end_requested = true;
        loop {
            match self.complete() {
                Err(err) => return Poll::Ready(Err(err)),
                Ok(Completion::Finished) => return Poll::Ready(Ok(())),
                Ok(Completion::Pending) => {}
            }
            if self.has_held() {
                self.register_writer(cx);
                if !self.machine.is_ready() {
                    return Poll::Pending;
                }
            } else {
                self.outstanding.register(cx.waker());
                if self.outstanding.count() > 0 {
                    return Poll::Pending;
                }
            }
        }
    }

    /// Finish the body and wait for every file stream to be read.
    ///
    /// # Errors
    ///
    /// Same as [`end`](Self::end).
    pub async fn close(&mut self) -> Result<(), FormError> {
        std::future::poll_fn(|cx| self.poll_close(cx)).await
    }

    /// Abort decoding. An open file stream fails with
    /// [`FormError::Aborted`]; no further events fire.
    pub fn destroy(&mut self) {
        if self.state != State::Open {
            return;
        }
        debug!(kind = ?self.kind, "form decoder destroyed");
        self.machine.abort(FormError::Aborted);
        self.held = Vec::new();
        self.cursor = 0;
        self.state = State::Destroyed;
    }

    /// Borrow the handler.
    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Mutably borrow the handler.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Consume the decoder and return the handler.
    ///
    /// An unfinished file stream fails with [`FormError::Aborted`].
    pub fn into_handler(self) -> H {
        self.handler
    }

    fn check_open(&self) -> Result<(), FormError> {
        match self.state {
            State::Open => Ok(()),
            State::Finished | State::Failed | State::Destroyed => Err(FormError::Closed),
        }
    }

    fn register_writer(&self, cx: &Context<'_>) {
        if let Machine::Multipart(m) = &self.machine {
            m.register_writer(cx.waker());
        }
    }

    /// Runs one slice through the body decoder, failing the whole decoder
    /// on error.
    fn process(&mut self, input: &[u8]) -> Result<Progress, FormError> {
        let result = match &mut self.machine {
            Machine::Multipart(m) => m.write(input, &mut self.handler),
            Machine::UrlEncoded(u) => u.write(input, &mut self.handler),
        };
        result.map_err(|err| self.fail(err))
    }

    fn has_held(&self) -> bool {
        self.cursor < self.held.len()
    }

    fn status(&self) -> WriteStatus {
        if self.is_blocked() {
            WriteStatus::Blocked
        } else {
            WriteStatus::Ready
        }
    }

    /// Processes held input for as long as the active file stream has room.
    fn drain(&mut self) -> Result<(), FormError> {
        while self.has_held() {
            if !self.machine.is_ready() {
                return Ok(());
            }
            let held = std::mem::take(&mut self.held);
            let progress = self.process(&held[self.cursor..])?;
            self.held = held;
            self.cursor += progress.consumed();
        }
        if self.cursor > 0 {
            trace!("decoder resumed");
        }
        self.held.clear();
        self.cursor = 0;
        Ok(())
    }

    fn complete(&mut self) -> Result<Completion, FormError> {
        self.drain()?;
        if self.has_held() {
            return Ok(Completion::Pending);
        }
        if !self.input_done {
            self.input_done = true;
            let result = match &mut self.machine {
                Machine::Multipart(m) => m.end(),
                Machine::UrlEncoded(u) => u.end(&mut self.handler),
            };
            result.map_err(|err| self.fail(err))?;
        }
        if self.outstanding.count() > 0 {
            trace!(files = self.outstanding.count(), "waiting for file streams");
            return Ok(Completion::Pending);
        }
        self.state = State::Finished;
        debug!(kind = ?self.kind, "form decoded");
        self.handler.on_close();
        Ok(Completion::Finished)
    }

    fn fail(&mut self, err: FormError) -> FormError {
        self.machine.abort(err.clone());
        self.held = Vec::new();
        self.cursor = 0;
        self.state = State::Failed;
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use crate::event::{FieldInfo, FileInfo};
    use crate::file_stream::{FileRead, FileStream};
    use futures_executor::block_on;

    const MULTIPART: &str = "multipart/form-data; boundary=XYZ";

    #[derive(Debug, Default)]
    struct Recorder {
        fields: Vec<(String, String)>,
        files: Vec<FileStream>,
        closed: usize,
    }

    impl FormHandler for Recorder {
        fn on_field(&mut self, name: Option<String>, value: String, _info: FieldInfo) {
            self.fields.push((name.unwrap_or_default(), value));
        }

        fn on_file(&mut self, _name: Option<String>, stream: FileStream, _info: FileInfo) {
            self.files.push(stream);
        }

        fn on_close(&mut self) {
            self.closed += 1;
        }
    }

    fn file_body(content: &str) -> Vec<u8> {
        format!(
            "--XYZ\r\n\
             Content-Disposition: form-data; name=\"f\"; filename=\"a.bin\"\r\n\r\n\
             {content}\r\n\
             --XYZ--\r\n"
        )
        .into_bytes()
    }

    fn new_decoder(content_type: &str, config: FormConfig) -> FormDecoder<Recorder> {
        FormDecoder::new(content_type, config, Recorder::default()).unwrap()
    }

    #[test]
    fn test_detects_body_kind() {
        let dec = new_decoder(MULTIPART, FormConfig::default());
        assert_eq!(dec.kind(), BodyKind::Multipart);
        let dec = new_decoder(
            "Application/X-WWW-Form-Urlencoded; charset=utf-8",
            FormConfig::default(),
        );
        assert_eq!(dec.kind(), BodyKind::UrlEncoded);
    }

    #[test]
    fn test_configuration_errors() {
        let err = |ct: &str| {
            FormDecoder::new(ct, FormConfig::default(), Recorder::default()).unwrap_err()
        };
        assert_eq!(err(""), FormError::MissingContentType);
        assert_eq!(err("   "), FormError::MissingContentType);
        assert_eq!(err("multipart"), FormError::MalformedContentType);
        assert_eq!(
            err("text/plain"),
            FormError::UnsupportedContentType {
                content_type: "text/plain".into()
            }
        );
        assert_eq!(err("multipart/form-data"), FormError::MissingBoundary);
        assert_eq!(err("multipart/form-data; boundary=\"\""), FormError::MissingBoundary);
        assert_eq!(
            err("application/x-www-form-urlencoded; charset=klingon"),
            FormError::UnsupportedCharset {
                charset: "klingon".into()
            }
        );
    }

    #[test]
    fn test_unsupported_default_charset() {
        let config = FormConfig::default().default_charset("nope");
        let err = FormDecoder::new(MULTIPART, config, Recorder::default()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_from_headers() {
        let headers = [("Host", "example.com"), ("Content-Type", MULTIPART)];
        let dec = FormDecoder::from_headers(headers, FormConfig::default(), Recorder::default())
            .unwrap();
        assert_eq!(dec.kind(), BodyKind::Multipart);

        let none: [(&str, &str); 0] = [];
        let err = FormDecoder::from_headers(none, FormConfig::default(), Recorder::default())
            .unwrap_err();
        assert_eq!(err, FormError::MissingContentType);
    }

    #[test]
    fn test_urlencoded_round() {
        let mut dec = new_decoder("application/x-www-form-urlencoded", FormConfig::default());
        assert_eq!(dec.write(b"a=1&b=%4").unwrap(), WriteStatus::Ready);
        assert_eq!(dec.write(b"1").unwrap(), WriteStatus::Ready);
        assert_eq!(dec.end().unwrap(), Completion::Finished);
        assert!(dec.is_finished());
        let rec = dec.into_handler();
        assert_eq!(
            rec.fields,
            [("a".to_string(), "1".to_string()), ("b".to_string(), "A".to_string())]
        );
        assert_eq!(rec.closed, 1);
    }

    #[test]
    fn test_write_after_end_is_closed() {
        let mut dec = new_decoder("application/x-www-form-urlencoded", FormConfig::default());
        dec.end().unwrap();
        assert_eq!(dec.write(b"x=1"), Err(FormError::Closed));
        assert_eq!(dec.end(), Err(FormError::Closed));
        assert_eq!(dec.handler().closed, 1);
    }

    #[test]
    fn test_error_is_reported_once() {
        let mut dec = new_decoder("application/x-www-form-urlencoded", FormConfig::default());
        assert_eq!(dec.write(b"a=%zz"), Err(FormError::MalformedUrlEncoded));
        assert_eq!(dec.write(b"b=1"), Err(FormError::Closed));
        assert_eq!(dec.end(), Err(FormError::Closed));
        assert_eq!(dec.handler().closed, 0);
    }

    #[test]
    fn test_truncated_multipart_fails_open_file() {
        let mut dec = new_decoder(MULTIPART, FormConfig::default());
        let body = file_body("partial");
        let cut = body.len() - 11;
        assert_eq!(dec.write(&body[..cut]).unwrap(), WriteStatus::Ready);
        assert_eq!(dec.end(), Err(FormError::UnexpectedEndOfForm));

        let mut stream = dec.handler_mut().files.pop().unwrap();
        assert_eq!(stream.bytes_received(), 7);
        assert_eq!(stream.try_read(), FileRead::Failed(FormError::UnexpectedEndOfFile));
        assert_eq!(dec.handler().closed, 0);
    }

    #[test]
    fn test_end_waits_for_file_consumer() {
        let mut dec = new_decoder(MULTIPART, FormConfig::default());
        assert_eq!(dec.write(&file_body("content")).unwrap(), WriteStatus::Ready);
        assert_eq!(dec.outstanding_files(), 1);
        assert_eq!(dec.end().unwrap(), Completion::Pending);
        assert_eq!(dec.handler().closed, 0);

        let mut stream = dec.handler_mut().files.pop().unwrap();
        assert_eq!(stream.try_read(), FileRead::Chunk(b"content".to_vec()));
        assert_eq!(dec.end().unwrap(), Completion::Pending);
        assert_eq!(stream.try_read(), FileRead::End);
        assert_eq!(dec.outstanding_files(), 0);
        assert_eq!(dec.end().unwrap(), Completion::Finished);
        assert_eq!(dec.handler().closed, 1);
    }

    #[test]
    fn test_dropped_stream_counts_as_finished() {
        let mut dec = new_decoder(MULTIPART, FormConfig::default());
        dec.write(&file_body("ignored")).unwrap();
        dec.handler_mut().files.clear();
        assert_eq!(dec.end().unwrap(), Completion::Finished);
    }

    #[test]
    fn test_backpressure_holds_and_queues_input() {
        let config = FormConfig::default().file_high_water_mark(4);
        let mut dec = new_decoder(MULTIPART, config);
        let body = file_body("0123456789abcdef");
        let (first, second) = body.split_at(body.len() - 5);

        assert_eq!(dec.write(first).unwrap(), WriteStatus::Blocked);
        assert!(dec.is_blocked());
        // Queued behind the held input, not processed.
        assert_eq!(dec.write(second).unwrap(), WriteStatus::Blocked);
        assert_eq!(dec.end().unwrap(), Completion::Pending);

        let mut stream = dec.handler_mut().files.pop().unwrap();
        let mut content = Vec::new();
        loop {
            content.extend(stream.read_available());
            if dec.resume().unwrap() == WriteStatus::Ready {
                break;
            }
        }
        loop {
            match stream.try_read() {
                FileRead::Chunk(chunk) => content.extend(chunk),
                FileRead::End => break,
                other => panic!("unexpected read: {other:?}"),
            }
        }
        assert_eq!(content, b"0123456789abcdef");
        assert_eq!(dec.end().unwrap(), Completion::Finished);
        assert_eq!(dec.handler().closed, 1);
    }

    #[test]
    fn test_stream_filled_at_chunk_end_blocks() {
        let config = FormConfig::default().file_high_water_mark(4);
        let mut dec = new_decoder(MULTIPART, config);
        let header = b"--XYZ\r\n\
            Content-Disposition: form-data; name=\"f\"; filename=\"a.bin\"\r\n\r\n";
        assert_eq!(dec.write(header).unwrap(), WriteStatus::Ready);

        for _ in 0..100 {
            assert_eq!(dec.write(b"0123456789").unwrap(), WriteStatus::Blocked);
        }
        assert!(dec.is_blocked());
        let mut cx = Context::from_waker(std::task::Waker::noop());
        assert!(dec.poll_ready(&mut cx).is_pending());

        let mut stream = dec.handler_mut().files.pop().unwrap();
        assert_eq!(stream.bytes_received(), 10);

        let mut content = stream.read_available();
        while dec.resume().unwrap() == WriteStatus::Blocked {
            content.extend(stream.read_available());
        }
        content.extend(stream.read_available());
        assert_eq!(content, b"0123456789".repeat(100));

        assert_eq!(dec.write(b"\r\n--XYZ--\r\n").unwrap(), WriteStatus::Ready);
        assert_eq!(stream.try_read(), FileRead::End);
        assert_eq!(dec.end().unwrap(), Completion::Finished);
    }

    #[test]
    fn test_ready_and_close_futures() {
        let config = FormConfig::default().file_high_water_mark(2);
        let mut dec = new_decoder(MULTIPART, config);
        assert_eq!(
            dec.write(&file_body("abcdefgh")).unwrap(),
            WriteStatus::Blocked
        );
        let mut stream = dec.handler_mut().files.pop().unwrap();

        let mut content = Vec::new();
        while dec.is_blocked() {
            content.extend(stream.read_available());
            block_on(dec.ready()).unwrap();
        }
        content.extend(stream.read_available());
        assert_eq!(stream.try_read(), FileRead::End);
        assert_eq!(content, b"abcdefgh");

        block_on(dec.close()).unwrap();
        assert!(dec.is_finished());
        // Closing twice is fine once finished.
        block_on(dec.close()).unwrap();
    }

    #[test]
    fn test_destroy_aborts_open_file() {
        let mut dec = new_decoder(MULTIPART, FormConfig::default());
        let body = file_body("data");
        dec.write(&body[..body.len() - 11]).unwrap();
        dec.destroy();
        assert_eq!(dec.write(b"more"), Err(FormError::Closed));

        let mut stream = dec.handler_mut().files.pop().unwrap();
        assert_eq!(stream.try_read(), FileRead::Failed(FormError::Aborted));
        assert_eq!(dec.handler().closed, 0);
    }

    #[test]
    fn test_into_handler_aborts_open_file() {
        let mut dec = new_decoder(MULTIPART, FormConfig::default());
        let body = file_body("data");
        dec.write(&body[..body.len() - 11]).unwrap();
        let mut rec = dec.into_handler();
        let stream = &mut rec.files[0];
        assert_eq!(stream.bytes_received(), 4);
        assert_eq!(stream.try_read(), FileRead::Failed(FormError::Aborted));
    }

    #[test]
    fn test_limits_flow_through() {
        let config = FormConfig::default().limits(Limits::default().fields(1));
        let mut dec = new_decoder("application/x-www-form-urlencoded", config);
        dec.write(b"a=1&b=2&c=3").unwrap();
        dec.end().unwrap();
        assert_eq!(dec.handler().fields.len(), 1);
    }
}
