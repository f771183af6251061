//! Upload Summary Example - Streaming a Multipart Body Through a Handler
//!
//! This example feeds a multipart body to a `FormDecoder` in small chunks,
//! the way a server would receive it from the network:
//! - Fields arrive whole through `on_field`
//! - Files arrive as a `FileStream` that the example drains as it fills
//! - A small high-water mark forces the decoder to pause and resume
//! - Limits truncate oversized content without failing the body
//!
//! # Running This Example
//!
//! ```bash
//! RUST_LOG=formstream_core=debug cargo run --example upload_summary
//! ```
//!
//! # Expected Output
//!
//! ```text
//! field  title      = "Holiday photos"
//! field  note       = "café on the corner"
//! limit  files
//! done
//! file   photo      beach.jpg (image/jpeg): 24 bytes, paused … times
//! file   raw        notes.txt (text/plain): 32 bytes (truncated), paused … times
//! ```

use formstream::prelude::*;
use tracing_subscriber::EnvFilter;

struct Summary {
    files: Vec<(String, FileInfo, FileStream)>,
}

impl FormHandler for Summary {
    fn on_field(&mut self, name: Option<String>, value: String, _info: FieldInfo) {
        println!("field  {:<10} = {value:?}", name.unwrap_or_default());
    }

    fn on_file(&mut self, name: Option<String>, stream: FileStream, info: FileInfo) {
        self.files.push((name.unwrap_or_default(), info, stream));
    }

    fn on_limit(&mut self, kind: LimitKind) {
        println!("limit  {kind}");
    }

    fn on_close(&mut self) {
        println!("done");
    }
}

fn sample_body() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        b"--sample\r\n\
          Content-Disposition: form-data; name=\"title\"\r\n\r\n\
          Holiday photos\r\n\
          --sample\r\n\
          Content-Disposition: form-data; name=\"photo\"; filename=\"C:\\\\Users\\\\me\\\\beach.jpg\"\r\n\
          Content-Type: image/jpeg\r\n\r\n",
    );
    body.extend((0u8..24).map(|b| b.wrapping_mul(37)));
    body.extend_from_slice(
        b"\r\n--sample\r\n\
          Content-Disposition: form-data; name=\"note\"\r\n\
          Content-Type: text/plain; charset=iso-8859-1\r\n\r\n\
          caf\xe9 on the corner\r\n\
          --sample\r\n\
          Content-Disposition: form-data; name=\"raw\"; filename=\"notes.txt\"\r\n\r\n",
    );
    body.extend_from_slice(&[b'n'; 40]);
    body.extend_from_slice(
        b"\r\n--sample\r\n\
          Content-Disposition: form-data; name=\"extra\"; filename=\"ignored.bin\"\r\n\r\n\
          dropped\r\n\
          --sample--\r\n",
    );
    body
}

fn report(name: &str, info: &FileInfo, data: &[u8], stream: &FileStream, pauses: usize) {
    let truncated = if stream.truncated() { " (truncated)" } else { "" };
    println!(
        "file   {name:<10} {} ({}): {} bytes{truncated}, paused {pauses} times",
        info.filename.as_deref().unwrap_or("-"),
        info.mime_type,
        data.len()
    );
}

fn main() -> Result<(), FormError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .init();

    let config = FormConfig::default()
        .file_high_water_mark(8)
        .limits(Limits::default().file_size(32).files(2));
    let mut decoder = FormDecoder::new(
        "multipart/form-data; boundary=sample",
        config,
        Summary { files: Vec::new() },
    )?;

    let body = sample_body();
    let mut received: Vec<Vec<u8>> = Vec::new();
    let mut pauses: Vec<usize> = Vec::new();

    for chunk in body.chunks(13) {
        let mut status = decoder.write(chunk)?;
        while status == WriteStatus::Blocked {
            let active = decoder.handler().files.len() - 1;
            received.resize(active + 1, Vec::new());
            pauses.resize(active + 1, 0);
            pauses[active] += 1;
            let data = decoder.handler_mut().files[active].2.read_available();
            received[active].extend(data);
            status = decoder.resume()?;
        }
    }

    loop {
        let files = &mut decoder.handler_mut().files;
        received.resize(files.len(), Vec::new());
        pauses.resize(files.len(), 0);
        for (i, (_, _, stream)) in files.iter_mut().enumerate() {
            while let FileRead::Chunk(data) = stream.try_read() {
                received[i].extend(data);
            }
        }
        if decoder.end()? == Completion::Finished {
            break;
        }
    }

    for (i, (name, info, stream)) in decoder.handler().files.iter().enumerate() {
        report(name, info, &received[i], stream, pauses[i]);
    }
    Ok(())
}
