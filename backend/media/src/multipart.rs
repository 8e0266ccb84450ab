//! Pull-based multipart demultiplexer.
//!
//! Wraps a `multer::Multipart` over the raw request body and yields fully
//! accumulated [`Part`]s one at a time. Each part's bytes are routed through
//! a [`BoundedAccumulator`]; the first failure cancels the decoder and drops
//! the underlying body stream so no further input is consumed. An optional
//! whole-body ceiling caps what many small parts can buffer together.

use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use multer::{Constraints, Multipart, SizeLimit};
use pinforge_core::{Part, UploadError};
use tracing::{debug, warn};

use crate::accumulator::BoundedAccumulator;

/// Label used in `Oversized` when the body as a whole is too large.
pub const BODY_LABEL: &str = "request body";

/// Byte ceilings applied while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    pub part: u64,
    pub body: Option<u64>,
}

impl DecodeLimits {
    pub fn per_part(part: u64) -> Self {
        Self { part, body: None }
    }

    pub fn with_body(mut self, body: u64) -> Self {
        self.body = Some(body);
        self
    }
}

pub struct PartStream<'r> {
    inner: Option<Multipart<'r>>,
    limit: u64,
    decoded: usize,
}

impl<'r> PartStream<'r> {
    /// Decode `stream` using an already extracted boundary, bounding each part.
    pub fn new<S, O, E>(stream: S, boundary: impl Into<String>, limit: u64) -> Self
    where
        S: Stream<Item = Result<O, E>> + Send + 'r,
        O: Into<Bytes> + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'r,
    {
        Self::with_limits(stream, boundary, DecodeLimits::per_part(limit))
    }

    /// Decode `stream` under both a per-part and an optional whole-body ceiling.
    pub fn with_limits<S, O, E>(
        stream: S,
        boundary: impl Into<String>,
        limits: DecodeLimits,
    ) -> Self
    where
        S: Stream<Item = Result<O, E>> + Send + 'r,
        O: Into<Bytes> + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'r,
    {
        let multipart = match limits.body {
            Some(body) => Multipart::with_constraints(
                stream,
                boundary,
                Constraints::new().size_limit(SizeLimit::new().whole_stream(body)),
            ),
            None => Multipart::new(stream, boundary),
        };
        Self {
            inner: Some(multipart),
            limit: limits.part,
            decoded: 0,
        }
    }

    /// Decode `stream` using the boundary declared in a `Content-Type` header.
    pub fn from_content_type<S, O, E>(
        content_type: &str,
        stream: S,
        limits: DecodeLimits,
    ) -> Result<Self, UploadError>
    where
        S: Stream<Item = Result<O, E>> + Send + 'r,
        O: Into<Bytes> + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'r,
    {
        let boundary = multer::parse_boundary(content_type).map_err(|e| {
            UploadError::MalformedInput(format!("expected multipart/form-data with boundary: {e}"))
        })?;
        Ok(Self::with_limits(stream, boundary, limits))
    }

    /// Number of parts completed so far.
    pub fn decoded(&self) -> usize {
        self.decoded
    }

    /// True once the body stream has been released, by completion or cancellation.
    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Stop decoding and release the body stream.
    pub fn cancel(&mut self) {
        if self.inner.take().is_some() {
            debug!(decoded = self.decoded, "Multipart decoding cancelled");
        }
    }

    /// Decode the next part. Returns `Ok(None)` once the closing boundary
    /// has been read or the decoder was cancelled.
    pub async fn next_part(&mut self) -> Result<Option<Part>, UploadError> {
        let Some(multipart) = self.inner.as_mut() else {
            return Ok(None);
        };

        let next = multipart.next_field().await;
        let mut field = match next {
            Ok(Some(field)) => field,
            Ok(None) => {
                self.inner = None;
                return Ok(None);
            }
            Err(e) => {
                let err = decode_error(e, "failed to parse multipart field");
                return Err(self.abort(err));
            }
        };

        let Some(field_name) = field.name().map(str::to_owned) else {
            drop(field);
            return Err(self.abort(UploadError::MalformedInput(
                "multipart part has no field name".to_string(),
            )));
        };
        let file_name = field.file_name().map(str::to_owned);
        let media_type = field.content_type().map(|m| m.to_string());

        let mut acc = BoundedAccumulator::new(field_name.clone(), self.limit);
        loop {
            match field.chunk().await {
                Ok(Some(chunk)) => {
                    if let Err(e) = acc.push(&chunk) {
                        drop(field);
                        warn!(
                            field = %field_name,
                            limit = self.limit,
                            "Multipart part exceeds upload limit"
                        );
                        return Err(self.abort(e));
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    drop(field);
                    let err = decode_error(e, &format!("failed reading part '{field_name}'"));
                    return Err(self.abort(err));
                }
            }
        }

        self.decoded += 1;
        debug!(
            field = %field_name,
            file_name = ?file_name,
            bytes = acc.len(),
            "Decoded multipart part"
        );
        Ok(Some(Part::new(field_name, file_name, media_type, acc.finish())))
    }

    /// Lazy sequence of parts; ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Part, UploadError>> + Send + 'r {
        futures::stream::try_unfold(self, |mut parts| async move {
            let next = parts.next_part().await?;
            Ok::<_, UploadError>(next.map(|part| (part, parts)))
        })
    }

    /// Decode the whole body. Failure is total: no partial sequence is returned.
    pub async fn collect_parts(self) -> Result<Vec<Part>, UploadError> {
        self.into_stream().try_collect().await
    }

    fn abort(&mut self, err: UploadError) -> UploadError {
        self.cancel();
        err
    }
}

/// A blown whole-body ceiling is an oversize, everything else is malformed input.
fn decode_error(e: multer::Error, context: &str) -> UploadError {
    match e {
        multer::Error::StreamSizeExceeded { limit } => {
            warn!(limit, "Multipart body exceeds upload limit");
            UploadError::Oversized {
                part: BODY_LABEL.to_string(),
                limit,
            }
        }
        other => UploadError::MalformedInput(format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{stream, StreamExt};
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const BOUNDARY: &str = "X-PINFORGE-BOUNDARY";

    struct TestPart<'a> {
        name: &'a str,
        file_name: Option<&'a str>,
        content_type: Option<&'a str>,
        body: &'a [u8],
    }

    fn file<'a>(name: &'a str, file_name: &'a str, body: &'a [u8]) -> TestPart<'a> {
        TestPart {
            name,
            file_name: Some(file_name),
            content_type: None,
            body,
        }
    }

    fn typed<'a>(part: TestPart<'a>, content_type: &'a str) -> TestPart<'a> {
        TestPart {
            content_type: Some(content_type),
            ..part
        }
    }

    fn text<'a>(name: &'a str, body: &'a [u8]) -> TestPart<'a> {
        TestPart {
            name,
            file_name: None,
            content_type: None,
            body,
        }
    }

    fn encode_head(part: &TestPart<'_>) -> Vec<u8> {
        let mut out = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"",
            part.name
        );
        if let Some(file_name) = part.file_name {
            out.push_str(&format!("; filename=\"{file_name}\""));
        }
        out.push_str("\r\n");
        if let Some(ct) = part.content_type {
            out.push_str(&format!("Content-Type: {ct}\r\n"));
        }
        out.push_str("\r\n");
        out.into_bytes()
    }

    fn encode(parts: &[TestPart<'_>]) -> Vec<u8> {
        let mut out = Vec::new();
        for part in parts {
            out.extend(encode_head(part));
            out.extend_from_slice(part.body);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        out
    }

    fn chunked(
        body: Vec<u8>,
        size: usize,
    ) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        let chunks: Vec<_> = body.chunks(size).map(|c| Ok(Bytes::copy_from_slice(c))).collect();
        stream::iter(chunks)
    }

    #[tokio::test]
    async fn decodes_parts_in_arrival_order() {
        let body = encode(&[
            typed(file("file", "cat.png", b"\x89PNG-data"), "image/png"),
            text("note", b"hello"),
            typed(
                file("meta", "metadata.json", br#"{"name":"X"}"#),
                "application/json",
            ),
        ]);
        let parts = PartStream::new(chunked(body, 5), BOUNDARY, 1024)
            .collect_parts()
            .await
            .unwrap();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].field_name(), "file");
        assert_eq!(parts[0].file_name(), Some("cat.png"));
        assert_eq!(parts[0].media_type(), "image/png");
        assert_eq!(parts[0].payload().as_ref(), b"\x89PNG-data");
        assert!(parts[1].is_field());
        assert_eq!(parts[1].text(), Some("hello"));
        assert_eq!(parts[2].file_name(), Some("metadata.json"));
    }

    #[tokio::test]
    async fn part_at_exact_limit_is_accepted() {
        let body = encode(&[file("file", "a.bin", &[7u8; 64])]);
        let parts = PartStream::new(chunked(body, 3), BOUNDARY, 64)
            .collect_parts()
            .await
            .unwrap();
        assert_eq!(parts[0].byte_count(), 64);
    }

    #[tokio::test]
    async fn oversized_part_fails_whole_request() {
        let body = encode(&[
            text("note", b"ok"),
            file("file", "big.bin", &[1u8; 65]),
        ]);
        let err = PartStream::new(chunked(body, 8), BOUNDARY, 64)
            .collect_parts()
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Oversized { ref part, limit: 64 } if part == "file"));
    }

    #[tokio::test]
    async fn oversized_part_stops_consuming_the_body() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = pulled.clone();
        let head = encode_head(&file("file", "endless.bin", b""));
        let body = stream::iter(vec![Ok::<_, Infallible>(Bytes::from(head))])
            .chain(stream::repeat_with(|| Ok(Bytes::from_static(&[0u8; 16]))))
            .inspect(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        let mut parts = PartStream::new(body, BOUNDARY, 256);
        let err = parts.next_part().await.unwrap_err();
        assert!(matches!(err, UploadError::Oversized { .. }));
        assert!(parts.is_closed());
        assert!(parts.next_part().await.unwrap().is_none());

        let after_cancel = pulled.load(Ordering::SeqCst);
        assert!(after_cancel < 64, "pulled {after_cancel} chunks");
    }

    #[tokio::test]
    async fn many_small_parts_hit_the_body_ceiling() {
        let fields: Vec<_> = (0..200).map(|_| text("junk", &[b'x'; 16])).collect();
        let body = encode(&fields);
        let limits = DecodeLimits::per_part(16).with_body(1024);

        let err = PartStream::with_limits(chunked(body, 64), BOUNDARY, limits)
            .collect_parts()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            UploadError::Oversized { ref part, limit: 1024 } if part == BODY_LABEL
        ));
    }

    #[tokio::test]
    async fn body_within_ceiling_decodes() {
        let body = encode(&[file("file", "a.bin", b"abc"), text("note", b"hi")]);
        let limits = DecodeLimits::per_part(16).with_body(body.len() as u64);

        let parts = PartStream::with_limits(chunked(body, 7), BOUNDARY, limits)
            .collect_parts()
            .await
            .unwrap();
        assert_eq!(parts.len(), 2);
    }

    #[tokio::test]
    async fn truncated_stream_is_malformed() {
        let mut body = encode(&[file("file", "a.bin", b"abcdef")]);
        body.truncate(body.len() - 12);
        let err = PartStream::new(chunked(body, 4), BOUNDARY, 1024)
            .collect_parts()
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::MalformedInput(_)));
    }

    #[tokio::test]
    async fn missing_boundary_is_malformed() {
        let limits = DecodeLimits::per_part(1024);
        let err = PartStream::from_content_type("application/json", chunked(Vec::new(), 1), limits)
            .err()
            .unwrap();
        assert!(matches!(err, UploadError::MalformedInput(_)));
    }

    #[tokio::test]
    async fn boundary_is_read_from_content_type() {
        let body = encode(&[file("file", "a.bin", b"abc")]);
        let content_type = format!("multipart/form-data; boundary={BOUNDARY}");
        let limits = DecodeLimits::per_part(1024).with_body(4096);
        let mut parts =
            PartStream::from_content_type(&content_type, chunked(body, 2), limits).unwrap();
        assert!(parts.next_part().await.unwrap().is_some());
        assert!(parts.next_part().await.unwrap().is_none());
        assert_eq!(parts.decoded(), 1);
    }
}
