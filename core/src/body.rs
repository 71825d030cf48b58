//! Outgoing payloads and their encoding.
//!
//! # Design
//! Every payload is reduced to one `BodySource` with three shapes: nothing,
//! bytes that are already available, or an incremental chunk producer. The
//! transport takes the source by value, so the request body is finalized
//! exactly once: right after the bytes are written, or when the producer is
//! exhausted. A filesystem path is only a way to obtain a producer; it is
//! opened here and then follows the same streaming path as any other reader.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, TryStreamExt};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::error::QueryError;
use crate::http::{set_header, Headers};
use crate::options::BodyType;

/// Read size used when streaming a reader or file.
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// A producer of body chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// What the caller wants to send.
pub enum Payload {
    /// A JSON value, serialized to text on encoding.
    Json(serde_json::Value),
    /// Raw bytes or text, sent unchanged.
    Bytes(Bytes),
    /// An already-open streamable source.
    Stream(ChunkStream),
    /// A file to open and stream.
    File(PathBuf),
}

impl Payload {
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Payload::Stream(Box::pin(stream))
    }

    /// Stream from any async reader in `UPLOAD_CHUNK_SIZE` reads.
    pub fn reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Payload::stream(ReaderStream::with_capacity(reader, UPLOAD_CHUNK_SIZE))
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Payload::File(path.into())
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Payload::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Payload::Stream(_) => f.write_str("Stream(..)"),
            Payload::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Json(value)
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Payload {
    fn from(bytes: &'static [u8]) -> Self {
        Payload::Bytes(Bytes::from_static(bytes))
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Bytes(Bytes::from(text))
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Bytes(Bytes::copy_from_slice(text.as_bytes()))
    }
}

impl From<PathBuf> for Payload {
    fn from(path: PathBuf) -> Self {
        Payload::File(path)
    }
}

impl From<&Path> for Payload {
    fn from(path: &Path) -> Self {
        Payload::File(path.to_path_buf())
    }
}

impl From<tokio::fs::File> for Payload {
    fn from(file: tokio::fs::File) -> Self {
        Payload::reader(file)
    }
}

/// The encoded request body, ready for a transport.
pub enum BodySource {
    Empty,
    Full(Bytes),
    Chunks(ChunkStream),
}

impl BodySource {
    /// Materialize the whole body. Only for transports that cannot stream.
    pub async fn into_bytes(self) -> io::Result<Bytes> {
        match self {
            BodySource::Empty => Ok(Bytes::new()),
            BodySource::Full(bytes) => Ok(bytes),
            BodySource::Chunks(stream) => {
                let buffer = stream
                    .try_fold(BytesMut::new(), |mut buffer, chunk| async move {
                        buffer.extend_from_slice(&chunk);
                        Ok(buffer)
                    })
                    .await?;
                Ok(buffer.freeze())
            }
        }
    }
}

impl fmt::Debug for BodySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodySource::Empty => f.write_str("Empty"),
            BodySource::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            BodySource::Chunks(_) => f.write_str("Chunks(..)"),
        }
    }
}

/// Decide what to write for `data` under the `body_type` hint.
///
/// A `json` hint always sets `content-type: application/json`; JSON values
/// are serialized, while bytes and streams are taken to be JSON already.
/// Without a hint, JSON values are still serialized and everything else is
/// sent unchanged.
pub async fn encode(
    data: Option<Payload>,
    body_type: Option<BodyType>,
    headers: &mut Headers,
) -> Result<BodySource, QueryError> {
    if body_type == Some(BodyType::Json) {
        set_header(headers, "content-type", "application/json");
    }

    let Some(data) = data else {
        return Ok(BodySource::Empty);
    };

    match data {
        Payload::Json(value) => serde_json::to_vec(&value)
            .map(|text| BodySource::Full(Bytes::from(text)))
            .map_err(QueryError::Encode),
        Payload::Bytes(bytes) if bytes.is_empty() => Ok(BodySource::Empty),
        Payload::Bytes(bytes) => Ok(BodySource::Full(bytes)),
        Payload::Stream(stream) => Ok(BodySource::Chunks(stream)),
        Payload::File(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .map_err(|source| QueryError::Source { path, source })?;
            let stream = ReaderStream::with_capacity(file, UPLOAD_CHUNK_SIZE);
            Ok(BodySource::Chunks(stream.boxed()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::http::find_header;

    #[tokio::test]
    async fn absent_data_is_empty_body() {
        let mut headers = Headers::new();
        let body = encode(None, None, &mut headers).await.unwrap();
        assert!(matches!(body, BodySource::Empty));
        assert!(headers.is_empty());
    }

    #[tokio::test]
    async fn json_hint_serializes_and_sets_content_type() {
        let mut headers = vec![("Content-Type".to_string(), "text/plain".to_string())];
        let data = Payload::Json(serde_json::json!({ "rand": "abc" }));
        let body = encode(Some(data), Some(BodyType::Json), &mut headers)
            .await
            .unwrap();

        assert_eq!(find_header(&headers, "content-type"), Some("application/json"));
        assert_eq!(headers.len(), 1);
        let BodySource::Full(bytes) = body else {
            panic!("expected an immediate body");
        };
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["rand"], "abc");
    }

    #[tokio::test]
    async fn raw_bytes_pass_through_untouched() {
        let raw: Vec<u8> = vec![0, 159, 146, 150, 0, 255];
        let mut headers = Headers::new();
        let body = encode(Some(raw.clone().into()), None, &mut headers)
            .await
            .unwrap();
        assert!(headers.is_empty());
        assert_eq!(body.into_bytes().await.unwrap().as_ref(), raw.as_slice());
    }

    #[tokio::test]
    async fn empty_bytes_finalize_without_body() {
        let mut headers = Headers::new();
        let body = encode(Some("".into()), Some(BodyType::Blob), &mut headers)
            .await
            .unwrap();
        assert!(matches!(body, BodySource::Empty));
    }

    #[tokio::test]
    async fn file_path_streams_in_bounded_chunks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let contents: Vec<u8> = (0..(UPLOAD_CHUNK_SIZE * 3 + 17)).map(|i| i as u8).collect();
        file.write_all(&contents).unwrap();

        let mut headers = Headers::new();
        let body = encode(Some(Payload::file(file.path())), Some(BodyType::Blob), &mut headers)
            .await
            .unwrap();
        let BodySource::Chunks(mut stream) = body else {
            panic!("expected a streamed body");
        };

        let mut received = Vec::new();
        let mut chunks = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            assert!(chunk.len() <= UPLOAD_CHUNK_SIZE);
            received.extend_from_slice(&chunk);
            chunks += 1;
        }
        assert!(chunks >= 4);
        assert_eq!(received, contents);
    }

    #[tokio::test]
    async fn missing_file_is_a_source_error() {
        let mut headers = Headers::new();
        let err = encode(
            Some(Payload::file("/definitely/not/here.bin")),
            None,
            &mut headers,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, QueryError::Source { .. }));
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn streamed_source_collects_in_order() {
        let chunks = vec![
            Ok(Bytes::from_static(b"ab")),
            Ok(Bytes::from_static(b"")),
            Ok(Bytes::from_static(b"cd")),
        ];
        let body = encode(Some(Payload::stream(futures::stream::iter(chunks))), None, &mut Headers::new())
            .await
            .unwrap();
        assert!(matches!(body, BodySource::Chunks(_)));
        assert_eq!(body.into_bytes().await.unwrap(), Bytes::from_static(b"abcd"));
    }
}
