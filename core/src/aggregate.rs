//! Response aggregation and content-type-aware decoding.

use bytes::{Bytes, BytesMut};

use crate::error::QueryError;
use crate::http::{find_header, Headers, HttpResponse, ResponseBody};

/// Collects response chunks in arrival order.
#[derive(Debug, Default)]
pub struct Aggregator {
    chunks: Vec<Bytes>,
    len: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: Bytes) {
        if chunk.is_empty() {
            return;
        }
        self.len += chunk.len();
        self.chunks.push(chunk);
    }

    /// Bytes received so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Assemble the body. A single chunk is handed back without copying.
    pub fn assemble(mut self) -> Bytes {
        if self.is_empty() {
            return Bytes::new();
        }
        match self.chunks.len() {
            1 => self.chunks.swap_remove(0),
            _ => {
                let mut buffer = BytesMut::with_capacity(self.len);
                for chunk in &self.chunks {
                    buffer.extend_from_slice(chunk);
                }
                buffer.freeze()
            }
        }
    }

    /// Assemble and decode into a response.
    pub fn finish(self, status: u16, headers: Headers) -> Result<HttpResponse, QueryError> {
        decode(status, headers, self.assemble())
    }
}

/// Decode `body` according to the response `content-type`.
///
/// A content type mentioning `json` must parse; anything else is kept as
/// opaque bytes.
pub fn decode(status: u16, headers: Headers, body: Bytes) -> Result<HttpResponse, QueryError> {
    let declares_json = find_header(&headers, "content-type")
        .map(|value| value.contains("json"))
        .unwrap_or(false);

    let body = if declares_json {
        let value = serde_json::from_slice(&body)
            .map_err(|source| QueryError::Decode { status, source })?;
        ResponseBody::Json(value)
    } else {
        ResponseBody::Bytes(body)
    };

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}
