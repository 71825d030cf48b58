use std::path::Path;
use std::time::Duration;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use bytes::Bytes;
use futures::StreamExt;
use serde_json::{json, Map, Value};
use tokio::{fs::File, io::AsyncWriteExt, net::TcpListener};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

/// Largest body the buffering routes (`/mirror`, `/raw`) accept.
pub const BODY_LIMIT: usize = 64 * 1024 * 1024;

/// How long `/slow` waits before answering.
pub const SLOW_DELAY: Duration = Duration::from_millis(1500);

pub fn app() -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/mirror", any(mirror))
        .route("/raw", any(raw))
        .route("/upload", any(upload))
        .route("/slow", any(slow))
        .route("/malformed", any(malformed))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        log::info!("mock server listening on {addr}");
    }
    axum::serve(listener, app()).await
}

async fn ping() -> Json<Value> {
    Json(json!({ "success": true }))
}

/// Echo the request line, headers and body back as JSON.
///
/// A JSON body gains `"success": true`; any other typed body is echoed as an
/// array of byte values. Without a `content-type` the data is just
/// `{"success": true}`.
async fn mirror(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let data = match content_type {
        Some(content_type) if content_type.contains("json") => {
            match serde_json::from_slice::<Value>(&body) {
                Ok(Value::Object(mut object)) => {
                    object.insert("success".into(), Value::Bool(true));
                    Value::Object(object)
                }
                Ok(other) => json!({ "value": other, "success": true }),
                Err(err) => {
                    log::warn!("mirror: rejecting malformed JSON body: {err}");
                    return StatusCode::BAD_REQUEST.into_response();
                }
            }
        }
        Some(_) => Value::Array(body.iter().map(|byte| Value::from(*byte)).collect()),
        None => json!({ "success": true }),
    };

    let echoed_headers: Map<String, Value> = headers
        .iter()
        .map(|(name, value)| {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            (name.as_str().to_owned(), Value::String(value))
        })
        .collect();

    Json(json!({
        "path": uri.to_string(),
        "method": method.as_str(),
        "headers": echoed_headers,
        "data": data,
    }))
    .into_response()
}

/// Echo the request body byte-for-byte.
async fn raw(body: Bytes) -> Bytes {
    body
}

/// Spool the request body to a temporary file, then stream that file back.
async fn upload(body: Body) -> Result<Response, StatusCode> {
    let path = std::env::temp_dir().join(format!("mock-upload-{}", Uuid::new_v4()));
    spool(body, &path).await.map_err(|err| {
        log::error!("upload: spooling to {} failed: {err}", path.display());
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let file = File::open(&path)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    // The open handle keeps the data readable on unix; elsewhere the file lingers in temp.
    let _ = tokio::fs::remove_file(&path).await;

    Ok(Body::from_stream(ReaderStream::new(file)).into_response())
}

async fn spool(body: Body, path: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut file = File::create(path).await?;
    let mut stream = body.into_data_stream();
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    Ok(())
}

/// Answers only after `SLOW_DELAY`; used to exercise client-side aborts.
async fn slow() -> Json<Value> {
    tokio::time::sleep(SLOW_DELAY).await;
    Json(json!({ "success": true }))
}

/// Declares a JSON body but sends something else.
async fn malformed() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], "{\"success\": tru")
}

async fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "success": false })))
}
