//! One request/response pipeline over two kinds of HTTP transport.
//!
//! # Overview
//! `QueryClient::query` takes a `RequestOptions`, fills it from the client's
//! `Defaults`, builds the request target, encodes the body (JSON, raw bytes
//! or a streamed source), hands everything to a `Transport` and returns a
//! `Pending` future right away. The transport's events are aggregated into an
//! `HttpResponse`, decoded by content type, and the future settles once:
//! resolved below status 400, rejected otherwise.
//!
//! # Design
//! - The transport is chosen by `ClientConfig`, not by probing the
//!   environment: `StreamTransport` (server-style, relative targets, streamed
//!   uploads) or `BufferedTransport` (browser-style, absolute targets,
//!   finished bodies).
//! - `Defaults` is an immutable value merged into each call; it is never
//!   mutated after construction.
//! - Rejections carry a status code only when a response arrived; transport
//!   failures and aborts have none.
//! - No retries and no timeouts at this layer.

pub mod aggregate;
pub mod body;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod options;
pub mod settle;
pub mod transport;
pub mod url;

pub use body::{BodySource, Payload};
pub use client::QueryClient;
pub use config::{AgentOptions, ClientConfig, TransportKind};
pub use error::QueryError;
pub use http::{Headers, HttpMethod, HttpRequest, HttpResponse, Origin, ResponseBody};
pub use options::{BodyType, Defaults, Params, RequestOptions};
pub use settle::{Pending, Phase, Settlement};
pub use transport::{Addressing, BufferedTransport, StreamTransport, Transport};
