//! Transports carry one prepared request over HTTP and report what happens
//! as an ordered stream of events.
//!
//! # Design
//! Two implementations ship with the crate and are chosen by configuration:
//!
//! - [`StreamTransport`] is server-style. The target is relative, the
//!   transport connects to the request's `Origin` itself, uploads are
//!   streamed and the response arrives as `Head`, then `Chunk`s, then `End`.
//! - [`BufferedTransport`] is browser-style. The target is an absolute URL
//!   and the finished response is delivered at once as a single `Load`.
//!
//! A transport never settles anything itself; it only emits events. Events
//! sent after the request has settled are dropped by the receiver.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::BoxError;
use crate::http::{Headers, HttpRequest};

pub mod buffered;
pub mod stream;

pub use buffered::BufferedTransport;
pub use stream::StreamTransport;

/// How a transport expects the request target to be addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// `protocol//host:port/path?query`
    Absolute,
    /// `/path?query`; the origin travels separately.
    Relative,
}

/// Progress of one request/response exchange.
#[derive(Debug)]
pub enum TransportEvent {
    /// Status line and headers arrived.
    Head { status: u16, headers: Headers },
    /// A piece of the response body.
    Chunk(Bytes),
    /// The response body is complete.
    End,
    /// The whole response at once.
    Load {
        status: u16,
        headers: Headers,
        body: Bytes,
    },
    /// The exchange failed before the response completed.
    Error(BoxError),
    /// The exchange was cancelled by the transport.
    Abort,
}

/// Sending half of a request's event channel.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<TransportEvent>,
}

/// Receiving half of a request's event channel.
pub type EventStream = mpsc::UnboundedReceiver<TransportEvent>;

impl EventSink {
    pub fn channel() -> (EventSink, EventStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventSink { tx }, rx)
    }

    pub fn emit(&self, event: TransportEvent) {
        // The receiver is gone once the request settled; later events are moot.
        let _ = self.tx.send(event);
    }

    pub fn head(&self, status: u16, headers: Headers) {
        self.emit(TransportEvent::Head { status, headers });
    }

    pub fn chunk(&self, chunk: Bytes) {
        self.emit(TransportEvent::Chunk(chunk));
    }

    pub fn end(&self) {
        self.emit(TransportEvent::End);
    }

    pub fn load(&self, status: u16, headers: Headers, body: Bytes) {
        self.emit(TransportEvent::Load {
            status,
            headers,
            body,
        });
    }

    pub fn fail(&self, err: impl Into<BoxError>) {
        self.emit(TransportEvent::Error(err.into()));
    }

    pub fn abort(&self) {
        self.emit(TransportEvent::Abort);
    }
}

/// Carries requests over HTTP.
///
/// # Examples
/// ```
/// use courier_core::transport::{Addressing, EventSink, Transport};
/// use courier_core::HttpRequest;
///
/// #[derive(Debug)]
/// struct Canned;
///
/// #[async_trait::async_trait]
/// impl Transport for Canned {
///     fn addressing(&self) -> Addressing {
///         Addressing::Relative
///     }
///
///     async fn dispatch(&self, _request: HttpRequest, events: EventSink) {
///         events.load(204, Vec::new(), Default::default());
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    fn addressing(&self) -> Addressing;

    /// Carry `request` and report its progress on `events`.
    ///
    /// Must finish with exactly one of `End`, `Load`, `Error` or `Abort`.
    /// Returning without one is treated as an abort.
    async fn dispatch(&self, request: HttpRequest, events: EventSink);
}
