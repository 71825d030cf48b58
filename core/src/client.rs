//! The client facade: one `query` entry point over either transport.
//!
//! # Design
//! `QueryClient` holds the transport (and with it the connection pool) plus
//! an immutable `Defaults` value, both shared across clones. `query` does the
//! synchronous part of the pipeline (normalize options, build the target),
//! then hands the rest (body encoding, dispatch, aggregation, settlement) to
//! a spawned task and returns a `Pending` immediately. Each request owns its
//! task, event channel and settlement; nothing mutable is shared between
//! in-flight requests.

use std::sync::Arc;

use log::debug;
use uuid::Uuid;

use crate::body::{encode, Payload};
use crate::config::{ClientConfig, TransportKind};
use crate::error::QueryError;
use crate::http::{HttpMethod, HttpRequest, Origin};
use crate::options::{BodyType, Defaults, Params, RequestOptions};
use crate::settle::{Bridge, Pending, Phase};
use crate::transport::{Addressing, BufferedTransport, EventSink, StreamTransport, Transport};
use crate::url::build_target;

/// Issues requests through a single transport.
#[derive(Debug, Clone)]
pub struct QueryClient {
    transport: Arc<dyn Transport>,
    defaults: Arc<Defaults>,
}

impl QueryClient {
    pub fn new(config: ClientConfig) -> Result<Self, QueryError> {
        let transport: Arc<dyn Transport> = match config.transport {
            TransportKind::Stream => Arc::new(StreamTransport::new(&config.agent)?),
            TransportKind::Buffered => Arc::new(BufferedTransport::new(&config.agent)),
        };
        Ok(Self {
            transport,
            defaults: Arc::new(Defaults::with_overrides(config.defaults)),
        })
    }

    /// Use a caller-provided transport. `defaults` are layered on the
    /// built-in set.
    pub fn with_transport(transport: impl Transport + 'static, defaults: Defaults) -> Self {
        Self {
            transport: Arc::new(transport),
            defaults: Arc::new(Defaults::with_overrides(defaults)),
        }
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    /// Issue a request.
    ///
    /// Must be called from within a tokio runtime. The returned `Pending`
    /// resolves for status codes below 400 and rejects for everything else.
    pub fn query(&self, options: impl Into<Option<RequestOptions>>) -> Pending {
        let mut options = self.defaults.normalize(options.into());
        let addressing = self.transport.addressing();
        if addressing == Addressing::Absolute {
            fill_origin(&mut options);
        }
        let target = build_target(&options, addressing);
        let id = Uuid::new_v4();
        let method = options.method.unwrap_or_default();
        debug!("{id}: {method} {target}");

        let (bridge, outcome, phase) = Bridge::new(id);
        let bridge = Arc::new(bridge);
        let transport = Arc::clone(&self.transport);
        let driver = Arc::clone(&bridge);
        let task = tokio::spawn(async move {
            drive(transport.as_ref(), &driver, options, method, target).await;
        });

        Pending::new(bridge, outcome, phase, task.abort_handle())
    }

    pub fn get(&self, path: &str, params: Params) -> Pending {
        self.query(RequestOptions::new(HttpMethod::Get, path).params(params))
    }

    pub fn post(&self, path: &str, data: serde_json::Value) -> Pending {
        self.query(RequestOptions::new(HttpMethod::Post, path).json(data))
    }

    pub fn put(&self, path: &str, params: Params, data: serde_json::Value) -> Pending {
        self.query(
            RequestOptions::new(HttpMethod::Put, path)
                .params(params)
                .json(data),
        )
    }

    pub fn delete(&self, path: &str, params: Params) -> Pending {
        self.query(RequestOptions::new(HttpMethod::Delete, path).params(params))
    }

    /// POST `source` unchanged. Paths (`Path`, `PathBuf`, `Payload::file`)
    /// are opened and streamed; an open file or reader streams as-is.
    pub fn upload(&self, path: &str, source: impl Into<Payload>) -> Pending {
        self.query(
            RequestOptions::new(HttpMethod::Post, path)
                .data(source)
                .body_type(BodyType::Blob),
        )
    }
}

/// An absolute target needs a scheme and a host; missing ones come from the
/// same fallback origin the stream transport connects to.
fn fill_origin(options: &mut RequestOptions) {
    let fallback = Origin::default();
    options.protocol.get_or_insert(fallback.protocol);
    options.host.get_or_insert(fallback.host);
}

async fn drive(
    transport: &dyn Transport,
    bridge: &Bridge,
    options: RequestOptions,
    method: HttpMethod,
    target: String,
) {
    bridge.enter(Phase::Sending);

    let mut headers = options.headers.unwrap_or_default();
    let body = match encode(options.data, options.body_type, &mut headers).await {
        Ok(body) => body,
        Err(err) => {
            bridge.settle(Err(err));
            return;
        }
    };

    let fallback = Origin::default();
    let request = HttpRequest {
        method,
        target,
        origin: Origin {
            protocol: options.protocol.unwrap_or(fallback.protocol),
            host: options.host.unwrap_or(fallback.host),
            port: options.port,
        },
        headers,
        body,
    };

    let (events, stream) = EventSink::channel();
    let settle = async {
        let outcome = bridge.collect(stream).await;
        bridge.settle(outcome);
    };
    tokio::join!(transport.dispatch(request, events), settle);
}
