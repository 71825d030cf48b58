//! Server-style transport on top of `reqwest`.

use async_trait::async_trait;
use log::trace;

use super::{Addressing, EventSink, Transport};
use crate::body::BodySource;
use crate::config::AgentOptions;
use crate::error::QueryError;
use crate::http::{header_pairs, HttpRequest};

/// Connects to each request's `Origin`, streams uploads and reports the
/// response chunk by chunk.
///
/// The underlying `reqwest::Client` is the connection pool; clones share it.
#[derive(Clone)]
pub struct StreamTransport {
    client: reqwest::Client,
}

impl StreamTransport {
    pub fn new(agent: &AgentOptions) -> Result<Self, QueryError> {
        let mut builder = reqwest::Client::builder().pool_max_idle_per_host(agent.pool_size());
        if let Some(timeout) = agent.idle_timeout() {
            builder = builder.pool_idle_timeout(timeout);
        }
        if !agent.proxy_from_env {
            builder = builder.no_proxy();
        }
        let client = builder.build().map_err(QueryError::transport)?;
        Ok(Self { client })
    }

    async fn exchange(&self, request: HttpRequest, events: &EventSink) -> Result<(), reqwest::Error> {
        let url = request.origin.url_for(&request.target);
        let mut builder = self.client.request(request.method.into(), url);
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }
        builder = match request.body {
            BodySource::Empty => builder,
            BodySource::Full(bytes) => builder.body(bytes),
            BodySource::Chunks(stream) => builder.body(reqwest::Body::wrap_stream(stream)),
        };

        let mut response = builder.send().await?;
        events.head(response.status().as_u16(), header_pairs(response.headers()));
        while let Some(chunk) = response.chunk().await? {
            trace!("received {} byte chunk", chunk.len());
            events.chunk(chunk);
        }
        Ok(())
    }
}

impl std::fmt::Debug for StreamTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for StreamTransport {
    fn addressing(&self) -> Addressing {
        Addressing::Relative
    }

    async fn dispatch(&self, request: HttpRequest, events: EventSink) {
        match self.exchange(request, &events).await {
            Ok(()) => events.end(),
            Err(err) => events.fail(err),
        }
    }
}
