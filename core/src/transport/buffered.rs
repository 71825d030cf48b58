//! Browser-style transport on top of `ureq`.
//!
//! The exchange runs on tokio's blocking pool and completes in one step: the
//! finished response is reported as a single `Load` event, with no chunk
//! aggregation. There is no incremental upload; a streamed body is collected
//! before sending. GET and HEAD never carry a body.

use std::io::Read;

use async_trait::async_trait;
use bytes::Bytes;
use log::warn;
use ureq::typestate::WithoutBody;
use ureq::Agent;

use super::{Addressing, EventSink, Transport};
use crate::config::AgentOptions;
use crate::error::BoxError;
use crate::http::{header_pairs, Headers, HttpMethod, HttpRequest};

/// Sends absolute-URL requests through a shared `ureq::Agent`.
#[derive(Clone)]
pub struct BufferedTransport {
    agent: Agent,
}

struct Loaded {
    status: u16,
    headers: Headers,
    body: Bytes,
}

impl BufferedTransport {
    pub fn new(options: &AgentOptions) -> Self {
        let mut config = Agent::config_builder()
            .http_status_as_error(false)
            .max_idle_connections_per_host(options.pool_size());
        if let Some(timeout) = options.idle_timeout() {
            config = config.max_idle_age(timeout);
        }
        if !options.proxy_from_env {
            config = config.proxy(None);
        }
        Self {
            agent: config.build().new_agent(),
        }
    }
}

impl std::fmt::Debug for BufferedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for BufferedTransport {
    fn addressing(&self) -> Addressing {
        Addressing::Absolute
    }

    async fn dispatch(&self, request: HttpRequest, events: EventSink) {
        let HttpRequest {
            method,
            target,
            headers,
            body,
            ..
        } = request;

        let body = match body.into_bytes().await {
            Ok(body) => body,
            Err(err) => return events.fail(err),
        };

        let agent = self.agent.clone();
        let outcome =
            tokio::task::spawn_blocking(move || round_trip(&agent, method, &target, &headers, &body))
                .await;

        match outcome {
            Ok(Ok(loaded)) => events.load(loaded.status, loaded.headers, loaded.body),
            Ok(Err(err)) => events.fail(err),
            Err(join) if join.is_cancelled() => events.abort(),
            Err(join) => events.fail(join),
        }
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &Headers) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

/// Builder for verbs ureq sends without a body unless forced.
fn without_body(agent: &Agent, method: HttpMethod, url: &str) -> Option<ureq::RequestBuilder<WithoutBody>> {
    match method {
        HttpMethod::Get => Some(agent.get(url)),
        HttpMethod::Head => Some(agent.head(url)),
        HttpMethod::Delete => Some(agent.delete(url)),
        HttpMethod::Options => Some(agent.options(url)),
        HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => None,
    }
}

fn round_trip(
    agent: &Agent,
    method: HttpMethod,
    url: &str,
    headers: &Headers,
    body: &Bytes,
) -> Result<Loaded, BoxError> {
    let mut response = match without_body(agent, method, url) {
        Some(builder) if body.is_empty() => with_headers(builder, headers).call()?,
        Some(builder) if matches!(method, HttpMethod::Get | HttpMethod::Head) => {
            warn!("{method} {url}: dropping {} byte body", body.len());
            with_headers(builder, headers).call()?
        }
        Some(builder) => with_headers(builder.force_send_body(), headers).send(&body[..])?,
        None => {
            let builder = match method {
                HttpMethod::Put => agent.put(url),
                HttpMethod::Patch => agent.patch(url),
                _ => agent.post(url),
            };
            let builder = with_headers(builder, headers);
            if body.is_empty() {
                builder.send_empty()?
            } else {
                builder.send(&body[..])?
            }
        }
    };

    let status = response.status().as_u16();
    let headers = header_pairs(response.headers());
    let mut buffer = Vec::new();
    response.body_mut().as_reader().read_to_end(&mut buffer)?;

    Ok(Loaded {
        status,
        headers,
        body: Bytes::from(buffer),
    })
}
