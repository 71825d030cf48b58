//! Per-call request options and the instance defaults they are filled from.
//!
//! # Design
//! `RequestOptions` is built fresh for every call and consumed by it.
//! `Defaults` is an immutable value owned by a client: the built-in set
//! (`method = GET`) with construction-time overrides layered on top. Filling
//! is shallow: a field the caller set wins as a whole, so caller `headers`
//! replace the default `headers` rather than merging with them.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::body::Payload;
use crate::http::{HttpMethod, Headers};

/// How the outgoing `data` should be encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    /// Serialize to JSON text and send `content-type: application/json`.
    Json,
    /// Send bytes as they are.
    Blob,
}

/// Ordered query parameters. Values are stored in their textual form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair. Keys are not deduplicated.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Display) {
        self.0.push((key.into(), value.to_string()));
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.insert(key, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Display> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// Options for a single request. Unset fields are filled from the client's
/// `Defaults`.
#[derive(Debug, Default)]
pub struct RequestOptions {
    pub method: Option<HttpMethod>,
    pub path: Option<String>,
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub params: Option<Params>,
    pub headers: Option<Headers>,
    pub data: Option<Payload>,
    pub body_type: Option<BodyType>,
}

impl RequestOptions {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method: Some(method),
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.params.get_or_insert_with(Params::new).insert(key, value);
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.into()));
        self
    }

    pub fn data(mut self, data: impl Into<Payload>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Send `value` as JSON.
    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.data = Some(Payload::Json(value));
        self.body_type = Some(BodyType::Json);
        self
    }

    pub fn body_type(mut self, body_type: BodyType) -> Self {
        self.body_type = Some(body_type);
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }
}

/// Instance-level defaults. Everything except the payload can be defaulted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Defaults {
    pub method: Option<HttpMethod>,
    pub path: Option<String>,
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub params: Option<Params>,
    pub headers: Option<Headers>,
    #[serde(rename = "type")]
    pub body_type: Option<BodyType>,
}

impl Defaults {
    /// The static set every client starts from.
    pub fn builtin() -> Self {
        Self {
            method: Some(HttpMethod::Get),
            ..Self::default()
        }
    }

    /// `overrides` layered on top of the built-in set.
    pub fn with_overrides(overrides: Defaults) -> Self {
        overrides.or(&Self::builtin())
    }

    /// Shallow fill: fields unset in `self` are taken from `fallback`.
    pub fn or(self, fallback: &Defaults) -> Self {
        Self {
            method: self.method.or(fallback.method),
            path: self.path.or_else(|| fallback.path.clone()),
            protocol: self.protocol.or_else(|| fallback.protocol.clone()),
            host: self.host.or_else(|| fallback.host.clone()),
            port: self.port.or(fallback.port),
            params: self.params.or_else(|| fallback.params.clone()),
            headers: self.headers.or_else(|| fallback.headers.clone()),
            body_type: self.body_type.or(fallback.body_type),
        }
    }

    /// Produce a complete options record for one call.
    ///
    /// Missing options become an empty record; every unset field is filled
    /// from these defaults. The caller's value is consumed, never shared.
    pub fn normalize(&self, options: Option<RequestOptions>) -> RequestOptions {
        let options = options.unwrap_or_default();
        RequestOptions {
            method: options.method.or(self.method),
            path: options.path.or_else(|| self.path.clone()),
            protocol: options.protocol.or_else(|| self.protocol.clone()),
            host: options.host.or_else(|| self.host.clone()),
            port: options.port.or(self.port),
            params: options.params.or_else(|| self.params.clone()),
            headers: options.headers.or_else(|| self.headers.clone()),
            data: options.data,
            body_type: options.body_type.or(self.body_type),
        }
    }
}
