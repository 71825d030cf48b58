//! Request target construction.
//!
//! Relative transports get the path plus query; they address the origin on
//! their own. Absolute transports get `protocol//host:port` prefixed, in that
//! order, with each piece only when it is set.
//!
//! Parameters are appended after a single `?` exactly as given. A path that
//! already carries a query string is kept verbatim and the parameters follow
//! it; keys are never merged or deduplicated.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::options::{Params, RequestOptions};
use crate::transport::Addressing;

/// Characters escaped in query keys and values (everything except
/// `A-Z a-z 0-9 - _ . ! ~ * ' ( )`).
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Serialize `params` as `key=value` pairs joined by `&`.
pub fn encode_params(params: &Params) -> String {
    params
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, QUERY_COMPONENT),
                utf8_percent_encode(value, QUERY_COMPONENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Compute the request target for normalized `options`.
pub fn build_target(options: &RequestOptions, addressing: Addressing) -> String {
    let path = options.path.as_deref().filter(|p| !p.is_empty()).unwrap_or("/");

    let mut target = String::new();
    if addressing == Addressing::Absolute {
        if let Some(protocol) = options.protocol.as_deref() {
            target.push_str(protocol);
            if !protocol.ends_with(':') {
                target.push(':');
            }
        }
        if let Some(host) = options.host.as_deref() {
            target.push_str("//");
            target.push_str(host);
        }
        if let Some(port) = options.port {
            target.push(':');
            target.push_str(&port.to_string());
        }
    }
    target.push_str(path);

    if let Some(params) = options.params.as_ref().filter(|p| !p.is_empty()) {
        target.push('?');
        target.push_str(&encode_params(params));
    }
    target
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;

    #[test]
    fn empty_path_becomes_root() {
        let options = RequestOptions::default();
        assert_eq!(build_target(&options, Addressing::Relative), "/");
        let options = RequestOptions::new(HttpMethod::Get, "");
        assert_eq!(build_target(&options, Addressing::Relative), "/");
    }

    #[test]
    fn no_params_leaves_path_unchanged() {
        let options = RequestOptions::new(HttpMethod::Get, "/ping").params(Params::new());
        assert_eq!(build_target(&options, Addressing::Relative), "/ping");
    }

    #[test]
    fn relative_addressing_never_prefixes_origin() {
        let options = RequestOptions::new(HttpMethod::Get, "/ping")
            .protocol("http:")
            .host("localhost")
            .port(8001);
        assert_eq!(build_target(&options, Addressing::Relative), "/ping");
    }

    #[test]
    fn absolute_addressing_prefixes_protocol_host_port() {
        let options = RequestOptions::new(HttpMethod::Get, "/ping")
            .protocol("http")
            .host("localhost")
            .port(8001)
            .param("a", 1);
        assert_eq!(
            build_target(&options, Addressing::Absolute),
            "http://localhost:8001/ping?a=1"
        );
    }

    #[test]
    fn params_append_after_existing_query() {
        let options = RequestOptions::new(HttpMethod::Get, "/search?q=1")
            .param("q", 2)
            .param("page", 3);
        assert_eq!(
            build_target(&options, Addressing::Relative),
            "/search?q=1?q=2&page=3"
        );
    }

    #[test]
    fn values_are_percent_encoded() {
        let params = Params::new()
            .with("name", "a b&c=d")
            .with("ünï", "(ok)*~")
            .with("empty", "");
        assert_eq!(
            encode_params(&params),
            "name=a%20b%26c%3Dd&%C3%BCn%C3%AF=(ok)*~&empty="
        );
    }
}
