//! Verify request target construction against JSON test vectors stored in
//! `test-vectors/`.
//!
//! Each case gives the option fields (in the same shape as configured
//! defaults), the transport addressing mode and the expected target.

use courier_core::transport::Addressing;
use courier_core::url::build_target;
use courier_core::Defaults;

/// Parse the addressing string from test vectors into `Addressing`.
fn parse_addressing(s: &str) -> Addressing {
    match s {
        "absolute" => Addressing::Absolute,
        "relative" => Addressing::Relative,
        other => panic!("unknown addressing: {other}"),
    }
}

#[test]
fn url_test_vectors() {
    let raw = include_str!("../../test-vectors/url.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let cases = vectors["cases"].as_array().unwrap();
    assert!(!cases.is_empty());
    for case in cases {
        let name = case["name"].as_str().unwrap();
        let addressing = parse_addressing(case["addressing"].as_str().unwrap());
        let fields: Defaults = serde_json::from_value(case["options"].clone()).unwrap();
        let options = fields.normalize(None);

        let target = build_target(&options, addressing);
        assert_eq!(target, case["expected"].as_str().unwrap(), "{name}");
    }
}

#[test]
fn every_param_appears_exactly_once() {
    let raw = include_str!("../../test-vectors/url.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let fields: Defaults = serde_json::from_value(case["options"].clone()).unwrap();
        let Some(params) = fields.params.clone().filter(|p| !p.is_empty()) else {
            continue;
        };
        let options = fields.normalize(None);
        let target = build_target(&options, Addressing::Relative);
        let (_, query) = target.rsplit_once('?').unwrap();
        assert_eq!(query.split('&').count(), params.len(), "{name}");
    }
}
