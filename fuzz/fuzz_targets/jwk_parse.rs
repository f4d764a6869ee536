//! Fuzz target for PublicKeyJwk::parse
//!
//! Peer keys arrive as attacker-controlled JWK text. This fuzzer feeds:
//! - Arbitrary bytes (general malformation)
//! - Structurally plausible JWKs with fuzzed members
//!
//! # Invariants
//!
//! - NEVER panic on malformed input
//! - Anything accepted re-parses from its canonical form to the same key
//! - A JWK carrying a private component is never accepted

#![no_main]

use arbitrary::Arbitrary;
use keyswap_crypto::PublicKeyJwk;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum JwkInput {
    Raw(String),
    Structured { kty: String, crv: String, x: String, y: String, d: Option<String> },
}

fuzz_target!(|input: JwkInput| {
    let (text, has_private) = match input {
        JwkInput::Raw(text) => (text, false),
        JwkInput::Structured { kty, crv, x, y, d } => {
            let private = d
                .as_ref()
                .map(|d| format!(",\"d\":{}", escape(d)))
                .unwrap_or_default();
            let text = format!(
                "{{\"kty\":{},\"crv\":{},\"x\":{},\"y\":{}{private}}}",
                escape(&kty),
                escape(&crv),
                escape(&x),
                escape(&y),
            );
            (text, d.is_some())
        },
    };

    if let Ok(jwk) = PublicKeyJwk::parse(&text) {
        assert!(!has_private, "accepted a JWK with a private component");

        let reparsed = PublicKeyJwk::parse(jwk.as_str()).expect("canonical form must parse");
        assert_eq!(reparsed, jwk);
    }
});

fn escape(value: &str) -> String {
    format!("{value:?}")
}
