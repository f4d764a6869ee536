//! Fuzz target for EncryptedPayload decoding and decryption
//!
//! Ciphertexts arrive from the network. This fuzzer tests:
//! - Binary decoding of arbitrary bytes
//! - Base64 decoding of arbitrary text
//! - Decryption of whatever decodes, under a fixed key
//!
//! # Invariants
//!
//! - NEVER panic on malformed input
//! - Decoded payloads re-encode to the exact input bytes
//! - Fuzzed ciphertexts NEVER authenticate (forgery would be a break)

#![no_main]

use arbitrary::Arbitrary;
use keyswap_crypto::{EncryptedPayload, SymmetricKey, decrypt};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum PayloadInput {
    Bytes(Vec<u8>),
    Base64(String),
}

fuzz_target!(|input: PayloadInput| {
    let key = SymmetricKey::from_bytes([0x42; 32]);

    let payload = match input {
        PayloadInput::Bytes(bytes) => match EncryptedPayload::from_bytes(&bytes) {
            Ok(payload) => {
                assert_eq!(payload.to_bytes(), bytes);
                payload
            },
            Err(_) => return,
        },
        PayloadInput::Base64(text) => match EncryptedPayload::from_base64(&text) {
            Ok(payload) => payload,
            Err(_) => return,
        },
    };

    assert!(decrypt(&key, &payload).is_err(), "forged payload authenticated");
});
