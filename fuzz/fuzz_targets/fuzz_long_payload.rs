#![no_main]

use cardgate_core::{decode_long_payload, encode_long_payload, MAX_LONG_VALUE_BYTES};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary long payload bytes decode to a value or an error, never a panic
    if let Ok(Some(value)) = decode_long_payload::<serde_json::Value>(data) {
        if let Ok(encoded) = encode_long_payload(&value) {
            assert!(encoded.len() <= MAX_LONG_VALUE_BYTES);
            assert!(decode_long_payload::<serde_json::Value>(&encoded).is_ok());
        }
    }
});
