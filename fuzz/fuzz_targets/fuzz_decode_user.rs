#![no_main]

use cardgate_core::{decode_user, encode_user};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(short_value) = std::str::from_utf8(data) else {
        return;
    };

    // Decoding arbitrary card contents must never panic
    if let Some(user) = decode_user(Some(short_value)) {
        // Anything accepted re-encodes to a payload that decodes to the same user
        let encoded = encode_user(&user).unwrap();
        assert_eq!(decode_user(Some(&encoded)), Some(user.clone()));

        if let Some(hash) = user.election_hash() {
            assert!(!hash.as_str().is_empty());
            assert!(hash.as_str().bytes().all(|b| b.is_ascii_hexdigit()));
        }
        if let Some(passcode) = user.passcode() {
            assert!(passcode.as_str().bytes().all(|b| b.is_ascii_digit()));
        }
    }
});
