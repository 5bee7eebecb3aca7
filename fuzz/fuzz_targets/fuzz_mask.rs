//! Fuzz target for secret masking.
//!
//! Registers arbitrary values and masks arbitrary input; masking must
//! never panic, and no registered secret may survive in the output.

#![no_main]

use jf_mask::SecretMasker;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (Vec<String>, String)| {
    let (secrets, input) = data;
    let masker = SecretMasker::new();
    for secret in &secrets {
        masker.add_value(secret, "fuzz");
    }

    let masked = masker.mask(&input);

    for secret in &secrets {
        // Skip secrets containing the replacement character: splicing
        // "***" into the output can synthesize such strings.
        if secret.len() >= jf_mask::MIN_SECRET_LENGTH && !secret.contains('*') {
            assert!(
                !masked.contains(secret.as_str()),
                "registered secret survived masking"
            );
        }
    }
});
