#![no_main]
use iam_snitch::{PolicyDocument, TrustPolicy};
use libfuzzer_sys::fuzz_target;

// Arbitrary (possibly percent-encoded) documents must parse or fail cleanly
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(document) = PolicyDocument::from_json(text) {
        for statement in &document.statements {
            assert!(!statement.actions.is_empty());
        }
    }

    if let Ok(trust) = TrustPolicy::parse(text) {
        let principals = trust.principals();
        for (i, p) in principals.iter().enumerate() {
            assert!(!principals[i + 1..].contains(p));
        }
    }
});
