#![no_main]

use libfuzzer_sys::fuzz_target;
use proto_redact::{Destination, FieldPolicy, PrivacyFilter, PrivacySpec};

const MAX_INPUT: usize = 64 * 1024;

/// A fixed tree exercising every policy shape: passing and failing
/// leaves, an opaque message, a message with overrides, and a nested
/// override level.
fn policy() -> FieldPolicy {
    FieldPolicy::root(vec![
        FieldPolicy::leaf(1, Destination::Local),
        FieldPolicy::leaf(2, Destination::Automatic),
        FieldPolicy::opaque_message(3, Destination::Explicit),
        FieldPolicy::message(
            4,
            vec![
                FieldPolicy::leaf(1, Destination::Local),
                FieldPolicy::leaf(2, Destination::Automatic),
                FieldPolicy::message(3, vec![FieldPolicy::leaf(1, Destination::Explicit)]),
            ],
        ),
    ])
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() || data.len() > MAX_INPUT {
        return;
    }

    let dest = match data[0] % 3 {
        0 => Destination::Local,
        1 => Destination::Explicit,
        _ => Destination::Automatic,
    };
    let input = &data[1..];

    let root = policy();
    let filter = PrivacyFilter::new(&root, PrivacySpec::new(dest));
    if let Ok(out) = filter.strip_bytes(input) {
        assert!(out.len() <= input.len());
        // A successful strip yields well-formed output; stripping it
        // again must succeed and change nothing.
        let again = filter.strip_bytes(&out).expect("re-strip of valid output");
        assert_eq!(again, out);
    }
});
