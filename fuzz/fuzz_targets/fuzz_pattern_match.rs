#![no_main]
use arbitrary::Arbitrary;
use iam_snitch::PatternMatcher;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    a: String,
    b: String,
}

fuzz_target!(|input: Input| {
    let forward = PatternMatcher::matches(&input.a, &input.b);
    assert_eq!(forward, PatternMatcher::matches(&input.b, &input.a));

    assert!(PatternMatcher::matches(&input.a, "*"));

    // A literal value that the glob accepts is a witness for the symmetric match
    if PatternMatcher::glob(&input.a, &input.b) {
        assert!(forward);
    }
});
