#![no_main]

//! Fuzz target for identifier normalization and prefix rewriting

use arbitrary::Arbitrary;
use autowire_di::{PrefixMap, PrefixRule, to_class_form, to_id_form};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    id: String,
    rules: Vec<(String, String)>,
}

/// `[-]?word(_word)*` segments separated by dots, lower-case ascii words.
/// Only later segments may start with `-`.
fn well_formed(id: &str) -> bool {
    id.split('.').enumerate().all(|(i, segment)| {
        let segment = match segment.strip_prefix('-') {
            Some(rest) if i > 0 => rest,
            Some(_) => return false,
            None => segment,
        };
        segment
            .split('_')
            .all(|word| !word.is_empty() && word.bytes().all(|b| b.is_ascii_lowercase()))
    })
}

fuzz_target!(|input: Input| {
    let class = to_class_form(&input.id);
    let _ = to_id_form(&class);
    if well_formed(&input.id) {
        assert_eq!(to_id_form(&class), input.id);
    }

    let prefixes: PrefixMap = input
        .rules
        .iter()
        .map(|(external, internal)| (external.as_str(), internal.as_str()))
        .collect();
    assert_eq!(prefixes.rules()[0], PrefixRule::new("", ""));

    let rewritten = prefixes.rewrite(&input.id);
    let candidates = prefixes.lookup_candidates(&input.id);
    assert!(rewritten.contains(&input.id));
    for candidate in &rewritten {
        assert!(candidates.contains(candidate));
    }
    let mut unique = candidates.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), candidates.len());
});
