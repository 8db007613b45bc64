//! Fuzz target for default branch rewriting over structured ref sets.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vanity_git::{Advertisement, DefaultBranch, RefEntry, UPLOAD_PACK_SERVICE};

#[derive(Debug, Arbitrary)]
struct Input {
    first_is_head: bool,
    names: Vec<u8>,
    target: u8,
    caps: Vec<String>,
}

fn name(n: u8) -> String {
    format!("refs/heads/b{:03}", n)
}

fuzz_target!(|input: Input| {
    let hash = "0123456789abcdef0123456789abcdef01234567";
    let first_name = if input.first_is_head {
        "HEAD".to_string()
    } else {
        name(255)
    };
    let caps: Vec<String> = input
        .caps
        .into_iter()
        .filter(|c| !c.is_empty() && !c.contains([' ', '\0', '\n']))
        .collect();

    let adv = Advertisement {
        service: UPLOAD_PACK_SERVICE.to_string(),
        first: RefEntry::new(hash, first_name).with_capabilities(caps),
        others: input
            .names
            .iter()
            .map(|n| RefEntry::new(hash, name(*n)))
            .collect(),
    };
    let total = adv.refs().count();

    let target = name(input.target);
    let Ok(out) = DefaultBranch::new(target.clone()).apply(adv) else {
        return;
    };

    // Nothing is lost or invented.
    assert_eq!(out.refs().count(), total);
    if !input.first_is_head {
        assert_eq!(out.first.name, target);
    }
});
