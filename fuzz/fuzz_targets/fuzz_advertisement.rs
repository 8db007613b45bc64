//! Fuzz target for advertisement decoding and rewriting.
//!
//! Arbitrary upstream bytes must produce either an error or an advertisement
//! that re-encodes and decodes to itself.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vanity_git::{Advertisement, DefaultBranch, UPLOAD_PACK_SERVICE};

fuzz_target!(|data: &[u8]| {
    let Ok(adv) = Advertisement::decode(data, UPLOAD_PACK_SERVICE) else {
        return;
    };

    if let Ok(encoded) = adv.encode() {
        let again = Advertisement::decode(&encoded, UPLOAD_PACK_SERVICE)
            .expect("encoded advertisement must decode");
        assert_eq!(again.refs().count(), adv.refs().count());
    }

    let _ = DefaultBranch::new("refs/heads/main").apply(adv);
});
