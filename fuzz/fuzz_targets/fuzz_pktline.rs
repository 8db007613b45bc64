//! Fuzz target for pkt-line parsing.
//!
//! Tests that the cursor handles arbitrary input without panicking and never
//! moves past its buffer.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vanity_git::PktLineCursor;

fuzz_target!(|data: &[u8]| {
    let mut cursor = PktLineCursor::new(data);

    // Bounded so crafted input cannot loop forever
    for _ in 0..1000 {
        if cursor.is_empty() {
            break;
        }
        let before = cursor.position();
        match cursor.read() {
            Ok(_) => assert!(cursor.position() > before),
            Err(_) => {
                assert_eq!(cursor.position(), before);
                break;
            }
        }
        assert!(cursor.position() <= data.len());
    }
});
