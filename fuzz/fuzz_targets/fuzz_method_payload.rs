//! Fuzz target: `decode_on_off`
//!
//! Direct-method bodies arrive straight from the hub.  Any byte sequence
//! must decode to a boolean or a decode error, never a panic, and an
//! accepted payload must decode identically a second time.
//!
//! cargo fuzz run fuzz_method_payload

#![no_main]

use edge_agent::rpc::codec::decode_on_off;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(on) = decode_on_off(data) {
        assert_eq!(decode_on_off(data).ok(), Some(on));
    }
});
