//! Fuzz target for command decoding
//!
//! Any line that decodes must re-encode to a line that decodes to the same
//! command.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::str;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = str::from_utf8(data) {
        if let Ok(cmd) = squery_proto::Command::decode(input) {
            let again = squery_proto::Command::decode(&cmd.encode())
                .expect("re-encoded command decodes");
            assert_eq!(cmd, again);
        }
    }
});
