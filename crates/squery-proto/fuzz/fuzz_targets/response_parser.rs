//! Fuzz target for response decoding
//!
//! Feeds arbitrary text to the whole-response parser and to the incremental
//! reader line by line. Neither may panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::str;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = str::from_utf8(data) {
        if input.len() > squery_proto::DEFAULT_MAX_LINE_LEN {
            return;
        }

        let _ = squery_proto::Response::parse(input);

        let mut reader = squery_proto::ResponseReader::new();
        for line in input.split('\n') {
            if reader.feed(line).is_err() {
                break;
            }
        }
    }
});
