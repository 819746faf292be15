// SPDX-License-Identifier: AGPL-3.0-or-later
#![no_main]

use libfuzzer_sys::fuzz_target;
use markloom_core::MarkdownHandler;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let handler = MarkdownHandler::default();
    if let Ok(doc) = handler.parse(input) {
        let output = handler.render(&doc).unwrap_or_default();
        // A serialized document parses again
        let _ = handler.parse(&output);
    }
});
