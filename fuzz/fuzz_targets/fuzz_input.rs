// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use libfuzzer_sys::fuzz_target;
use taxis::dispatch::sanitize_category;
use taxis::parser::extract_categories;
use taxis::sniff::detect_format;

fuzz_target!(|data: &[u8]| {
    let _ = detect_format(data);

    if let Ok(text) = std::str::from_utf8(data) {
        for category in extract_categories(text) {
            let safe = sanitize_category(&category);
            assert!(!safe.starts_with('_') && !safe.ends_with('_'));
            assert!(!safe.contains('/') && !safe.contains('.'));
        }
    }
});
