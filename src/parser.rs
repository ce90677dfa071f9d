// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Extraction of category labels from free-form model output

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

/// Matches `{"cate": ["...", ...]}` anywhere in the text, whitespace tolerant
static CATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\{\s*"cate"\s*:\s*\[\s*"[^"]+"\s*(?:,\s*"[^"]+"\s*)*\]\s*\}"#)
        .expect("category pattern is valid")
});

#[derive(Debug, Deserialize)]
struct CategoryReply {
    cate: Vec<String>,
}

/// Pull the category list out of a model response
///
/// Every candidate object is decoded in order and the last one that decodes
/// wins. Candidates that fail to decode are logged and skipped.
pub fn extract_categories(text: &str) -> Vec<String> {
    let mut categories = Vec::new();

    for candidate in CATE_PATTERN.find_iter(text) {
        match serde_json::from_str::<CategoryReply>(candidate.as_str()) {
            Ok(reply) => categories = reply.cate,
            Err(e) => {
                warn!("Skipping undecodable category object {:?}: {}", candidate.as_str(), e);
            }
        }
    }

    debug!("Extracted categories: {:?}", categories);
    categories
}
