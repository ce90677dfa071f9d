// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Copying classified images into category folders
//!
//! Destinations are always `<output_root>/<sanitized category>/<index><ext>`,
//! where `index` comes from a per-category counter that only advances after a
//! successful copy.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{Result, TaxisError};

/// Turn a category label into a single safe path segment
pub fn sanitize_category(category: &str) -> String {
    let mapped: String = category
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == ' ' || ('\u{4E00}'..='\u{9FA5}').contains(&c) {
                c
            } else {
                '_'
            }
        })
        .collect();

    mapped.replace(' ', "_").trim_matches('_').to_string()
}

/// Text after the last `.` of the file name, without the dot
///
/// A leading dot counts, so `.png` has extension `png`.
pub fn file_extension(path: &Path) -> Option<&str> {
    path.file_name()?.to_str()?.rsplit_once('.').map(|(_, ext)| ext)
}

/// Next file index per category label
///
/// Keys are the labels as the model returned them, not the sanitized names.
#[derive(Debug, Clone, Default)]
pub struct CategoryCounter {
    next: HashMap<String, u64>,
}

impl CategoryCounter {
    pub fn new(start: HashMap<String, u64>) -> Self {
        Self { next: start }
    }

    /// Index the next file in `category` will receive
    pub fn peek(&self, category: &str) -> u64 {
        self.next.get(category).copied().unwrap_or(0)
    }

    fn advance(&mut self, category: &str) {
        *self.next.entry(category.to_string()).or_insert(0) += 1;
    }
}

/// Copies source images to their category destinations
pub struct Dispatcher {
    output_root: PathBuf,
    counter: CategoryCounter,
    dry_run: bool,
}

impl Dispatcher {
    pub fn new(output_root: impl Into<PathBuf>, counter: CategoryCounter) -> Self {
        Self {
            output_root: output_root.into(),
            counter,
            dry_run: false,
        }
    }

    /// Compute destinations and advance counters without touching the disk
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn counter(&self) -> &CategoryCounter {
        &self.counter
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Where `source` would land if dispatched to `category` now
    pub fn destination(&self, source: &Path, category: &str) -> PathBuf {
        let ext = file_extension(source)
            .map(|e| format!(".{}", e))
            .unwrap_or_default();
        let file_name = format!("{}{}", self.counter.peek(category), ext);

        self.output_root
            .join(sanitize_category(category))
            .join(file_name)
    }

    /// Copy `source` into the folder for `category`
    ///
    /// An existing destination file is overwritten. The counter is left
    /// unchanged on failure so the same name is reused next time.
    pub fn dispatch(&mut self, source: &Path, category: &str) -> Result<PathBuf> {
        let dest = self.destination(source, category);

        if self.dry_run {
            info!("DRY RUN: Would copy {:?} to {:?}", source, dest);
        } else {
            let bytes = copy_file(source, &dest).map_err(|e| {
                TaxisError::Dispatch(format!("Failed to copy {:?} to {:?}: {}", source, dest, e))
            })?;
            debug!("Copied {} bytes from {:?} to {:?}", bytes, source, dest);
        }

        self.counter.advance(category);
        Ok(dest)
    }
}

fn copy_file(source: &Path, dest: &Path) -> io::Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut reader = File::open(source)?;
    let mut writer = File::create(dest)?;
    io::copy(&mut reader, &mut writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_punctuation() {
        assert_eq!(sanitize_category("Food & Travel"), "Food___Travel");
        assert_eq!(sanitize_category("  Nature  "), "Nature");
        assert_eq!(sanitize_category("a/b\\c"), "a_b_c");
    }

    #[test]
    fn test_sanitize_cjk_unchanged() {
        assert_eq!(sanitize_category("风景"), "风景");
        assert_eq!(sanitize_category("美食 生活"), "美食_生活");
    }

    #[test]
    fn test_sanitize_only_punctuation_is_empty() {
        assert_eq!(sanitize_category("&/!?"), "");
        assert_eq!(sanitize_category(".."), "");
    }

    #[test]
    fn test_sanitize_replaces_non_cjk_unicode() {
        assert_eq!(sanitize_category("café"), "caf");
        assert_eq!(sanitize_category("Ünïcode"), "n_code");
    }

    #[test]
    fn test_counter_defaults_to_zero() {
        let counter = CategoryCounter::default();
        assert_eq!(counter.peek("anything"), 0);
    }

    #[test]
    fn test_destination_keeps_extension_case() {
        let dispatcher = Dispatcher::new("/out", CategoryCounter::default());
        assert_eq!(
            dispatcher.destination(Path::new("/in/IMG_1.JPG"), "Food & Travel"),
            PathBuf::from("/out/Food___Travel/0.JPG")
        );
        assert_eq!(
            dispatcher.destination(Path::new("/in/noext"), "A"),
            PathBuf::from("/out/A/0")
        );
        assert_eq!(
            dispatcher.destination(Path::new("/in/.png"), "A"),
            PathBuf::from("/out/A/0.png")
        );
    }

    #[test]
    fn test_file_extension_uses_last_dot() {
        assert_eq!(file_extension(Path::new("a.tar.gz")), Some("gz"));
        assert_eq!(file_extension(Path::new("dir/.png")), Some("png"));
        assert_eq!(file_extension(Path::new("trailing.")), Some(""));
        assert_eq!(file_extension(Path::new("png")), None);
        assert_eq!(file_extension(Path::new("a.b/noext")), None);
    }

    #[test]
    fn test_dispatch_increments_from_start_index() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("photo.png");
        fs::write(&source, b"pixels").unwrap();

        let start = HashMap::from([("Nature".to_string(), 7)]);
        let mut dispatcher = Dispatcher::new(dir.path().join("out"), CategoryCounter::new(start));

        let first = dispatcher.dispatch(&source, "Nature").unwrap();
        let second = dispatcher.dispatch(&source, "Nature").unwrap();

        assert_eq!(first, dir.path().join("out/Nature/7.png"));
        assert_eq!(second, dir.path().join("out/Nature/8.png"));
        assert_eq!(fs::read(&second).unwrap(), b"pixels");
        assert_eq!(dispatcher.counter().peek("Nature"), 9);
    }

    #[test]
    fn test_failed_copy_does_not_advance() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("missing.jpg");
        let mut dispatcher = Dispatcher::new(dir.path().join("out"), CategoryCounter::default());

        let err = dispatcher.dispatch(&source, "Food").unwrap_err();
        assert!(matches!(err, TaxisError::Dispatch(_)));
        assert_eq!(dispatcher.counter().peek("Food"), 0);

        fs::write(&source, b"late").unwrap();
        let dest = dispatcher.dispatch(&source, "Food").unwrap();
        assert_eq!(dest, dir.path().join("out/Food/0.jpg"));
        assert_eq!(dispatcher.counter().peek("Food"), 1);
    }

    #[test]
    fn test_dispatch_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.png");
        fs::write(&source, b"new").unwrap();
        let existing = dir.path().join("out/Cats/0.png");
        fs::create_dir_all(existing.parent().unwrap()).unwrap();
        fs::write(&existing, b"much longer old content").unwrap();

        let mut dispatcher = Dispatcher::new(dir.path().join("out"), CategoryCounter::default());
        dispatcher.dispatch(&source, "Cats").unwrap();

        assert_eq!(fs::read(&existing).unwrap(), b"new");
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.png");
        fs::write(&source, b"x").unwrap();

        let mut dispatcher = Dispatcher::new(dir.path().join("out"), CategoryCounter::default())
            .dry_run(true);
        let dest = dispatcher.dispatch(&source, "Cats").unwrap();

        assert!(!dest.exists());
        assert!(!dir.path().join("out").exists());
        assert_eq!(dispatcher.counter().peek("Cats"), 1);
    }
}
