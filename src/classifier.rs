// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Classification run: list images, ask the model, copy into category folders
//!
//! Everything runs sequentially. Only an unreadable source directory aborts a
//! run; file and category failures are logged and the loop moves on.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::dispatch::{file_extension, CategoryCounter, Dispatcher};
use crate::history::{History, HistoryEntry};
use crate::model::{ClassificationRequest, VisionModel};
use crate::parser::extract_categories;
use crate::sniff::detect_format;
use crate::{AppConfig, Result};

/// Extensions sent to the model
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Check if a file should be sent to the model
pub fn is_image_file(path: &Path) -> bool {
    file_extension(path)
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Instruction sent alongside every image
pub fn build_prompt(categories: &[String]) -> String {
    format!(
        r#"
You are a professional image recognition and classification system. Your task is to pick the most relevant labels for the provided image from a fixed list of categories.

---
### Task
1. **Recognise the content:** examine every visual element of the image, including the subject, scene, background, lighting and overall mood.
2. **Multiple labels:** you may choose one or more labels that best describe the image.
3. **Stay within the list:** choose only from the <allowed categories> below. Never use words outside the list or invent new categories.

---
### Output format (**mandatory**)
* **Single output:** your entire reply must be exactly one JSON object.
* **No extra text:** never add explanations, Markdown fences or comments before or after the JSON object.
* **JSON structure:** it must contain an array under the key cate.

---
### Input
* **Allowed categories:** {}

---
### Example output
{{"cate":["Food","Life"]}}

If the image only belongs to the "Landscape" category, return:
{{"cate":["Landscape"]}}
"#,
        categories.join(",")
    )
}

/// Fixed pause after each model call
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    interval: Duration,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub async fn pause(&self) {
        if !self.interval.is_zero() {
            debug!("Waiting {:?} before the next request", self.interval);
            tokio::time::sleep(self.interval).await;
        }
    }
}

/// One image being processed
#[derive(Debug, Clone)]
pub struct FileTask {
    pub path: PathBuf,
    pub data: Vec<u8>,
}

/// Categories the model picked for one image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationResult {
    pub categories: Vec<String>,
    pub total_tokens: u64,
}

/// Counters for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Regular files found in the source directory
    pub files_seen: usize,
    /// Files that are not images
    pub skipped: usize,
    /// Unreadable files and failed model calls
    pub failed: usize,
    pub classified: usize,
    pub unclassified: usize,
    pub dispatched: usize,
    pub dispatch_failures: usize,
    pub total_tokens: u64,
}

/// Drives a classification run over one directory
pub struct Classifier {
    model: Box<dyn VisionModel>,
    dispatcher: Dispatcher,
    throttle: Throttle,
    prompt: String,
    history: Option<History>,
    run_id: String,
}

impl Classifier {
    pub fn new(model: Box<dyn VisionModel>, dispatcher: Dispatcher, categories: &[String]) -> Self {
        Self {
            model,
            dispatcher,
            throttle: Throttle::new(Duration::ZERO),
            prompt: build_prompt(categories),
            history: None,
            run_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Classifier wired up from configuration
    pub fn from_config(config: &AppConfig, model: Box<dyn VisionModel>, dry_run: bool) -> Self {
        let counter = CategoryCounter::new(config.start_indices());
        let dispatcher = Dispatcher::new(config.output_root(), counter).dry_run(dry_run);

        Self::new(model, dispatcher, &config.allowed_categories())
            .with_throttle(Throttle::new(config.interval()))
            .with_history(History::new(config.history_path()))
    }

    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    /// Record every real copy in `history`
    pub fn with_history(mut self, history: History) -> Self {
        self.history = Some(history);
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Ask the model about one image
    ///
    /// The throttle pause happens once a reply is in hand, before parsing.
    pub async fn classify(&self, task: &FileTask) -> Result<ClassificationResult> {
        let format = detect_format(&task.data);
        let request = ClassificationRequest {
            image: &task.data,
            format,
            prompt: &self.prompt,
        };

        debug!("Sending {:?} as {} to {}", task.path, format.mime_type(), self.model.name());
        let reply = self.model.classify(&request).await?;

        self.throttle.pause().await;

        let categories = reply
            .text
            .as_deref()
            .map(extract_categories)
            .unwrap_or_default();

        Ok(ClassificationResult {
            categories,
            total_tokens: reply.total_tokens,
        })
    }

    /// Classify every image directly inside `source_dir`
    pub async fn run(&mut self, source_dir: &Path) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        let entries = fs::read_dir(source_dir).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!("Cannot read image folder {}: {}", source_dir.display(), e),
            )
        })?;

        let mut files = Vec::new();
        let mut entry_count = 0usize;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read entry in {:?}: {}", source_dir, e);
                    continue;
                }
            };
            entry_count += 1;

            match entry.file_type() {
                Ok(ft) if ft.is_dir() => continue,
                Ok(_) => files.push(entry.path()),
                Err(e) => warn!("Cannot stat {:?}: {}", entry.path(), e),
            }
        }

        if entry_count == 0 {
            info!("No files found in {:?}, nothing to do", source_dir);
            return Ok(summary);
        }

        files.sort();
        info!("Found {} files in {:?}", files.len(), source_dir);

        for path in files {
            summary.files_seen += 1;
            self.process_file(path, &mut summary).await;
        }

        info!(
            "All files processed: {} dispatched, {} unclassified, {} failed, {} tokens",
            summary.dispatched, summary.unclassified, summary.failed, summary.total_tokens
        );

        Ok(summary)
    }

    async fn process_file(&mut self, path: PathBuf, summary: &mut RunSummary) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if !is_image_file(&path) {
            info!("Skipping {}: not an image file", name);
            summary.skipped += 1;
            return;
        }

        info!("Processing image: {}", name);

        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) => {
                error!("Cannot read {:?}: {}", path, e);
                summary.failed += 1;
                return;
            }
        };
        let task = FileTask { path, data };

        let result = match self.classify(&task).await {
            Ok(result) => result,
            Err(e) => {
                error!("Failed to classify {}: {}", name, e);
                summary.failed += 1;
                return;
            }
        };

        summary.total_tokens += result.total_tokens;
        info!(
            "{} -> categories {:?} ({} tokens)",
            name, result.categories, result.total_tokens
        );

        if result.categories.is_empty() {
            info!("No usable categories for {}, skipping", name);
            summary.unclassified += 1;
            return;
        }
        summary.classified += 1;

        let mut file_hash = None;
        for category in &result.categories {
            match self.dispatcher.dispatch(&task.path, category) {
                Ok(dest) => {
                    info!("Copied {} to {:?} ({})", name, dest, category);
                    summary.dispatched += 1;

                    if !self.dispatcher.is_dry_run() {
                        let hash = file_hash
                            .get_or_insert_with(|| blake3::hash(&task.data).to_hex().to_string());
                        self.record(&task.path, dest, category, hash.clone());
                    }
                }
                Err(e) => {
                    error!("Failed to copy {} into '{}': {}", name, category, e);
                    summary.dispatch_failures += 1;
                }
            }
        }
    }

    fn record(&self, source: &Path, dest: PathBuf, category: &str, file_hash: String) {
        if let Some(history) = &self.history {
            let entry = HistoryEntry::new(
                &self.run_id,
                source.to_path_buf(),
                dest,
                category.to_string(),
                file_hash,
            );
            if let Err(e) = history.append(&entry) {
                warn!("Failed to write history to {:?}: {}", history.path(), e);
            }
        }
    }
}
