// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Lookup of sorted images by category and position

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::{Result, TaxisError};

const CATALOG_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Category with its image count, for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryInfo {
    pub name: String,
    pub count: usize,
}

/// Images under an output root, grouped by category folder
#[derive(Debug, Default)]
pub struct Catalog {
    categories: BTreeMap<String, Vec<PathBuf>>,
}

impl Catalog {
    /// Scan the immediate subdirectories of `root`
    pub fn scan(root: &Path) -> Result<Self> {
        let mut categories = BTreeMap::new();

        for entry in fs::read_dir(root)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read entry in {:?}: {}", root, e);
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let images = match category_images(&path) {
                Ok(images) if images.is_empty() => continue,
                Ok(images) => images,
                Err(e) => {
                    warn!("Failed to read category folder {:?}: {}", path, e);
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().to_string();
            categories.insert(name, images);
        }

        Ok(Self { categories })
    }

    pub fn categories(&self) -> Vec<CategoryInfo> {
        self.categories
            .iter()
            .map(|(name, images)| CategoryInfo {
                name: name.clone(),
                count: images.len(),
            })
            .collect()
    }

    /// Image `id` (1-based) in `category`
    pub fn lookup(&self, category: &str, id: i64) -> Result<&Path> {
        if id < 1 {
            return Err(TaxisError::Catalog("ID must be a positive integer".to_string()));
        }

        let images = self.categories.get(category).ok_or_else(|| {
            let available: Vec<&str> = self.categories.keys().map(String::as_str).collect();
            TaxisError::Catalog(format!(
                "Category '{}' not found. Available categories: {}",
                category,
                available.join(", ")
            ))
        })?;

        images
            .get((id - 1) as usize)
            .map(PathBuf::as_path)
            .ok_or_else(|| {
                TaxisError::Catalog(format!(
                    "Image ID {} not found in category '{}'. IDs are 1-based. Max ID is {}.",
                    id,
                    category,
                    images.len()
                ))
            })
    }
}

/// Images directly inside one category folder, in lookup order
fn category_images(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_catalog_image(p))
        .collect();
    images.sort_by(|a, b| compare_stems(a, b));
    Ok(images)
}

fn is_catalog_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| CATALOG_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Numeric stems first in numeric order, then everything else by name
fn compare_stems(a: &Path, b: &Path) -> Ordering {
    let stem = |p: &Path| p.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    let (sa, sb) = (stem(a), stem(b));

    match (sa.parse::<u64>(), sb.parse::<u64>()) {
        (Ok(na), Ok(nb)) => na.cmp(&nb).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
