// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for Taxis
//!
//! The file format is a flat JSON object so existing `conf.json` files keep
//! working. Everything the classifier needs is derived from it here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::model::ModelKind;
use crate::{Result, TaxisError};

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Directory holding the images to classify
    #[serde(default)]
    pub image_folder: String,

    /// API credential for the model provider
    #[serde(default)]
    pub model_token: String,

    /// Provider selector: `gemini` or `openai`
    #[serde(default)]
    pub llm_type: String,

    /// Replaces the provider's default base URL when set
    #[serde(default)]
    pub model_custom_url: String,

    /// Output root; category folders are created underneath
    #[serde(default)]
    pub dir: String,

    /// Comma-separated allow-list presented to the model
    #[serde(default)]
    pub target_classes: String,

    /// Empty means the provider's default model
    #[serde(default)]
    pub model_name: String,

    #[serde(default)]
    pub proxy_url: String,

    /// Comma-separated starting indices, aligned with `target_classes`
    #[serde(default)]
    pub class_idx: String,

    /// Pause after every model call, in whole seconds
    #[serde(default)]
    pub interval_seconds: u64,

    /// Copy journal location
    #[serde(default = "default_history_file")]
    pub history_file: String,
}

fn default_history_file() -> String { "taxis_history.jsonl".to_string() }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            image_folder: String::new(),
            model_token: String::new(),
            llm_type: String::new(),
            model_custom_url: String::new(),
            dir: String::new(),
            target_classes: String::new(),
            model_name: String::new(),
            proxy_url: String::new(),
            class_idx: String::new(),
            interval_seconds: 0,
            history_file: default_history_file(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| TaxisError::Config(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check the fields a run cannot start without
    pub fn validate(&self) -> Result<ModelKind> {
        let mut missing = Vec::new();
        if self.image_folder.trim().is_empty() {
            missing.push("image_folder");
        }
        if self.model_token.trim().is_empty() {
            missing.push("model_token");
        }
        if self.llm_type.trim().is_empty() {
            missing.push("llm_type");
        }
        if !missing.is_empty() {
            return Err(TaxisError::Config(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        self.llm_type.parse()
    }

    /// Allowed category labels in configured order
    pub fn allowed_categories(&self) -> Vec<String> {
        split_list(&self.target_classes)
    }

    /// Starting counter value per category
    ///
    /// Indices are matched to categories by position. Missing, negative or
    /// unparseable entries start at 0.
    pub fn start_indices(&self) -> HashMap<String, u64> {
        let indices: Vec<&str> = if self.class_idx.trim().is_empty() {
            Vec::new()
        } else {
            self.class_idx.split(',').map(str::trim).collect()
        };

        self.allowed_categories()
            .into_iter()
            .enumerate()
            .map(|(i, category)| {
                let start = match indices.get(i) {
                    Some(raw) if !raw.is_empty() => match raw.parse::<i64>() {
                        Ok(n) => n.max(0) as u64,
                        Err(e) => {
                            warn!("Invalid start index '{}' for '{}': {}", raw, category, e);
                            0
                        }
                    },
                    _ => 0,
                };
                (category, start)
            })
            .collect()
    }

    /// Destination root; an empty `dir` means the working directory
    pub fn output_root(&self) -> PathBuf {
        if self.dir.trim().is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(&self.dir)
        }
    }

    /// Configured model name, or the default for `kind` when unset
    pub fn model_name_for(&self, kind: ModelKind) -> &str {
        match self.model_name.trim() {
            "" => kind.default_model(),
            name => name,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn history_path(&self) -> PathBuf {
        PathBuf::from(&self.history_file)
    }

    /// Copy safe for printing
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.model_token.is_empty() {
            config.model_token = "********".to_string();
        }
        config
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> AppConfig {
        AppConfig {
            image_folder: "./images".to_string(),
            model_token: "secret".to_string(),
            llm_type: "gemini".to_string(),
            target_classes: "Nature, Food,Travel".to_string(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        let err = AppConfig::default().validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("image_folder"));
        assert!(msg.contains("model_token"));
        assert!(msg.contains("llm_type"));
    }

    #[test]
    fn test_validate_rejects_unknown_provider() {
        let mut config = configured();
        config.llm_type = "llama".to_string();
        assert!(matches!(config.validate(), Err(TaxisError::Config(_))));
    }

    #[test]
    fn test_validate_accepts_known_provider() {
        assert_eq!(configured().validate().unwrap(), ModelKind::Gemini);
    }

    #[test]
    fn test_empty_model_name_follows_provider() {
        let mut config = configured();
        config.llm_type = "openai".to_string();
        let kind = config.validate().unwrap();
        assert_eq!(config.model_name_for(kind), "gpt-4o-mini");
        assert_eq!(config.model_name_for(ModelKind::Gemini), "gemini-2.0-flash");

        config.model_name = "gpt-4.1".to_string();
        assert_eq!(config.model_name_for(kind), "gpt-4.1");
    }

    #[test]
    fn test_allowed_categories_trims_and_drops_empty() {
        let mut config = configured();
        config.target_classes = " Nature ,,Food, ".to_string();
        assert_eq!(config.allowed_categories(), vec!["Nature", "Food"]);
    }

    #[test]
    fn test_start_indices_are_positional() {
        let mut config = configured();
        config.class_idx = "5,x".to_string();
        let indices = config.start_indices();
        assert_eq!(indices["Nature"], 5);
        assert_eq!(indices["Food"], 0);
        assert_eq!(indices["Travel"], 0);
    }

    #[test]
    fn test_negative_start_index_clamps_to_zero() {
        let mut config = configured();
        config.class_idx = "-3".to_string();
        assert_eq!(config.start_indices()["Nature"], 0);
    }

    #[test]
    fn test_empty_dir_is_working_directory() {
        assert_eq!(configured().output_root(), PathBuf::from("."));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = AppConfig::load(Path::new("/nonexistent/taxis/conf.json")).unwrap();
        assert!(config.model_name.is_empty());
        assert!(config.image_folder.is_empty());
    }

    #[test]
    fn test_load_original_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf.json");
        std::fs::write(
            &path,
            r#"{"image_folder":"in","model_token":"t","llm_type":"gemini","dir":"out",
               "target_classes":"A,B","class_idx":"1,2","interval_seconds":3}"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.interval(), Duration::from_secs(3));
        assert_eq!(config.start_indices()["B"], 2);
        assert_eq!(config.history_file, "taxis_history.jsonl");
    }

    #[test]
    fn test_redacted_hides_token() {
        assert_eq!(configured().redacted().model_token, "********");
    }
}
