// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for Taxis

use thiserror::Error;

/// Result type alias for Taxis operations
pub type Result<T> = std::result::Result<T, TaxisError>;

/// Taxis error types
#[derive(Error, Debug)]
pub enum TaxisError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Model error: {0}")]
    Model(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Catalog error: {0}")]
    Catalog(String),
}
