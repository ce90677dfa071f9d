// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Taxis: AI Image Sorter
//!
//! Sends each image in a folder to a multimodal model together with a list of
//! allowed categories, then copies the image into one folder per category the
//! model picked.

pub mod catalog;
pub mod classifier;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod model;
pub mod parser;
pub mod sniff;

pub use config::AppConfig;
pub use error::{Result, TaxisError};
