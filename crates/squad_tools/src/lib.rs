//! # Squad Development Tools
//!
//! Command-line tools for development:
//! - Definition loading from RON files
//! - Data validators
//! - Headless battle simulation
//! - Upgrade cost tables

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod costs;
pub mod data_loader;
pub mod progress_file;
pub mod scenario;
pub mod validate;
