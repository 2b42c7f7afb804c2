//! Core types and utilities for the pet breed dataset pipeline.
//!
//! This crate provides the error type, configuration, record types and
//! evaluation metrics shared by the dataset crate and the command-line tool.

pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

pub use cli::*;
pub use config::*;
pub use error::{Error, Result};
pub use metrics::*;
pub use types::*;
