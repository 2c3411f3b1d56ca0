//! Bubble Grade Adapters - Filesystem adapters for bubble-grade.
//!
//! This crate provides adapters for:
//! - Filesystem image source
//! - Answer key files

pub mod fs;
pub mod key;

pub use fs::FsImageSource;
pub use key::{load_answer_key, parse_plain_key};
