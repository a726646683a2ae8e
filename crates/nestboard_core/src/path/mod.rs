//! Slug/path resolver and the address surface built on it.
//!
//! # Responsibility
//! - Derive slugs from live entry content.
//! - Translate between entry chains and `/<owner>/<slug>/...` addresses.

pub mod address;
pub mod slug;
