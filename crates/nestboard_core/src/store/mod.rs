//! Entry store layer.
//!
//! # Responsibility
//! - Hold the single mutable copy of workspace entries.
//! - Every other component reads through it and mutates only via its API.

pub mod entry_store;
