//! Canvas domain model.
//!
//! # Responsibility
//! - Define the entry record shared by store, resolver, navigation and layout.
//! - Define workspace geometry aliases.
//!
//! # Invariants
//! - Every entry is identified by a stable `EntryId` that is never reused.
//! - `parent_id = None` means the entry hangs off the implicit root anchor.

pub mod entry;
pub mod geometry;
