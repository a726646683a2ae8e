//! Hub layout engine.
//!
//! # Responsibility
//! - Estimate entry footprints from content.
//! - Reflow semantic groups ("hubs") inside the active view.
//! - Interpolate planned moves over time for the renderer.
//!
//! # Invariants
//! - Layout never mutates the entry store; the session commits results.
//! - No entry moves further than the configured maximum per pass.

pub mod animation;
pub mod footprint;
pub mod hub;
