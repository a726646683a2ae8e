//! Interaction services over the entry store.
//!
//! # Responsibility
//! - Navigation, undo history and debounced saves as standalone state machines.
//! - `session` wires them to a persistence gateway.

pub mod navigation;
pub mod save_queue;
pub mod session;
pub mod undo;
