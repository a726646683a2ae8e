//! Core of the nested spatial board.
//! Entries live on an infinite canvas as a tree; each entry's children form
//! the view you get by navigating into it.

pub mod config;
pub mod db;
pub mod gateway;
pub mod layout;
pub mod logging;
pub mod model;
pub mod path;
pub mod service;
pub mod store;

pub use config::{CanvasConfig, ConfigError, FootprintMetrics};
pub use gateway::hub::{parse_hub_groups, HubCandidate, HubServiceError, HubSuggester};
pub use gateway::sqlite::SqliteEntryGateway;
pub use gateway::{GatewayError, GatewayResult, PersistenceGateway, PositionUpdate};
pub use layout::hub::{plan_hub_layout, HubGroup, HubLayoutPlan, LayoutMove};
pub use logging::{init_logging, logging_status, LogLevel, LoggingError};
pub use model::entry::{
    ContentSnapshot, Entry, EntryId, EntryKind, EntryPatch, LinkCard, MediaCard, MediaKind,
    NewEntry,
};
pub use model::geometry::{Bounds, Point, Size, Vector};
pub use path::address::{format_address, parse_address, Address};
pub use path::slug::{path_of, resolve_path, slug_of};
pub use service::navigation::{Breadcrumb, NavigationController, NavigationOutcome, ViewState};
pub use service::session::{
    CanvasSession, CreateOutcome, DeleteOutcome, EditOutcome, SessionError, TickReport,
};
pub use service::undo::{HistoryEffect, UndoManager, UndoRecord};
pub use store::entry_store::{DeleteMode, EntryStore, LoadReport, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
