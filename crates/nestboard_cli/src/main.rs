//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `nestboard_core` linkage against an in-memory workspace.
//! - Print deterministic navigation output for quick local checks.

use nestboard_core::db::open_workspace_db_in_memory;
use nestboard_core::{
    CanvasConfig, CanvasSession, CreateOutcome, NewEntry, Point, SqliteEntryGateway,
};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    println!("nestboard_core version={}", nestboard_core::core_version());

    let conn = open_workspace_db_in_memory()?;
    let gateway = SqliteEntryGateway::try_new(&conn)?;
    let (mut session, _) = CanvasSession::open(CanvasConfig::default(), gateway)?;

    let mut now_ms = 0;
    let mut parent = None;
    for (depth, text) in ["Projects", "Garden plan", "Tomatoes"].into_iter().enumerate() {
        let position = Point::new(depth as f64 * 160.0, 0.0);
        let entry = match session.create_entry(NewEntry::text(text, position, parent))? {
            CreateOutcome::Created { entry, .. } => entry,
            CreateOutcome::Duplicate { existing } => existing,
        };
        parent = Some(entry.id);
    }

    if let Some(leaf_parent) = parent {
        now_ms += 1_000;
        if let Some(outcome) = session.navigate_to(leaf_parent, now_ms) {
            let crumbs: Vec<&str> = outcome
                .breadcrumbs
                .iter()
                .map(|crumb| crumb.label.as_str())
                .collect();
            println!("address={}", outcome.address);
            println!("breadcrumbs={}", crumbs.join(" > "));
        }
    }

    now_ms += 1_000;
    if let Some(outcome) = session.navigate_back(now_ms) {
        println!("back address={}", outcome.address);
    }
    println!("entries={}", session.store().len());
    Ok(())
}
