//! Hub suggestion service contract and wire format.
//!
//! # Responsibility
//! - Describe visible entries to the external grouping service.
//! - Parse its reply into `HubGroup`s, tolerating malformed payloads.
//!
//! # Invariants
//! - Parsing never fails: anything unreadable becomes "no suggestion".
//! - Group ids that are not UUIDs are dropped individually.

use crate::layout::hub::HubGroup;
use crate::model::entry::{Entry, EntryId};
use crate::model::geometry::Vector;
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Direction used when a group omits one.
const DEFAULT_DIRECTION: (f64, f64) = (1.0, 0.0);

/// Failure reported by a hub suggestion backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubServiceError(pub String);

impl Display for HubServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "hub suggestion failed: {}", self.0)
    }
}

impl Error for HubServiceError {}

/// Position as sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WirePoint {
    pub x: f64,
    pub y: f64,
}

/// One visible entry described for the grouping service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubCandidate {
    pub id: EntryId,
    pub text: String,
    pub position: WirePoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
}

impl From<&Entry> for HubCandidate {
    fn from(entry: &Entry) -> Self {
        Self {
            id: entry.id,
            text: entry.text.clone(),
            position: WirePoint {
                x: entry.position.x,
                y: entry.position.y,
            },
            media: entry.media.as_ref().map(|media| media.summary()),
            links: entry
                .link_cards
                .iter()
                .map(|card| card.title.clone().unwrap_or_else(|| card.url.clone()))
                .collect(),
        }
    }
}

/// External semantic grouping service.
pub trait HubSuggester {
    /// Returns the raw JSON reply for the given candidates.
    fn suggest(&self, candidates: &[HubCandidate]) -> Result<Value, HubServiceError>;
}

/// Parses a service reply.
///
/// Accepts either `{"groups": [...]}` or a bare array. Each group is
/// `{"entryIds": [...], "direction": {"x":..,"y":..} | [x, y]}`; the
/// snake_case key `entry_ids` is accepted too.
pub fn parse_hub_groups(value: &Value) -> Vec<HubGroup> {
    let groups = match value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("groups") {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    groups.iter().filter_map(parse_group).collect()
}

fn parse_group(value: &Value) -> Option<HubGroup> {
    let map = value.as_object()?;
    let ids = map
        .get("entryIds")
        .or_else(|| map.get("entry_ids"))?
        .as_array()?;
    let entry_ids: Vec<EntryId> = ids
        .iter()
        .filter_map(Value::as_str)
        .filter_map(|raw| Uuid::parse_str(raw).ok())
        .collect();
    if entry_ids.is_empty() {
        return None;
    }

    let direction = match map.get("direction") {
        None | Some(Value::Null) => Vector::new(DEFAULT_DIRECTION.0, DEFAULT_DIRECTION.1),
        Some(raw) => parse_direction(raw)?,
    };
    Some(HubGroup {
        entry_ids,
        direction,
    })
}

fn parse_direction(value: &Value) -> Option<Vector> {
    let (x, y) = match value {
        Value::Object(map) => (map.get("x")?.as_f64()?, map.get("y")?.as_f64()?),
        Value::Array(items) if items.len() == 2 => (items[0].as_f64()?, items[1].as_f64()?),
        _ => return None,
    };
    Some(Vector::new(x, y))
}
