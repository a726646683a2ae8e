//! SQLite implementation of the persistence gateway.
//!
//! # Responsibility
//! - Store entries in the `entries` table of a migrated workspace database.
//! - Keep SQL and JSON column encoding inside the gateway boundary.
//!
//! # Invariants
//! - `list_all` returns entries in creation order (`seq ASC`).
//! - Media and link-card payloads are stored as JSON text.
//! - Updates and deletes for unknown ids change nothing and succeed.

use crate::db::migrations::ensure_schema_ready;
use crate::gateway::{GatewayError, GatewayResult, PersistenceGateway, PositionUpdate};
use crate::model::entry::{Entry, EntryId, EntryPatch, LinkCard, MediaCard};
use crate::model::geometry::Point;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const ENTRY_SELECT_SQL: &str = "SELECT
    id,
    parent_id,
    text,
    pos_x,
    pos_y,
    media_json,
    link_cards_json
FROM entries";

/// Gateway writing to a borrowed, migrated SQLite connection.
pub struct SqliteEntryGateway<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEntryGateway<'conn> {
    /// Wraps a connection opened by `open_workspace_db*`.
    pub fn try_new(conn: &'conn Connection) -> GatewayResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    /// Loads one entry by id.
    pub fn get(&self, id: EntryId) -> GatewayResult<Option<Entry>> {
        let sql = format!("{ENTRY_SELECT_SQL} WHERE id = ?1;");
        let raw = self
            .conn
            .query_row(&sql, [id.to_string()], read_raw_row)
            .optional()?;
        raw.map(RawEntry::into_entry).transpose()
    }

    fn write_full(&self, entry: &Entry) -> GatewayResult<()> {
        self.conn.execute(
            "UPDATE entries
             SET parent_id = ?2,
                 text = ?3,
                 pos_x = ?4,
                 pos_y = ?5,
                 media_json = ?6,
                 link_cards_json = ?7,
                 updated_at = (CAST(strftime('%s', 'now') AS INTEGER) * 1000)
             WHERE id = ?1;",
            params![
                entry.id.to_string(),
                entry.parent_id.map(|value| value.to_string()),
                entry.text,
                entry.position.x,
                entry.position.y,
                encode_media(entry.media.as_ref())?,
                encode_link_cards(&entry.link_cards)?,
            ],
        )?;
        Ok(())
    }
}

impl PersistenceGateway for SqliteEntryGateway<'_> {
    fn create(&self, entry: &Entry) -> GatewayResult<()> {
        let seq: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(seq), -1) + 1 FROM entries;",
            [],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "INSERT OR REPLACE INTO entries (
                id,
                parent_id,
                text,
                pos_x,
                pos_y,
                media_json,
                link_cards_json,
                seq
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                entry.id.to_string(),
                entry.parent_id.map(|value| value.to_string()),
                entry.text,
                entry.position.x,
                entry.position.y,
                encode_media(entry.media.as_ref())?,
                encode_link_cards(&entry.link_cards)?,
                seq,
            ],
        )?;
        Ok(())
    }

    fn update(&self, id: EntryId, patch: &EntryPatch) -> GatewayResult<()> {
        let Some(mut entry) = self.get(id)? else {
            debug!("event=gateway_update module=gateway status=skip reason=unknown_id entry_id={id}");
            return Ok(());
        };
        patch.apply_to(&mut entry);
        self.write_full(&entry)
    }

    fn delete(&self, id: EntryId) -> GatewayResult<()> {
        self.conn
            .execute("DELETE FROM entries WHERE id = ?1;", [id.to_string()])?;
        Ok(())
    }

    fn list_all(&self) -> GatewayResult<Vec<Entry>> {
        let sql = format!("{ENTRY_SELECT_SQL} ORDER BY seq ASC;");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(read_raw_row(row)?.into_entry()?);
        }
        Ok(entries)
    }

    fn batch_update_positions(&self, updates: &[PositionUpdate]) -> GatewayResult<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "UPDATE entries
                 SET pos_x = ?2,
                     pos_y = ?3,
                     updated_at = (CAST(strftime('%s', 'now') AS INTEGER) * 1000)
                 WHERE id = ?1;",
            )?;
            for update in updates {
                stmt.execute(params![
                    update.id.to_string(),
                    update.position.x,
                    update.position.y
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

struct RawEntry {
    id: String,
    parent_id: Option<String>,
    text: String,
    pos_x: f64,
    pos_y: f64,
    media_json: Option<String>,
    link_cards_json: Option<String>,
}

impl RawEntry {
    fn into_entry(self) -> GatewayResult<Entry> {
        let id = parse_uuid(&self.id, "id")?;
        let parent_id = self
            .parent_id
            .as_deref()
            .map(|value| parse_uuid(value, "parent_id"))
            .transpose()?;
        let media = self
            .media_json
            .as_deref()
            .map(serde_json::from_str::<MediaCard>)
            .transpose()?;
        let link_cards = match self.link_cards_json.as_deref() {
            Some(json) => serde_json::from_str::<Vec<LinkCard>>(json)?,
            None => Vec::new(),
        };
        let entry = Entry {
            id,
            text: self.text,
            position: Point::new(self.pos_x, self.pos_y),
            parent_id,
            media,
            link_cards,
        };
        entry
            .validate()
            .map_err(|err| GatewayError::InvalidData(err.to_string()))?;
        Ok(entry)
    }
}

fn read_raw_row(row: &Row<'_>) -> rusqlite::Result<RawEntry> {
    Ok(RawEntry {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        text: row.get(2)?,
        pos_x: row.get(3)?,
        pos_y: row.get(4)?,
        media_json: row.get(5)?,
        link_cards_json: row.get(6)?,
    })
}

fn parse_uuid(value: &str, column: &str) -> GatewayResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|err| GatewayError::InvalidData(format!("invalid {column} `{value}`: {err}")))
}

fn encode_media(media: Option<&MediaCard>) -> GatewayResult<Option<String>> {
    Ok(media.map(serde_json::to_string).transpose()?)
}

fn encode_link_cards(link_cards: &[LinkCard]) -> GatewayResult<Option<String>> {
    if link_cards.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(link_cards)?))
}
