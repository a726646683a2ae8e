//! Entry domain model.
//!
//! # Responsibility
//! - Define the canonical record for one note placed on the canvas.
//! - Provide the tagged media payload and link-preview payloads.
//! - Provide the text normalization used for duplicate suppression.
//!
//! # Invariants
//! - `id` is stable and never reused for another entry.
//! - `text` is newline-delimited; an empty string is valid for media entries.
//! - `position` must be finite.

use crate::model::geometry::{is_finite_point, Point};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for one entry.
pub type EntryId = Uuid;

/// Media kinds that carry a title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Song,
    Movie,
}

/// Coarse classification of an entry by payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Plain text note (may contain URLs with link cards).
    Text,
    /// Embedded image.
    Image,
    /// Rich media object with a title.
    Media(MediaKind),
}

/// Embedded media payload. At most one per entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaCard {
    Image {
        url: String,
        #[serde(default)]
        width: Option<u32>,
        #[serde(default)]
        height: Option<u32>,
    },
    Song {
        title: String,
        #[serde(default)]
        artist: Option<String>,
        #[serde(default)]
        cover_url: Option<String>,
    },
    Movie {
        title: String,
        #[serde(default)]
        year: Option<u16>,
        #[serde(default)]
        poster_url: Option<String>,
    },
}

impl MediaCard {
    /// Returns the human title for song/movie payloads.
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Image { .. } => None,
            Self::Song { title, .. } | Self::Movie { title, .. } => Some(title.as_str()),
        }
    }

    /// Returns the entry kind implied by this payload.
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Image { .. } => EntryKind::Image,
            Self::Song { .. } => EntryKind::Media(MediaKind::Song),
            Self::Movie { .. } => EntryKind::Media(MediaKind::Movie),
        }
    }

    /// Short one-line description used in hub suggestion requests.
    pub fn summary(&self) -> String {
        match self {
            Self::Image { .. } => "image".to_string(),
            Self::Song { title, artist, .. } => match artist {
                Some(artist) => format!("song: {title} by {artist}"),
                None => format!("song: {title}"),
            },
            Self::Movie { title, year, .. } => match year {
                Some(year) => format!("movie: {title} ({year})"),
                None => format!("movie: {title}"),
            },
        }
    }
}

/// Link preview payload for one URL found in entry text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCard {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub site_name: Option<String>,
}

impl LinkCard {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            description: None,
            image_url: None,
            site_name: None,
        }
    }
}

/// Validation failures for entry records.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryValidationError {
    /// Nil UUID cannot identify an entry.
    NilId,
    /// Position contains NaN or infinity.
    NonFinitePosition { x: f64, y: f64 },
    /// Entry lists itself as its own parent.
    SelfParent(EntryId),
}

impl Display for EntryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "entry id must not be nil"),
            Self::NonFinitePosition { x, y } => {
                write!(f, "entry position must be finite, got ({x}, {y})")
            }
            Self::SelfParent(id) => write!(f, "entry cannot be its own parent: {id}"),
        }
    }
}

impl Error for EntryValidationError {}

/// One note on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    /// Newline-delimited text lines.
    pub text: String,
    pub position: Point,
    /// `None` means root level (child of the anchor).
    pub parent_id: Option<EntryId>,
    #[serde(default)]
    pub media: Option<MediaCard>,
    #[serde(default)]
    pub link_cards: Vec<LinkCard>,
}

impl Entry {
    /// Builds an entry from creation input and a caller-assigned id.
    pub fn from_new(id: EntryId, new: NewEntry) -> Self {
        Self {
            id,
            text: new.text,
            position: new.position,
            parent_id: new.parent_id,
            media: new.media,
            link_cards: new.link_cards,
        }
    }

    /// Checks record-level invariants.
    pub fn validate(&self) -> Result<(), EntryValidationError> {
        if self.id.is_nil() {
            return Err(EntryValidationError::NilId);
        }
        if !is_finite_point(self.position) {
            return Err(EntryValidationError::NonFinitePosition {
                x: self.position.x,
                y: self.position.y,
            });
        }
        if self.parent_id == Some(self.id) {
            return Err(EntryValidationError::SelfParent(self.id));
        }
        Ok(())
    }

    pub fn kind(&self) -> EntryKind {
        self.media.as_ref().map_or(EntryKind::Text, MediaCard::kind)
    }

    /// Text lines in order. Empty text yields no lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }

    /// First line with non-whitespace content.
    pub fn first_line(&self) -> Option<&str> {
        self.lines().map(str::trim).find(|line| !line.is_empty())
    }

    /// Normalized text used for sibling duplicate checks.
    pub fn normalized_text(&self) -> String {
        normalize_text(&self.text)
    }

    /// Returns `true` when the entry has neither text nor media.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty() && self.media.is_none()
    }

    /// Captures the editable content fields.
    pub fn content_snapshot(&self) -> ContentSnapshot {
        ContentSnapshot {
            text: self.text.clone(),
            media: self.media.clone(),
            link_cards: self.link_cards.clone(),
        }
    }
}

/// Creation input for a new entry. The store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub text: String,
    pub position: Point,
    pub parent_id: Option<EntryId>,
    pub media: Option<MediaCard>,
    pub link_cards: Vec<LinkCard>,
}

impl NewEntry {
    /// Text entry at `position` under `parent_id`.
    pub fn text(text: impl Into<String>, position: Point, parent_id: Option<EntryId>) -> Self {
        Self {
            text: text.into(),
            position,
            parent_id,
            media: None,
            link_cards: Vec::new(),
        }
    }

    pub fn with_media(mut self, media: MediaCard) -> Self {
        self.media = Some(media);
        self
    }

    pub fn with_link_cards(mut self, link_cards: Vec<LinkCard>) -> Self {
        self.link_cards = link_cards;
        self
    }
}

/// Editable content of an entry, captured for edit undo/redo.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentSnapshot {
    pub text: String,
    pub media: Option<MediaCard>,
    pub link_cards: Vec<LinkCard>,
}

/// Partial change applied by `EntryStore::update`.
///
/// `None` leaves the field untouched. `media: Some(None)` clears the media
/// payload; `parent_id: Some(None)` moves the entry to root level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPatch {
    pub text: Option<String>,
    pub position: Option<Point>,
    pub media: Option<Option<MediaCard>>,
    pub link_cards: Option<Vec<LinkCard>>,
    pub parent_id: Option<Option<EntryId>>,
}

impl EntryPatch {
    pub fn position(position: Point) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn parent(parent_id: Option<EntryId>) -> Self {
        Self {
            parent_id: Some(parent_id),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.position.is_none()
            && self.media.is_none()
            && self.link_cards.is_none()
            && self.parent_id.is_none()
    }

    /// Applies every present field onto `entry`.
    pub fn apply_to(&self, entry: &mut Entry) {
        if let Some(text) = &self.text {
            entry.text = text.clone();
        }
        if let Some(position) = self.position {
            entry.position = position;
        }
        if let Some(media) = &self.media {
            entry.media = media.clone();
        }
        if let Some(link_cards) = &self.link_cards {
            entry.link_cards = link_cards.clone();
        }
        if let Some(parent_id) = self.parent_id {
            entry.parent_id = parent_id;
        }
    }
}

impl From<ContentSnapshot> for EntryPatch {
    fn from(value: ContentSnapshot) -> Self {
        Self {
            text: Some(value.text),
            media: Some(value.media),
            link_cards: Some(value.link_cards),
            ..Self::default()
        }
    }
}

/// Trims and case-folds text for duplicate comparisons.
pub fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}
