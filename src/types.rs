//! Data types for song sample relationships.
//!
//! This module contains the core data structures used throughout the crate:
//! the identity of a requested song, the sample relations parsed from its
//! page, and the record that is ultimately persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The (artist, title) pair a scrape request is made for.
///
/// The identity is immutable once a scrape request is created. It is used
/// both to derive a lookup URL and as the natural key for persistence.
///
/// # Examples
///
/// ```rust
/// use sampletree::SongIdentity;
///
/// let identity = SongIdentity::new("Drake", "Sticky");
/// assert_eq!(identity.original_song(), "Drake - Sticky");
/// assert_eq!(identity.search_query(), "Drake Sticky");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SongIdentity {
    /// The artist name as requested by the caller
    pub artist: String,
    /// The song title as requested by the caller
    pub title: String,
}

impl SongIdentity {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
        }
    }

    /// Canonical `"Artist - Title"` rendering, used as the persisted
    /// `original_song` field and as half of the upsert key.
    pub fn original_song(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }

    /// The query string submitted to the site's search endpoint. Also
    /// persisted alongside the record as the other half of the upsert key.
    pub fn search_query(&self) -> String {
        format!("{} {}", self.artist, self.title)
    }
}

impl std::fmt::Display for SongIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}

/// One row of a "contains samples of" or "Sampled in" table.
///
/// Fields that are missing from the page degrade to placeholder values
/// rather than failing the row; see the extraction rules in
/// [`crate::parsing`]. There is no uniqueness invariant beyond being scoped
/// to the parent record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRelation {
    /// Name of the related track ("Unknown Track" when absent)
    pub track_name: String,
    /// Credited artists, in display order ("Unknown Artist" when absent)
    pub artists: Vec<String>,
    /// Release year as displayed ("Unknown Year" when absent)
    pub release_year: String,
    /// Free-form extra detail from the row (empty when absent)
    pub additional_info: String,
    /// Absolute URL of the related track's page
    #[serde(rename = "url")]
    pub source_url: String,
}

/// The unit of persistence: one scraped song with both relation lists.
///
/// A record is constructed fresh on every scrape attempt; no intermediate
/// state is cached between attempts. It is written via an upsert keyed on
/// (`original_song`, `search_query`), so a re-scrape replaces the prior
/// document rather than duplicating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongRecord {
    /// The requested (artist, title) pair
    pub identity: SongIdentity,
    /// The search query this record was located with
    pub search_query: String,
    /// Tracks this song contains samples of
    pub samples: Vec<SampleRelation>,
    /// Tracks that sampled this song
    pub sampled_by: Vec<SampleRelation>,
    /// When the page was fetched
    pub fetched_at: DateTime<Utc>,
}

impl SongRecord {
    /// Canonical `"Artist - Title"` key string for this record.
    pub fn original_song(&self) -> String {
        self.identity.original_song()
    }

    /// The document shape as persisted and as printed by the CLI.
    pub fn to_document(&self) -> serde_json::Value {
        serde_json::json!({
            "original_song": self.original_song(),
            "search_query": self.search_query,
            "samples": self.samples,
            "sampled_by": self.sampled_by,
        })
    }
}
