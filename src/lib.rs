//! Scrapes song pages from a music-sampling database, extracts "samples"
//! and "sampled by" relationships, and upserts them into Postgres.
//!
//! The core is a single [`Pipeline`] per (artist, title) request:
//! Locate → Fetch → CheckBotChallenge → Extract → Persist. Fetching is
//! polymorphic over a plain HTTP GET and a JS-rendering session behind one
//! [`Fetcher`] trait; extraction is isolated in [`parsing`] so markup
//! changes on the site touch one place only.

pub mod error;
pub mod fetcher;
pub mod headers;
pub mod locator;
pub mod parsing;
pub mod pipeline;
pub mod retry;
pub mod store;
pub mod types;

pub use error::{FetchError, ScrapeError};
pub use fetcher::{default_challenge_patterns, Fetcher, FetcherConfig, PageFetcher};
pub use locator::{slugify, LocateStrategy, Locator};
pub use parsing::{ExtractedSong, SamplePageParser};
pub use pipeline::Pipeline;
pub use retry::{retry_scrape, RetryConfig, RetryResult};
pub use store::{SongRepository, SongStore, UpsertOutcome};
pub use types::{SampleRelation, SongIdentity, SongRecord};

#[cfg(any(test, feature = "mock"))]
pub use fetcher::MockFetcher;
#[cfg(any(test, feature = "mock"))]
pub use store::MockSongRepository;

// Re-export scraper types for fixture-based testing
pub use scraper::Html;

pub type Result<T> = std::result::Result<T, ScrapeError>;
