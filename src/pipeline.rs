//! One-song scrape orchestration.
//!
//! A pipeline run walks Locate → Fetch → CheckBotChallenge → Extract →
//! Persist for a single (artist, title) request. Every failure is terminal
//! for the invocation and surfaces as a typed [`ScrapeError`]; retry and
//! backoff policy belong to the caller (see [`crate::retry`]). Each
//! invocation is synchronous and self-contained; batched scraping means
//! independent pipeline instances sharing nothing but the store.

use crate::error::ScrapeError;
use crate::fetcher::{self, Fetcher};
use crate::locator::Locator;
use crate::parsing::SamplePageParser;
use crate::store::SongRepository;
use crate::types::{SongIdentity, SongRecord};
use crate::Result;
use chrono::Utc;
use rand::Rng;
use std::time::Duration;

/// Orchestrates one scrape request end to end.
pub struct Pipeline {
    locator: Locator,
    fetcher: Box<dyn Fetcher>,
    parser: SamplePageParser,
    repository: Box<dyn SongRepository>,
    render_js: bool,
    courtesy_delay_ms: Option<(u64, u64)>,
    challenge_patterns: Vec<String>,
}

impl Pipeline {
    pub fn new(
        locator: Locator,
        fetcher: Box<dyn Fetcher>,
        parser: SamplePageParser,
        repository: Box<dyn SongRepository>,
    ) -> Self {
        Self {
            locator,
            fetcher,
            parser,
            repository,
            render_js: false,
            courtesy_delay_ms: None,
            challenge_patterns: fetcher::default_challenge_patterns(),
        }
    }

    /// Fetch pages through the JS-rendering path.
    pub fn with_render_js(mut self, render_js: bool) -> Self {
        self.render_js = render_js;
        self
    }

    /// Sleep a random duration within `[min_ms, max_ms]` between the locate
    /// and page fetches. A courtesy policy only; parsing never depends on it.
    pub fn with_courtesy_delay(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.courtesy_delay_ms = Some((min_ms.min(max_ms), max_ms.max(min_ms)));
        self
    }

    /// Override the bot-challenge signatures checked against fetched content.
    pub fn with_challenge_patterns(mut self, patterns: Vec<String>) -> Self {
        self.challenge_patterns = patterns;
        self
    }

    /// Scrape one song and persist it.
    ///
    /// On success the persisted [`SongRecord`] is returned. A bot challenge
    /// stops the run before extraction; nothing partial is ever persisted.
    pub async fn scrape(&self, identity: &SongIdentity) -> Result<SongRecord> {
        log::info!("Scraping {identity}");

        let url = self
            .locator
            .locate(self.fetcher.as_ref(), identity)
            .await?;

        self.pause_between_requests().await;

        let content = self.fetcher.fetch(&url, self.render_js).await?;

        if fetcher::is_bot_challenge(&content, &self.challenge_patterns) {
            log::warn!("Content for {identity} matched a bot-challenge signature, stopping");
            return Err(ScrapeError::Blocked);
        }

        let extracted = self.parser.extract(&content)?;
        log::debug!(
            "Extracted page '{}' for {identity}: {} samples, {} sampled-by",
            extracted.title,
            extracted.samples.len(),
            extracted.sampled_by.len()
        );

        let record = SongRecord {
            identity: identity.clone(),
            search_query: identity.search_query(),
            samples: extracted.samples,
            sampled_by: extracted.sampled_by,
            fetched_at: Utc::now(),
        };

        let outcome = self.repository.upsert(&record).await?;
        log::info!("Stored {} ({outcome:?})", record.original_song());

        Ok(record)
    }

    async fn pause_between_requests(&self) {
        if let Some((min_ms, max_ms)) = self.courtesy_delay_ms {
            let delay = {
                let mut rng = rand::rng();
                rng.random_range(min_ms..=max_ms)
            };
            log::debug!("Courtesy delay of {delay}ms before page fetch");
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }
}
