//! HTML parsing for song sample pages.
//!
//! All of the selector-based extraction lives here so that markup-format
//! changes on the site require changes in one place only. Extraction is
//! best-effort: missing headings, cells or links degrade to placeholder
//! values, and only content that cannot be treated as markup at all is an
//! error. Behavior is pinned by fixture snapshots under `tests/fixtures/`.
//!
//! Expected page shape: an `h1` page title, and relation blocks as
//! `<section>` elements whose heading mentions either `contains samples of`
//! or `Sampled in`, each containing a data table with one row per related
//! track.

use crate::error::ScrapeError;
use crate::types::SampleRelation;
use scraper::{ElementRef, Html, Selector};

/// Heading marker for the "contains samples of" relation section.
/// Matched as a case-sensitive substring of the heading text.
const SAMPLES_HEADING: &str = "contains samples of";

/// Heading marker for the "Sampled in" relation section.
const SAMPLED_BY_HEADING: &str = "Sampled in";

/// Placeholder values for fields the page did not provide.
const UNKNOWN_TITLE: &str = "Unknown Title";
const UNKNOWN_TRACK: &str = "Unknown Track";
const UNKNOWN_ARTIST: &str = "Unknown Artist";
const UNKNOWN_YEAR: &str = "Unknown Year";

/// The partial record a page yields: display title plus both relation lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSong {
    pub title: String,
    pub samples: Vec<SampleRelation>,
    pub sampled_by: Vec<SampleRelation>,
}

/// Parser for song sample pages.
///
/// Stateless apart from the site origin used to resolve relative links.
#[derive(Debug, Clone)]
pub struct SamplePageParser {
    base_origin: String,
}

impl SamplePageParser {
    /// Create a parser resolving relative links against `base_origin`
    /// (scheme + host, e.g. `https://www.whosampled.com`).
    pub fn new(base_origin: impl Into<String>) -> Self {
        Self {
            base_origin: base_origin.into().trim_end_matches('/').to_string(),
        }
    }

    /// Extract the display title and both relation lists from page content.
    ///
    /// Returns [`ScrapeError::Unparseable`] only when the content cannot be
    /// treated as markup at all; every missing field inside an otherwise
    /// readable page becomes a placeholder instead.
    pub fn extract(&self, content: &str) -> Result<ExtractedSong, ScrapeError> {
        if content.trim().is_empty() {
            return Err(ScrapeError::Unparseable("empty response body".to_string()));
        }

        let document = Html::parse_document(content);

        let title = self.parse_title(&document);
        let samples = self.parse_relation_section(&document, SAMPLES_HEADING);
        let sampled_by = self.parse_relation_section(&document, SAMPLED_BY_HEADING);

        log::debug!(
            "Extracted '{title}': {} sample rows, {} sampled-by rows",
            samples.len(),
            sampled_by.len()
        );

        Ok(ExtractedSong {
            title,
            samples,
            sampled_by,
        })
    }

    fn parse_title(&self, document: &Html) -> String {
        let title_selector = Selector::parse("h1").unwrap();
        document
            .select(&title_selector)
            .next()
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
    }

    /// Collect relation rows from every section whose heading contains
    /// `heading_marker`. An absent section yields an empty list.
    fn parse_relation_section(
        &self,
        document: &Html,
        heading_marker: &str,
    ) -> Vec<SampleRelation> {
        let section_selector = Selector::parse("section").unwrap();
        let heading_selector = Selector::parse("h2, h3").unwrap();
        let row_selector = Selector::parse("table tbody tr").unwrap();

        let mut relations = Vec::new();

        for section in document.select(&section_selector) {
            let heading_matches = section
                .select(&heading_selector)
                .next()
                .map(|heading| {
                    heading
                        .text()
                        .collect::<String>()
                        .contains(heading_marker)
                })
                .unwrap_or(false);
            if !heading_matches {
                continue;
            }

            for row in section.select(&row_selector) {
                relations.push(self.parse_relation_row(&row));
            }
        }

        log::debug!(
            "Found {} rows for '{heading_marker}' sections",
            relations.len()
        );
        relations
    }

    /// Read one table row into a relation, substituting placeholders for
    /// whatever the row is missing. Rows are never skipped.
    fn parse_relation_row(&self, row: &ElementRef) -> SampleRelation {
        let name_selector = Selector::parse("a.trackName").unwrap();
        let artist_link_selector = Selector::parse(".trackArtist a").unwrap();
        let artist_selector = Selector::parse(".trackArtist").unwrap();
        let year_selector = Selector::parse(".trackYear").unwrap();
        let info_selector = Selector::parse(".trackInfo").unwrap();

        let name_link = row.select(&name_selector).next();

        let track_name = name_link
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| UNKNOWN_TRACK.to_string());

        let source_url = name_link
            .and_then(|el| el.value().attr("href"))
            .map(|href| self.resolve_url(href))
            .unwrap_or_default();

        // Prefer one artist per link; fall back to the cell's display text
        let mut artists: Vec<String> = row
            .select(&artist_link_selector)
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|text| !text.is_empty())
            .collect();
        if artists.is_empty() {
            artists = row
                .select(&artist_selector)
                .next()
                .map(|el| collapse_whitespace(&el.text().collect::<String>()))
                .filter(|text| !text.is_empty())
                .map(|text| vec![strip_by_prefix(&text)])
                .unwrap_or_default();
        }
        if artists.is_empty() {
            artists = vec![UNKNOWN_ARTIST.to_string()];
        }

        let release_year = row
            .select(&year_selector)
            .next()
            .map(|el| el.text().collect::<String>())
            .and_then(|text| extract_year(&text))
            .unwrap_or_else(|| UNKNOWN_YEAR.to_string());

        let additional_info = row
            .select(&info_selector)
            .next()
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .unwrap_or_default();

        SampleRelation {
            track_name,
            artists,
            release_year,
            additional_info,
            source_url,
        }
    }

    /// Prefix the site origin onto relative links; absolute links pass
    /// through untouched.
    fn resolve_url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if href.starts_with('/') {
            format!("{}{href}", self.base_origin)
        } else {
            format!("{}/{href}", self.base_origin)
        }
    }
}

/// Pull a four-digit year out of display text like "(2017)" or "2017".
fn extract_year(text: &str) -> Option<String> {
    let year_re = regex::Regex::new(r"\b(19|20)\d{2}\b").unwrap();
    year_re.find(text).map(|m| m.as_str().to_string())
}

/// Drop the "by " lead-in used on artist display strings.
fn strip_by_prefix(text: &str) -> String {
    text.strip_prefix("by ").unwrap_or(text).to_string()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
