//! Canonical page URL resolution for a requested song.
//!
//! Two strategies are supported. Direct construction guesses the page URL
//! from slugs and costs no network round trip; if the site's slug rules
//! differ from the guess, the ensuing fetch or parse failure is the signal
//! that the song was not found. Search-and-match fetches the site's search
//! results and picks the first entry whose title matches exactly
//! (case-insensitive) and whose displayed artist contains the requested
//! artist (case-insensitive substring).

use crate::error::ScrapeError;
use crate::fetcher::Fetcher;
use crate::types::SongIdentity;
use scraper::{Html, Selector};

/// How [`Locator::locate`] resolves an identity to a page URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateStrategy {
    /// Slugify artist and title into a fixed URL template.
    Direct,
    /// Fetch the search results page and match against its entries.
    Search,
}

/// Resolves a [`SongIdentity`] to the URL of its page.
#[derive(Debug, Clone)]
pub struct Locator {
    base_url: String,
    strategy: LocateStrategy,
}

/// One entry of a search results list.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SearchHit {
    title: String,
    /// Displayed artist string, e.g. "by Drake feat. Bad Bunny"
    artist: String,
    url: String,
}

impl Locator {
    pub fn new(base_url: impl Into<String>, strategy: LocateStrategy) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            strategy,
        }
    }

    /// Resolve the page URL for `identity`.
    ///
    /// Only the search strategy issues a network fetch. Returns
    /// [`ScrapeError::NotFound`] when no search entry matches.
    pub async fn locate(
        &self,
        fetcher: &dyn Fetcher,
        identity: &SongIdentity,
    ) -> Result<String, ScrapeError> {
        match self.strategy {
            LocateStrategy::Direct => {
                let url = self.direct_url(identity);
                log::debug!("Constructed direct URL {url} for {identity}");
                Ok(url)
            }
            LocateStrategy::Search => {
                let search_url = self.search_url(identity);
                log::debug!("Searching {search_url} for {identity}");
                // Search pages are static markup; no rendering needed
                let content = fetcher.fetch(&search_url, false).await?;
                let hits = parse_search_results(&content, &self.base_url);
                log::debug!("Search returned {} entries", hits.len());

                select_match(&hits, identity)
                    .map(|hit| hit.url.clone())
                    .ok_or_else(|| ScrapeError::NotFound(identity.original_song()))
            }
        }
    }

    /// Deterministic slug-template URL for an identity.
    pub fn direct_url(&self, identity: &SongIdentity) -> String {
        format!(
            "{}/{}/{}/",
            self.base_url,
            slugify(&identity.artist),
            slugify(&identity.title)
        )
    }

    /// Track-search URL for an identity's query string.
    pub fn search_url(&self, identity: &SongIdentity) -> String {
        format!(
            "{}/search/tracks/?q={}",
            self.base_url,
            urlencoding::encode(&identity.search_query())
        )
    }
}

/// URL-safe slug: trimmed, interior whitespace runs become single hyphens.
pub fn slugify(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Parse the entries of a search results page.
fn parse_search_results(content: &str, base_url: &str) -> Vec<SearchHit> {
    let document = Html::parse_document(content);
    let entry_selector = Selector::parse("ul.searchResults li").unwrap();
    let name_selector = Selector::parse("a.trackName").unwrap();
    let artist_selector = Selector::parse(".trackArtist").unwrap();

    let mut hits = Vec::new();
    for entry in document.select(&entry_selector) {
        // An entry without a link cannot produce a URL; skip it
        let Some(link) = entry.select(&name_selector).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };

        let title = link.text().collect::<String>().trim().to_string();
        let artist = entry
            .select(&artist_selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        let url = if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else {
            format!("{base_url}{href}")
        };

        hits.push(SearchHit { title, artist, url });
    }
    hits
}

/// First entry whose title equals the requested title (case-insensitive)
/// and whose displayed artist contains the requested artist
/// (case-insensitive). Ties go to document order.
fn select_match<'a>(hits: &'a [SearchHit], identity: &SongIdentity) -> Option<&'a SearchHit> {
    let wanted_title = identity.title.trim().to_lowercase();
    let wanted_artist = identity.artist.trim().to_lowercase();

    hits.iter().find(|hit| {
        hit.title.to_lowercase() == wanted_title
            && hit.artist.to_lowercase().contains(&wanted_artist)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::MockFetcher;

    const SEARCH_PAGE: &str = r#"
        <html><body>
        <ul class="searchResults">
            <li>
                <a class="trackName" href="/Drake/Sticky-Situation/">Sticky Situation</a>
                <span class="trackArtist">by Drake</span>
            </li>
            <li>
                <a class="trackName" href="/Tyga/Sticky/">Sticky</a>
                <span class="trackArtist">by Tyga</span>
            </li>
            <li>
                <a class="trackName" href="/Drake/Sticky/">Sticky</a>
                <span class="trackArtist">by Drake</span>
            </li>
        </ul>
        </body></html>
    "#;

    fn identity() -> SongIdentity {
        SongIdentity::new("Drake", "Sticky")
    }

    #[test]
    fn slugs_trim_and_hyphenate() {
        assert_eq!(slugify("  Drake "), "Drake");
        assert_eq!(slugify("The Notorious B.I.G."), "The-Notorious-B.I.G.");
        assert_eq!(slugify("Never  Gonna   Give"), "Never-Gonna-Give");
    }

    #[test]
    fn direct_url_is_deterministic() {
        let locator = Locator::new("https://www.whosampled.com", LocateStrategy::Direct);
        let first = locator.direct_url(&identity());
        let second = locator.direct_url(&identity());
        assert_eq!(first, second);
        assert_eq!(first, "https://www.whosampled.com/Drake/Sticky/");
    }

    #[test]
    fn exact_title_beats_superstring_title() {
        let hits = parse_search_results(SEARCH_PAGE, "https://www.whosampled.com");
        assert_eq!(hits.len(), 3);

        let hit = select_match(&hits, &identity()).unwrap();
        // "Sticky Situation" by Drake and "Sticky" by Tyga both lose
        assert_eq!(hit.url, "https://www.whosampled.com/Drake/Sticky/");
    }

    #[test]
    fn artist_match_is_substring_of_display_string() {
        let hits = vec![SearchHit {
            title: "Sticky".to_string(),
            artist: "by Drake feat. Lil Yachty".to_string(),
            url: "https://www.whosampled.com/Drake/Sticky/".to_string(),
        }];
        assert!(select_match(&hits, &identity()).is_some());

        let misses = vec![SearchHit {
            title: "Sticky".to_string(),
            artist: "by GloRilla".to_string(),
            url: "https://www.whosampled.com/GloRilla/Sticky/".to_string(),
        }];
        assert!(select_match(&misses, &identity()).is_none());
    }

    #[test]
    fn title_match_ignores_case() {
        let hits = vec![SearchHit {
            title: "STICKY".to_string(),
            artist: "by drake".to_string(),
            url: "https://www.whosampled.com/Drake/STICKY/".to_string(),
        }];
        assert!(select_match(&hits, &identity()).is_some());
    }

    #[tokio::test]
    async fn search_locates_first_matching_entry() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .withf(|url, render_js| url.contains("/search/tracks/?q=Drake%20Sticky") && !render_js)
            .times(1)
            .returning(|_, _| Ok(SEARCH_PAGE.to_string()));

        let locator = Locator::new("https://www.whosampled.com", LocateStrategy::Search);
        let url = locator.locate(&fetcher, &identity()).await.unwrap();
        assert_eq!(url, "https://www.whosampled.com/Drake/Sticky/");
    }

    #[tokio::test]
    async fn search_without_match_is_not_found() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_, _| Ok("<html><ul class=\"searchResults\"></ul></html>".to_string()));

        let locator = Locator::new("https://www.whosampled.com", LocateStrategy::Search);
        let err = locator.locate(&fetcher, &identity()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::NotFound(song) if song == "Drake - Sticky"));
    }
}
