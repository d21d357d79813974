//! Page fetching.
//!
//! A single [`Fetcher`] abstraction covers both fetch capabilities: a plain
//! HTTP GET for static markup, and a rendering-service round trip for pages
//! whose relation tables only exist after script execution. Which path runs
//! is selected per call with the `render_js` flag rather than by separate
//! code paths.

use crate::error::FetchError;
use crate::headers;
use async_trait::async_trait;
use http_client::{HttpClient, Request, Response};
use http_types::{Body, Method, Url};
use std::time::Duration;

/// Signatures that indicate automated-traffic detection in a response body.
///
/// Matching is case-insensitive substring search. The list is configurable
/// via [`FetcherConfig::challenge_patterns`] so new challenge pages can be
/// recognized without code changes.
const DEFAULT_CHALLENGE_PATTERNS: &[&str] = &[
    "captcha",
    "verify you are human",
    "verify you're human",
    "prove you're not a robot",
    "pardon our interruption",
    "access to this page has been denied",
    "unusual traffic",
    "cf-challenge",
    "security check",
];

/// Default challenge signature list, exposed so the pipeline can run the
/// same detection over content returned by any [`Fetcher`] implementation.
pub fn default_challenge_patterns() -> Vec<String> {
    DEFAULT_CHALLENGE_PATTERNS
        .iter()
        .map(|p| p.to_string())
        .collect()
}

/// Check page content against a challenge signature list.
pub fn is_bot_challenge(content: &str, patterns: &[String]) -> bool {
    let lowered = content.to_lowercase();
    patterns
        .iter()
        .any(|pattern| lowered.contains(&pattern.to_lowercase()))
}

/// Configuration for [`PageFetcher`].
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Rotate the identification header per request. Off by default; the
    /// fixed default agent is always sufficient for correctness.
    pub rotate_user_agent: bool,
    /// Bound for a plain GET round trip.
    pub request_timeout: Duration,
    /// Base URL of the rendering service used when `render_js` is set.
    /// `None` means JS rendering is unavailable and such fetches fail.
    pub render_endpoint: Option<String>,
    /// Selector that must be present before rendered content is returned.
    pub render_marker: String,
    /// Bound for the marker selector to appear in the rendered page.
    pub render_timeout: Duration,
    /// Pause between incremental scrolls while waiting for lazy rows.
    pub scroll_settle: Duration,
    /// Challenge signatures checked against every fetched body.
    pub challenge_patterns: Vec<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            rotate_user_agent: false,
            request_timeout: Duration::from_secs(30),
            render_endpoint: None,
            render_marker: "section.track-connections".to_string(),
            render_timeout: Duration::from_secs(15),
            scroll_settle: Duration::from_millis(400),
            challenge_patterns: default_challenge_patterns(),
        }
    }
}

/// Trait for page retrieval, mockable for testing.
///
/// Returns the raw page content for a URL, or a typed fetch failure. When
/// `render_js` is set the content is only returned once the page's DOM
/// milestone has been reached and lazy rows have been scrolled in.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait(?Send)]
pub trait Fetcher {
    async fn fetch(&self, url: &str, render_js: bool) -> Result<String, FetchError>;
}

/// Page function submitted to the rendering service.
///
/// Navigates, waits for the marker selector, then repeatedly scrolls to the
/// bottom re-measuring page height until two consecutive measurements agree,
/// so lazily-rendered rows are present before the content is captured. The
/// browser context lives only for this one request.
const RENDER_FUNCTION: &str = r#"
export default async function ({ page, context }) {
    await page.goto(context.url, { waitUntil: "domcontentloaded" });
    await page.waitForSelector(context.marker, { timeout: context.timeoutMs });
    let previous = -1;
    while (true) {
        const height = await page.evaluate("document.body.scrollHeight");
        if (height === previous) {
            break;
        }
        previous = height;
        await page.evaluate("window.scrollTo(0, document.body.scrollHeight)");
        await new Promise((resolve) => setTimeout(resolve, context.settleMs));
    }
    return { data: await page.content(), type: "text/html" };
}
"#;

/// Fetcher backed by an injected HTTP client.
///
/// The static path issues a browser-identified GET and follows redirects
/// manually. The render path posts [`RENDER_FUNCTION`] to a
/// browserless-style service which executes it in a throwaway browser
/// context and returns the settled markup.
pub struct PageFetcher {
    client: Box<dyn HttpClient>,
    config: FetcherConfig,
}

impl PageFetcher {
    /// Create a fetcher with default configuration.
    ///
    /// # Arguments
    ///
    /// * `client` - Any HTTP client implementation that implements [`HttpClient`]
    pub fn new(client: Box<dyn HttpClient>) -> Self {
        Self::with_config(client, FetcherConfig::default())
    }

    pub fn with_config(client: Box<dyn HttpClient>, config: FetcherConfig) -> Self {
        Self { client, config }
    }

    async fn send_bounded(&self, request: Request, bound: Duration) -> Result<Response, FetchError> {
        match tokio::time::timeout(bound, self.client.send(request)).await {
            Err(_) => Err(FetchError::Timeout),
            Ok(result) => result.map_err(|e| FetchError::Network(e.to_string())),
        }
    }

    async fn fetch_static(&self, url: &str) -> Result<String, FetchError> {
        let mut current = url.to_string();

        // Follow redirects manually, bounded
        for _ in 0..5 {
            let parsed = current
                .parse::<Url>()
                .map_err(|e| FetchError::Network(format!("invalid url {current}: {e}")))?;
            let mut request = Request::new(Method::Get, parsed);
            headers::add_page_headers(
                &mut request,
                headers::pick_user_agent(self.config.rotate_user_agent),
            );

            let mut response = self.send_bounded(request, self.config.request_timeout).await?;

            if response.status() == 301 || response.status() == 302 {
                let location = response
                    .header("location")
                    .and_then(|values| values.get(0))
                    .map(|value| value.as_str().to_string());
                match location {
                    Some(next) if next.starts_with('/') => {
                        let origin = origin_of(&current)?;
                        log::debug!("Following redirect from {current} to {origin}{next}");
                        current = format!("{origin}{next}");
                        continue;
                    }
                    Some(next) => {
                        log::debug!("Following redirect from {current} to {next}");
                        current = next;
                        continue;
                    }
                    None => {
                        return Err(FetchError::Network(format!(
                            "redirect without location from {current}"
                        )))
                    }
                }
            }

            if !response.status().is_success() {
                return Err(FetchError::Network(format!(
                    "HTTP {} fetching {current}",
                    response.status()
                )));
            }

            return response
                .body_string()
                .await
                .map_err(|e| FetchError::Network(e.to_string()));
        }

        Err(FetchError::Network(format!("too many redirects from {url}")))
    }

    async fn fetch_rendered(&self, url: &str) -> Result<String, FetchError> {
        let endpoint = self.config.render_endpoint.as_deref().ok_or_else(|| {
            FetchError::Network("render_js requested but no rendering endpoint configured".to_string())
        })?;

        let function_url = format!("{}/function", endpoint.trim_end_matches('/'));
        let parsed = function_url
            .parse::<Url>()
            .map_err(|e| FetchError::Network(format!("invalid render endpoint: {e}")))?;

        let payload = serde_json::json!({
            "code": RENDER_FUNCTION,
            "context": {
                "url": url,
                "marker": self.config.render_marker,
                "timeoutMs": self.config.render_timeout.as_millis() as u64,
                "settleMs": self.config.scroll_settle.as_millis() as u64,
            },
        });

        let mut request = Request::new(Method::Post, parsed);
        request.set_body(
            Body::from_json(&payload).map_err(|e| FetchError::Network(e.to_string()))?,
        );

        // The service enforces the marker timeout itself; the outer bound
        // covers navigation, scrolling and transfer on top of it.
        let bound = self.config.render_timeout + Duration::from_secs(30);
        let mut response = self.send_bounded(request, bound).await?;

        let body = response
            .body_string()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if !response.status().is_success() {
            // waitForSelector expiry surfaces as a TimeoutError from the
            // service rather than an HTTP-level timeout
            if body.contains("TimeoutError") || body.to_lowercase().contains("timeout") {
                log::debug!("Rendering service reported timeout for {url}");
                return Err(FetchError::Timeout);
            }
            return Err(FetchError::Network(format!(
                "rendering service returned HTTP {}: {body}",
                response.status()
            )));
        }

        Ok(body)
    }
}

#[async_trait(?Send)]
impl Fetcher for PageFetcher {
    async fn fetch(&self, url: &str, render_js: bool) -> Result<String, FetchError> {
        log::debug!("Fetching {url} (render_js: {render_js})");
        let content = if render_js {
            self.fetch_rendered(url).await?
        } else {
            self.fetch_static(url).await?
        };

        if is_bot_challenge(&content, &self.config.challenge_patterns) {
            log::warn!("Fetched content for {url} matched a bot-challenge signature");
            return Err(FetchError::BotChallenge);
        }

        Ok(content)
    }
}

/// Scheme + authority of a URL, for resolving relative redirect targets.
fn origin_of(url: &str) -> Result<String, FetchError> {
    let parsed = url
        .parse::<Url>()
        .map_err(|e| FetchError::Network(format!("invalid url {url}: {e}")))?;
    let mut origin = format!("{}://", parsed.scheme());
    origin.push_str(parsed.host_str().unwrap_or_default());
    if let Some(port) = parsed.port() {
        origin.push_str(&format!(":{port}"));
    }
    Ok(origin)
}
