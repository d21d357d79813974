use thiserror::Error;

/// Failure modes of a single fetch.
///
/// These are distinguished kinds rather than one opaque error because the
/// pipeline treats them differently: a [`FetchError::BotChallenge`] must be
/// reported without any automatic retry, while timeouts and network errors
/// may be retried by a caller-side policy (see [`crate::retry`]).
#[derive(Error, Debug)]
pub enum FetchError {
    /// The page did not reach its DOM milestone (or respond at all) within
    /// the configured bound. Partial content is never returned.
    #[error("timed out waiting for page")]
    Timeout,

    /// Connection, DNS or HTTP-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The response matched a known bot-challenge signature.
    #[error("response matched a bot-challenge signature")]
    BotChallenge,
}

/// Error types for scrape operations.
///
/// Every variant is terminal for a single scrape invocation; nothing is
/// retried automatically inside the pipeline. Callers receive a typed
/// reason so they can decide whether to retry, skip, or alert.
///
/// ```rust,no_run
/// use sampletree::{ScrapeError, SongIdentity};
///
/// # async fn run(pipeline: sampletree::Pipeline) {
/// let identity = SongIdentity::new("Drake", "Sticky");
/// match pipeline.scrape(&identity).await {
///     Ok(record) => println!("stored {}", record.original_song()),
///     Err(ScrapeError::Blocked) => eprintln!("bot challenge, backing off manually"),
///     Err(ScrapeError::NotFound(song)) => eprintln!("no page for {song}"),
///     Err(e) => eprintln!("scrape failed: {e}"),
/// }
/// # }
/// ```
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// No matching page could be located for the requested song.
    #[error("no page found for {0}")]
    NotFound(String),

    /// Network failure or timeout while fetching the page.
    #[error("page unreachable: {0}")]
    Unreachable(String),

    /// The fetched content matched a bot-challenge signature. The pipeline
    /// stops before extraction and never persists anything in this case.
    #[error("blocked by a bot challenge")]
    Blocked,

    /// The fetched content could not be parsed as markup at all.
    ///
    /// Missing headings, cells or links are not parse failures; those
    /// degrade to placeholder values instead.
    #[error("failed to parse page content: {0}")]
    Unparseable(String),

    /// The persistence layer rejected the write.
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

impl From<FetchError> for ScrapeError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout => ScrapeError::Unreachable("timed out".to_string()),
            FetchError::Network(msg) => ScrapeError::Unreachable(msg),
            FetchError::BotChallenge => ScrapeError::Blocked,
        }
    }
}
