#[cfg(feature = "mock")]
mod mock_tests {
    use mockall::predicate::*;
    use sampletree::{
        LocateStrategy, Locator, MockFetcher, MockSongRepository, Pipeline, SamplePageParser,
        ScrapeError, SongIdentity, UpsertOutcome,
    };

    const BASE_URL: &str = "https://www.whosampled.com";

    fn pipeline(fetcher: MockFetcher, repository: MockSongRepository) -> Pipeline {
        Pipeline::new(
            Locator::new(BASE_URL, LocateStrategy::Direct),
            Box::new(fetcher),
            SamplePageParser::new(BASE_URL),
            Box::new(repository),
        )
    }

    #[tokio::test]
    async fn upsert_is_called_exactly_once_per_successful_scrape() {
        let page = r#"
            <html><body>
            <h1>Sticky</h1>
            <section>
                <h3>Sticky contains samples of 1 song</h3>
                <table><tbody><tr>
                    <td><a class="trackName" href="/Drake/Passionfruit/">Passionfruit</a>
                        <span class="trackArtist">by <a href="/Drake/">Drake</a></span></td>
                    <td><span class="trackYear">(2017)</span></td>
                </tr></tbody></table>
            </section>
            </body></html>
        "#;

        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .with(eq("https://www.whosampled.com/Drake/Sticky/"), eq(false))
            .times(1)
            .returning(move |_, _| Ok(page.to_string()));

        let mut repository = MockSongRepository::new();
        repository
            .expect_upsert()
            .times(1)
            .returning(|_| Ok(UpsertOutcome::Inserted));

        let identity = SongIdentity::new("Drake", "Sticky");
        let record = pipeline(fetcher, repository).scrape(&identity).await.unwrap();

        assert_eq!(record.samples.len(), 1);
        assert_eq!(record.samples[0].track_name, "Passionfruit");
        assert_eq!(record.samples[0].release_year, "2017");
    }

    #[tokio::test]
    async fn blocked_scrape_never_reaches_the_repository() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_, _| Ok("<html><body>Please solve this CAPTCHA</body></html>".to_string()));

        let mut repository = MockSongRepository::new();
        repository.expect_upsert().times(0);

        let identity = SongIdentity::new("Drake", "Sticky");
        let err = pipeline(fetcher, repository)
            .scrape(&identity)
            .await
            .unwrap_err();

        assert!(matches!(err, ScrapeError::Blocked));
    }

    #[tokio::test]
    async fn storage_failure_surfaces_as_typed_error() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_, _| Ok("<html><h1>Sticky</h1></html>".to_string()));

        let mut repository = MockSongRepository::new();
        repository
            .expect_upsert()
            .times(1)
            .returning(|_| Err(ScrapeError::Storage(sqlx::Error::PoolClosed)));

        let identity = SongIdentity::new("Drake", "Sticky");
        let err = pipeline(fetcher, repository)
            .scrape(&identity)
            .await
            .unwrap_err();

        assert!(matches!(err, ScrapeError::Storage(_)));
    }
}
