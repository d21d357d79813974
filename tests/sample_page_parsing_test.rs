use sampletree::{Result, SamplePageParser};

const STICKY_PAGE: &str = include_str!("fixtures/sticky_track_page.html");

#[test_log::test]
fn sticky_fixture_parses_both_relation_tables() -> Result<()> {
    let parser = SamplePageParser::new("https://www.whosampled.com");
    let extracted = parser.extract(STICKY_PAGE)?;

    assert_eq!(extracted.title, "Sticky");
    assert!(!extracted.samples.is_empty(), "Should find sample rows");
    assert!(
        !extracted.sampled_by.is_empty(),
        "Should find sampled-by rows"
    );

    let sample_names: Vec<&str> = extracted
        .samples
        .iter()
        .map(|s| s.track_name.as_str())
        .collect();
    assert!(
        sample_names.contains(&"Passionfruit"),
        "Should contain 'Passionfruit'"
    );

    // Relative hrefs in the fixture must come back absolute
    for relation in extracted.samples.iter().chain(extracted.sampled_by.iter()) {
        assert!(
            relation.source_url.starts_with("https://www.whosampled.com/"),
            "Relation URL '{}' should be absolute",
            relation.source_url
        );
    }

    Ok(())
}

#[test]
fn fixture_contains_the_rows_the_parser_claims() {
    // Guard the snapshot itself: if the fixture is edited, the parser
    // assertions above lose their meaning.
    assert!(STICKY_PAGE.contains("contains samples of"));
    assert!(STICKY_PAGE.contains("Sampled in"));
    assert!(STICKY_PAGE.contains("Passionfruit"));
}
