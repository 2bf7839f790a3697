//! Discovery pass integration tests.
//!
//! Feed, metadata, payloads and the transfer daemon are mocked; the episode
//! store is a real SQLite database.

mod common;

use common::{release_name, Harness};
use episodic_core::{
    config::ShowRegistry,
    load_config_from_str,
    planner::{discover_show, ShowDiscovery},
    run_discovery_pass,
    testing::fixtures,
    AddTorrentRequest, EpisodeFilter, EpisodeStatus, EpisodeStore, TorrentClient,
    TorrentClientError,
};

#[tokio::test]
async fn test_new_item_creates_incomplete_record_with_handle() {
    let h = Harness::new();
    h.metadata.add_series("Dexter", 1).await;
    let hash = h.publish("Dexter", 1, 1, "Dexter").await;

    let ctx = h.context(vec![h.show("dexter", h.entry("Dexter"))]);
    let report = run_discovery_pass(&ctx).await;

    assert!(report.aborted.is_none());
    assert_eq!(report.submitted_count(), 1);
    let submitted = &report.shows[0].submitted[0];
    assert_eq!((submitted.season, submitted.episode), (1, 1));
    assert!(!submitted.resumed_duplicate);

    let record = h.store.find("dexter", 1, 1).unwrap().expect("record");
    assert_eq!(record.status, EpisodeStatus::Incomplete);
    assert_eq!(record.transfer_handle.as_deref(), Some(hash.as_str()));
    assert_eq!(record.title, "Dexter");
    assert_eq!(record.series_name, "Dexter");
    assert!(h.client.has_torrent(&hash).await);
}

#[tokio::test]
async fn test_second_pass_submits_nothing_new() {
    let h = Harness::new();
    h.metadata.add_series("Dexter", 1).await;
    h.publish("Dexter", 1, 1, "Dexter").await;
    h.publish("Dexter", 1, 2, "Crocodile").await;

    let mut entry = h.entry("Dexter");
    entry.max_concurrent = Some(5);
    let ctx = h.context(vec![h.show("dexter", entry)]);
    let first = run_discovery_pass(&ctx).await;
    let second = run_discovery_pass(&ctx).await;

    assert_eq!(first.submitted_count(), 2);
    assert_eq!(second.submitted_count(), 0);
    assert_eq!(second.shows[0].skipped.already_tracked, 2);
    assert_eq!(h.client.added_torrents().await.len(), 2);
    assert_eq!(
        h.store.count(&EpisodeFilter::new().with_show("dexter")).unwrap(),
        2
    );
}

#[tokio::test]
async fn test_incomplete_count_never_exceeds_limit() {
    let h = Harness::new();
    h.metadata.add_series("Dexter", 1).await;
    for episode in 1..=4 {
        h.publish("Dexter", 1, episode, &format!("Episode {}", episode))
            .await;
    }

    let mut entry = h.entry("Dexter");
    entry.max_concurrent = Some(2);
    let ctx = h.context(vec![h.show("dexter", entry)]);

    let report = run_discovery_pass(&ctx).await;
    assert_eq!(report.submitted_count(), 2);
    assert!(report.shows[0].capped);

    let incomplete = EpisodeFilter::new()
        .with_show("dexter")
        .with_status(EpisodeStatus::Incomplete);
    assert_eq!(h.store.count(&incomplete).unwrap(), 2);

    // Still at the limit: nothing more goes out.
    let report = run_discovery_pass(&ctx).await;
    assert_eq!(report.submitted_count(), 0);
    assert_eq!(h.store.count(&incomplete).unwrap(), 2);
}

#[tokio::test]
async fn test_episodes_processed_in_order_regardless_of_arrival() {
    let h = Harness::new();
    h.metadata.add_series("Dexter", 1).await;
    h.publish("Dexter", 1, 5, "Five").await;
    h.publish("Dexter", 1, 3, "Three").await;

    let mut entry = h.entry("Dexter");
    entry.max_concurrent = Some(1);
    let ctx = h.context(vec![h.show("dexter", entry)]);

    let report = run_discovery_pass(&ctx).await;
    assert_eq!(report.submitted_count(), 1);
    assert_eq!(report.shows[0].submitted[0].episode, 3);
    assert!(h.store.find("dexter", 1, 5).unwrap().is_none());
}

#[tokio::test]
async fn test_items_below_floor_are_skipped() {
    let h = Harness::new();
    h.metadata.add_series("Dexter", 2).await;
    h.publish("Dexter", 2, 3, "Old").await;
    h.publish("Dexter", 2, 6, "New").await;

    let mut entry = h.entry("Dexter");
    entry.start_season = Some(2);
    entry.start_episode = Some(5);
    let ctx = h.context(vec![h.show("dexter", entry)]);

    let report = run_discovery_pass(&ctx).await;
    assert_eq!(report.submitted_count(), 1);
    assert_eq!(report.shows[0].skipped.below_floor, 1);
    assert!(h.store.find("dexter", 2, 3).unwrap().is_none());
    assert!(h.store.find("dexter", 2, 6).unwrap().is_some());

    // Seasons before the floor are never fetched.
    assert!(h.feed.fetches().await.iter().all(|(_, _, season)| *season >= 2));
}

#[tokio::test]
async fn test_discovery_starts_at_highest_tracked_season() {
    let h = Harness::new();
    h.metadata.add_series("Dexter", 3).await;
    h.publish("Dexter", 2, 1, "Two").await;

    let ctx = h.context(vec![h.show("dexter", h.entry("Dexter"))]);
    run_discovery_pass(&ctx).await;
    assert!(h.store.find("dexter", 2, 1).unwrap().is_some());

    let before = h.feed.fetches().await.len();
    run_discovery_pass(&ctx).await;
    let seasons: Vec<u32> = h.feed.fetches().await[before..]
        .iter()
        .map(|(_, _, season)| *season)
        .collect();
    assert_eq!(seasons, vec![2, 3]);
}

#[tokio::test]
async fn test_duplicate_submission_resumes_existing_transfer() {
    let h = Harness::new();
    h.metadata.add_series("Dexter", 1).await;
    let hash = h.publish("Dexter", 1, 1, "Dexter").await;

    // The daemon already has the transfer, paused.
    let bytes = fixtures::single_file_torrent(&release_name("Dexter", 1, 1, "mkv"), 4096);
    h.client
        .add_torrent(AddTorrentRequest::torrent_file(bytes).with_paused(true))
        .await
        .unwrap();

    let ctx = h.context(vec![h.show("dexter", h.entry("Dexter"))]);
    let report = run_discovery_pass(&ctx).await;

    assert_eq!(report.submitted_count(), 1);
    assert!(report.shows[0].submitted[0].resumed_duplicate);
    assert_eq!(h.client.resumed().await, vec![hash.clone()]);
    assert_eq!(h.client.torrent_count().await, 1);

    let records = h.store.list(&EpisodeFilter::new()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].transfer_handle.as_deref(), Some(hash.as_str()));
}

#[tokio::test]
async fn test_duplicate_without_reported_hash_uses_payload_hash() {
    let h = Harness::new();
    h.metadata.add_series("Dexter", 1).await;
    let hash = h.publish("Dexter", 1, 1, "Dexter").await;
    h.client.set_report_duplicate_hash(false).await;

    let bytes = fixtures::single_file_torrent(&release_name("Dexter", 1, 1, "mkv"), 4096);
    h.client
        .add_torrent(AddTorrentRequest::torrent_file(bytes))
        .await
        .unwrap();

    let ctx = h.context(vec![h.show("dexter", h.entry("Dexter"))]);
    run_discovery_pass(&ctx).await;

    let record = h.store.find("dexter", 1, 1).unwrap().expect("record");
    assert_eq!(record.transfer_handle.as_deref(), Some(hash.as_str()));
}

#[tokio::test]
async fn test_bad_items_are_skipped_not_fatal() {
    let h = Harness::new();
    h.metadata.add_series("Dexter", 1).await;

    // No episode number.
    h.publish_payload(
        "Dexter",
        1,
        90,
        "Show Name: Dexter; Season: 1",
        fixtures::single_file_torrent("broken.mkv", 10),
    )
    .await;
    // Payload that is not a torrent.
    h.publish_payload(
        "Dexter",
        1,
        2,
        &fixtures::summary("Dexter", 1, 2, "Crocodile"),
        b"<html>gone</html>".to_vec(),
    )
    .await;
    // Excluded extension.
    h.publish_payload(
        "Dexter",
        1,
        3,
        &fixtures::summary("Dexter", 1, 3, "Popping Cherry"),
        fixtures::single_file_torrent(&release_name("Dexter", 1, 3, "avi"), 4096),
    )
    .await;
    h.publish("Dexter", 1, 4, "Let's Give the Boy a Hand").await;

    let mut entry = h.entry("Dexter");
    entry.exclude_extensions = Some(vec![".AVI".to_string()]);
    entry.max_concurrent = Some(5);
    let ctx = h.context(vec![h.show("dexter", entry)]);

    let report = run_discovery_pass(&ctx).await;
    let show = &report.shows[0];
    assert!(show.error.is_none());
    assert_eq!(show.skipped.malformed, 1);
    assert_eq!(show.skipped.payload, 1);
    assert_eq!(show.skipped.excluded_extension, 1);
    assert_eq!(show.submitted.len(), 1);
    assert_eq!(show.submitted[0].episode, 4);
}

#[tokio::test]
async fn test_missing_title_is_looked_up() {
    let h = Harness::new();
    h.metadata.add_series("Dexter", 1).await;
    h.metadata.set_title("Dexter", 1, 2, "Crocodile").await;
    h.publish("Dexter", 1, 2, "N/A").await;

    let ctx = h.context(vec![h.show("dexter", h.entry("Dexter"))]);
    run_discovery_pass(&ctx).await;

    let record = h.store.find("dexter", 1, 2).unwrap().expect("record");
    assert_eq!(record.title, "Crocodile");
}

#[tokio::test]
async fn test_lookup_failure_only_affects_that_show() {
    let h = Harness::new();
    h.metadata.add_series("Dexter", 1).await;
    h.publish("Dexter", 1, 1, "Dexter").await;
    h.publish("Unknown Show", 1, 1, "Pilot").await;

    let ctx = h.context(vec![
        h.show("aaa_unknown", h.entry("Unknown Show")),
        h.show("dexter", h.entry("Dexter")),
    ]);
    let report = run_discovery_pass(&ctx).await;

    assert!(report.aborted.is_none());
    assert_eq!(report.error_count(), 1);
    let unknown = report.shows.iter().find(|s| s.show == "aaa_unknown").unwrap();
    assert!(unknown.error.as_deref().unwrap().contains("Unknown Show"));
    assert!(h.store.find("dexter", 1, 1).unwrap().is_some());
}

#[tokio::test]
async fn test_feed_failure_only_affects_that_show() {
    let h = Harness::new();
    h.metadata.add_series("Dexter", 1).await;
    h.metadata.add_series("Fringe", 1).await;
    h.publish("Dexter", 1, 1, "Dexter").await;
    h.publish("Fringe", 1, 1, "Pilot").await;
    h.feed.set_failing("Dexter", true).await;

    let ctx = h.context(vec![
        h.show("dexter", h.entry("Dexter")),
        h.show("fringe", h.entry("Fringe")),
    ]);
    let report = run_discovery_pass(&ctx).await;

    assert_eq!(report.error_count(), 1);
    assert!(h.store.find("dexter", 1, 1).unwrap().is_none());
    assert!(h.store.find("fringe", 1, 1).unwrap().is_some());
}

#[tokio::test]
async fn test_unreachable_daemon_aborts_pass() {
    let h = Harness::new();
    h.metadata.add_series("Dexter", 1).await;
    h.metadata.add_series("Fringe", 1).await;
    h.publish("Dexter", 1, 1, "Dexter").await;
    h.publish("Fringe", 1, 1, "Pilot").await;
    h.client
        .set_next_error(TorrentClientError::ConnectionFailed("refused".into()))
        .await;

    let ctx = h.context(vec![
        h.show("dexter", h.entry("Dexter")),
        h.show("fringe", h.entry("Fringe")),
    ]);
    let report = run_discovery_pass(&ctx).await;

    assert!(report.aborted.is_some());
    assert_eq!(report.shows.len(), 1);
    assert_eq!(report.submitted_count(), 0);
    assert!(h.store.list(&EpisodeFilter::new()).unwrap().is_empty());

    // Next tick recovers.
    let report = run_discovery_pass(&ctx).await;
    assert!(report.aborted.is_none());
    assert_eq!(report.submitted_count(), 2);
}

#[tokio::test]
async fn test_invalid_show_is_reported_every_pass() {
    let h = Harness::new();
    h.metadata.add_series("Dexter", 1).await;
    h.publish("Dexter", 1, 1, "Dexter").await;

    let config = load_config_from_str(&format!(
        r#"
[shows.broken]
name = "Broken"

[shows.dexter]
name = "Dexter"
destination = "{}/{{show_name}}/{{season}}x{{episode:02}}"
"#,
        h.library.display()
    ))
    .unwrap();
    let ctx = h.context_with_registry(ShowRegistry::from_config(&config));

    for _ in 0..2 {
        let report = run_discovery_pass(&ctx).await;
        let broken = report.shows.iter().find(|s| s.show == "broken").unwrap();
        assert_eq!(broken.error.as_deref(), Some("no destination configured"));
    }
    assert!(h.store.find("dexter", 1, 1).unwrap().is_some());
}

#[tokio::test]
async fn test_discover_single_show() {
    let h = Harness::new();
    h.metadata.add_series("Dexter", 1).await;
    h.publish("Dexter", 1, 1, "Dexter").await;

    let show = h.show("dexter", h.entry("Dexter"));
    let ctx = h.context(vec![show.clone()]);
    let mut outcome = ShowDiscovery::new("dexter");
    discover_show(&ctx, &show, &mut outcome).await.unwrap();

    assert_eq!(outcome.submitted.len(), 1);
    assert!(!outcome.capped);
}
