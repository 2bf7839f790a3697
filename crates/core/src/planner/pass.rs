//! Discovery: find missing episodes of each show and submit them.

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::ShowConfig;
use crate::feed::FeedEntry;
use crate::identity::{parse_summary, EpisodeInfo, EpisodeOrdinal, FeedOrder};
use crate::metadata::{LookupError, ShowHandle};
use crate::metrics;
use crate::orchestrator::AcquisitionContext;
use crate::payload::decode_torrent;
use crate::store::{EpisodeFilter, EpisodeStatus, NewEpisode, StoreError};
use crate::torrent_client::{AddTorrentRequest, TorrentClientError};

use super::types::{
    DiscoveryReport, PlannerError, ShowDiscovery, SkipReason, SubmittedEpisode,
};

/// A parsed feed item with its position in the merged sequence.
#[derive(Debug, Clone)]
struct Candidate {
    order: FeedOrder,
    info: EpisodeInfo,
    entry: FeedEntry,
}

/// Result of trying one candidate.
enum Attempt {
    Submitted(SubmittedEpisode),
    Skipped(SkipReason),
}

/// Run discovery for every configured show.
///
/// Show-level failures are recorded in the report and do not stop other
/// shows. An unreachable torrent client stops the pass; the report's
/// `aborted` field says why.
pub async fn run_discovery_pass(ctx: &AcquisitionContext) -> DiscoveryReport {
    let started_at = Utc::now();
    let mut shows = Vec::new();
    let mut aborted = None;

    for invalid in ctx.shows.invalid() {
        error!(show = %invalid.key, reason = %invalid.reason, "Show configuration is invalid, skipping");
        metrics::PASS_ERRORS
            .with_label_values(&["discovery", "config"])
            .inc();
        let mut outcome = ShowDiscovery::new(&invalid.key);
        outcome.error = Some(invalid.reason.clone());
        shows.push(outcome);
    }

    for show in ctx.shows.shows() {
        let mut outcome = ShowDiscovery::new(&show.key);
        let result = discover_show(ctx, show, &mut outcome).await;

        if let Err(e) = result {
            metrics::PASS_ERRORS
                .with_label_values(&["discovery", e.kind()])
                .inc();
            outcome.error = Some(e.to_string());

            if e.is_pass_fatal() {
                warn!(show = %show.key, error = %e, "Torrent client unavailable, ending discovery pass");
                aborted = Some(e.to_string());
                shows.push(outcome);
                break;
            }
            match &e {
                PlannerError::DuplicateTransfer { .. } | PlannerError::Config(_) => {
                    error!(show = %show.key, error = %e, "Discovery failed for show")
                }
                _ => warn!(show = %show.key, error = %e, "Discovery failed for show"),
            }
        }
        shows.push(outcome);
    }

    let report = DiscoveryReport {
        started_at,
        finished_at: Utc::now(),
        shows,
        aborted,
    };
    info!(
        submitted = report.submitted_count(),
        errors = report.error_count(),
        aborted = report.aborted.is_some(),
        "Discovery pass finished"
    );
    report
}

/// Run discovery for a single show, recording progress in `outcome`.
///
/// Holds the show's lock for the whole check-and-commit sequence.
pub async fn discover_show(
    ctx: &AcquisitionContext,
    show: &ShowConfig,
    outcome: &mut ShowDiscovery,
) -> Result<(), PlannerError> {
    let _guard = ctx.lock_show(&show.key).await;

    let mut incomplete = ctx.store.count(
        &EpisodeFilter::new()
            .with_show(&show.key)
            .with_status(EpisodeStatus::Incomplete),
    )? as usize;
    if incomplete >= show.max_concurrent {
        debug!(show = %show.key, incomplete, limit = show.max_concurrent, "Concurrency limit reached");
        outcome.capped = true;
        return Ok(());
    }

    let handle = ctx.metadata.resolve(&show.name, &show.language).await?;
    let season_count = ctx.metadata.season_count(&handle).await?;
    if season_count == 0 {
        return Err(LookupError::NoSeasons(show.name.clone()).into());
    }

    let first_season = ctx
        .store
        .max_season(&show.key)?
        .unwrap_or(show.start_season)
        .max(show.start_season);

    let candidates = collect_candidates(ctx, show, first_season, season_count, outcome).await?;
    debug!(
        show = %show.key,
        seasons = %format!("{}..={}", first_season, season_count),
        candidates = candidates.len(),
        "Feed merged"
    );

    let floor = show.floor();
    for candidate in candidates {
        if candidate.order.ordinal.is_below(floor) {
            skip(outcome, show, &candidate.info, SkipReason::BelowFloor);
            continue;
        }
        if ctx
            .store
            .find(&show.key, candidate.info.season, candidate.info.episode)?
            .is_some()
        {
            skip(outcome, show, &candidate.info, SkipReason::AlreadyTracked);
            continue;
        }
        if incomplete >= show.max_concurrent {
            debug!(show = %show.key, limit = show.max_concurrent, "Concurrency limit reached");
            outcome.capped = true;
            break;
        }

        match try_submit(ctx, show, &handle, candidate).await? {
            Attempt::Submitted(episode) => {
                incomplete += 1;
                outcome.submitted.push(episode);
            }
            Attempt::Skipped(reason) => {
                outcome.skipped.record(reason);
                metrics::ITEMS_SKIPPED
                    .with_label_values(&[reason.as_str()])
                    .inc();
            }
        }
    }

    Ok(())
}

/// Fetch each season page and merge them into one ordered sequence.
async fn collect_candidates(
    ctx: &AcquisitionContext,
    show: &ShowConfig,
    first_season: u32,
    last_season: u32,
    outcome: &mut ShowDiscovery,
) -> Result<Vec<Candidate>, PlannerError> {
    let mut candidates = Vec::new();

    for season in first_season..=last_season {
        let entries = ctx.feed.fetch(&show.name, &show.quality, season).await?;
        for (arrival_order, entry) in entries.into_iter().enumerate() {
            match parse_summary(&entry.summary) {
                Ok(info) => candidates.push(Candidate {
                    order: FeedOrder::new(
                        EpisodeOrdinal::new(info.season, info.episode),
                        arrival_order,
                    ),
                    info,
                    entry,
                }),
                Err(e) => {
                    debug!(show = %show.key, season, error = %e, "Skipping feed item");
                    outcome.skipped.record(SkipReason::Malformed);
                    metrics::ITEMS_SKIPPED
                        .with_label_values(&[SkipReason::Malformed.as_str()])
                        .inc();
                }
            }
        }
    }

    candidates.sort_by(|a, b| a.order.cmp(&b.order));
    Ok(candidates)
}

fn skip(outcome: &mut ShowDiscovery, show: &ShowConfig, info: &EpisodeInfo, reason: SkipReason) {
    debug!(
        show = %show.key,
        episode = %info.label(),
        reason = reason.as_str(),
        "Skipping episode"
    );
    outcome.skipped.record(reason);
    metrics::ITEMS_SKIPPED
        .with_label_values(&[reason.as_str()])
        .inc();
}

/// Fetch, inspect and submit one candidate, then record it.
async fn try_submit(
    ctx: &AcquisitionContext,
    show: &ShowConfig,
    handle: &ShowHandle,
    candidate: Candidate,
) -> Result<Attempt, PlannerError> {
    let Candidate { info, entry, .. } = candidate;

    let title = match info.title.clone() {
        Some(title) => title,
        None => match ctx
            .metadata
            .episode_title(handle, info.season, info.episode)
            .await
        {
            Ok(title) => title,
            Err(e) => {
                debug!(show = %show.key, episode = %info.label(), error = %e, "No episode title available");
                String::new()
            }
        },
    };

    let bytes = match ctx.payloads.fetch(&entry.link).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(show = %show.key, episode = %info.label(), url = %entry.link, error = %e, "Could not download payload");
            return Ok(Attempt::Skipped(SkipReason::Payload));
        }
    };
    let payload = match decode_torrent(&bytes) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(show = %show.key, episode = %info.label(), url = %entry.link, error = %e, "Could not decode payload");
            return Ok(Attempt::Skipped(SkipReason::Payload));
        }
    };

    let extension = payload.primary_extension();
    if show.is_excluded_extension(extension) {
        debug!(show = %show.key, episode = %info.label(), extension = %extension, "Excluded extension");
        return Ok(Attempt::Skipped(SkipReason::ExcludedExtension));
    }

    let request = AddTorrentRequest::torrent_file(bytes)
        .with_filename(format!("{}.torrent", payload.name));

    let (transfer_handle, resumed_duplicate) = match ctx.torrent_client.add_torrent(request).await {
        Ok(added) => (added.hash, false),
        Err(TorrentClientError::Duplicate { existing_hash }) => {
            let existing = existing_hash.unwrap_or_else(|| payload.info_hash.clone());
            resolve_duplicate(ctx, show, &info, &existing).await?;
            (existing, true)
        }
        Err(TorrentClientError::InvalidTorrent(reason)) => {
            warn!(show = %show.key, episode = %info.label(), reason = %reason, "Torrent client rejected payload");
            return Ok(Attempt::Skipped(SkipReason::Rejected));
        }
        Err(e) => return Err(e.into()),
    };

    let record = match ctx.store.create(NewEpisode {
        show_key: show.key.clone(),
        series_name: show.name.clone(),
        season: info.season,
        episode: info.episode,
        title: title.clone(),
        source_url: entry.link.clone(),
        transfer_handle: transfer_handle.clone(),
    }) {
        Ok(record) => record,
        Err(StoreError::AlreadyTracked { .. }) => {
            return Ok(Attempt::Skipped(SkipReason::AlreadyTracked))
        }
        Err(e) => return Err(e.into()),
    };

    metrics::EPISODES_SUBMITTED
        .with_label_values(&[if resumed_duplicate {
            "duplicate_resumed"
        } else {
            "added"
        }])
        .inc();
    info!(
        show = %show.key,
        episode = %info.label(),
        title = %title,
        handle = %transfer_handle,
        "Submitted episode"
    );

    Ok(Attempt::Submitted(SubmittedEpisode {
        id: record.id,
        season: record.season,
        episode: record.episode,
        title: record.title,
        handle: record.transfer_handle.unwrap_or(transfer_handle),
        resumed_duplicate,
    }))
}

/// Confirm the client knows the existing transfer and resume it.
async fn resolve_duplicate(
    ctx: &AcquisitionContext,
    show: &ShowConfig,
    info: &EpisodeInfo,
    handle: &str,
) -> Result<(), PlannerError> {
    debug!(show = %show.key, episode = %info.label(), handle = %handle, "Transfer already present, resuming it");

    let unresolved = |source: TorrentClientError| {
        if source.is_unavailable() {
            PlannerError::DaemonUnavailable(source)
        } else {
            PlannerError::DuplicateTransfer {
                handle: handle.to_string(),
                source,
            }
        }
    };

    ctx.torrent_client
        .get_torrent(handle)
        .await
        .map_err(unresolved)?;
    ctx.torrent_client
        .resume_torrent(handle)
        .await
        .map_err(unresolved)?;
    Ok(())
}
