//! Monitor pass: poll each tracked transfer and advance its record.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, ShowConfig};
use crate::metrics;
use crate::orchestrator::AcquisitionContext;
use crate::placer::{extension_of, EpisodeFields, PlacementMode, PlacerError};
use crate::store::{EpisodeRecord, EpisodeStatus};
use crate::torrent_client::{TorrentClientError, TorrentInfo};

use super::cleanup::run_cleanup;
use super::types::{MonitorError, MonitorReport, RecordFailure};

/// Poll every active record once.
///
/// Record-level failures are collected in the report. An unreachable torrent
/// client or a failed transfer removal stops the pass.
pub async fn run_monitor_pass(ctx: &AcquisitionContext) -> MonitorReport {
    let now = Utc::now();
    let mut report = MonitorReport::new(now);

    let records = match ctx.store.active() {
        Ok(records) => records,
        Err(e) => {
            error!(error = %e, "Failed to load active episodes");
            metrics::PASS_ERRORS
                .with_label_values(&["monitor", "store"])
                .inc();
            report.aborted = Some(e.to_string());
            report.finished_at = Utc::now();
            return report;
        }
    };

    for record in records {
        if record.status == EpisodeStatus::Complete && !record.cleanup_due(now) {
            continue;
        }
        report.checked += 1;

        let failure = RecordFailure {
            id: record.id.clone(),
            show: record.show_key.clone(),
            season: record.season,
            episode: record.episode,
            error: String::new(),
        };

        if let Err(e) = check_record(ctx, record, now, &mut report).await {
            metrics::PASS_ERRORS
                .with_label_values(&["monitor", e.kind()])
                .inc();
            report.errors.push(RecordFailure {
                error: e.to_string(),
                ..failure.clone()
            });

            if e.is_pass_fatal() {
                if matches!(e, MonitorError::DaemonUnavailable(_)) {
                    warn!(error = %e, "Torrent client unavailable, ending monitor pass");
                } else {
                    error!(show = %failure.show, season = failure.season, episode = failure.episode, error = %e, "Transfer removal failed, ending monitor pass");
                }
                report.aborted = Some(e.to_string());
                break;
            }

            match &e {
                MonitorError::Config(_) => {
                    error!(show = %failure.show, season = failure.season, episode = failure.episode, error = %e, "Cannot advance episode")
                }
                _ => {
                    warn!(show = %failure.show, season = failure.season, episode = failure.episode, error = %e, "Cannot advance episode")
                }
            }
        }
    }

    report.finished_at = Utc::now();
    info!(
        checked = report.checked,
        placed = report.placed,
        completed = report.completed,
        cleaned = report.cleaned,
        vanished = report.vanished,
        resumed = report.resumed,
        errors = report.errors.len(),
        aborted = report.aborted.is_some(),
        "Monitor pass finished"
    );
    report
}

/// Drive one record as far as the transfer's current state allows.
pub async fn check_record(
    ctx: &AcquisitionContext,
    record: EpisodeRecord,
    now: DateTime<Utc>,
    report: &mut MonitorReport,
) -> Result<(), MonitorError> {
    match record.status {
        EpisodeStatus::Incomplete => check_incomplete(ctx, record, now, report).await,
        EpisodeStatus::Seeding => check_seeding(ctx, record, now, report).await,
        EpisodeStatus::Complete => run_cleanup(ctx, &record, None, now, report).await,
    }
}

async fn check_incomplete(
    ctx: &AcquisitionContext,
    record: EpisodeRecord,
    now: DateTime<Utc>,
    report: &mut MonitorReport,
) -> Result<(), MonitorError> {
    let Some((handle, info)) = fetch_transfer(ctx, &record, report).await? else {
        return Ok(());
    };
    let show = show_for(ctx, &record)?;

    if info.is_complete() {
        place_episode(ctx, &record, show, &info, report).await?;
        ctx.torrent_client.resume_torrent(&handle).await?;
        let record = ctx.store.advance(&record.id, EpisodeStatus::Seeding)?;
        info!(
            show = %record.show_key,
            season = record.season,
            episode = record.episode,
            handle = %handle,
            "Episode downloaded, seeding"
        );
        return seeding_step(ctx, record, show, &handle, info, now, report).await;
    }

    if info.state.is_stopped() && !show.keep_paused {
        ctx.torrent_client.resume_torrent(&handle).await?;
        report.resumed += 1;
        info!(
            show = %record.show_key,
            season = record.season,
            episode = record.episode,
            handle = %handle,
            "Resumed paused transfer"
        );
    } else {
        debug!(
            show = %record.show_key,
            season = record.season,
            episode = record.episode,
            handle = %handle,
            progress = info.progress,
            state = info.state.as_str(),
            "Still downloading"
        );
    }
    Ok(())
}

async fn check_seeding(
    ctx: &AcquisitionContext,
    record: EpisodeRecord,
    now: DateTime<Utc>,
    report: &mut MonitorReport,
) -> Result<(), MonitorError> {
    let Some((handle, info)) = fetch_transfer(ctx, &record, report).await? else {
        return Ok(());
    };
    let show = show_for(ctx, &record)?;
    seeding_step(ctx, record, show, &handle, info, now, report).await
}

/// Stop sharing once the seed target is met, then clean up.
async fn seeding_step(
    ctx: &AcquisitionContext,
    record: EpisodeRecord,
    show: &ShowConfig,
    handle: &str,
    info: TorrentInfo,
    now: DateTime<Utc>,
    report: &mut MonitorReport,
) -> Result<(), MonitorError> {
    if info.ratio < show.seed_ratio {
        debug!(
            show = %record.show_key,
            season = record.season,
            episode = record.episode,
            handle = %handle,
            ratio = info.ratio,
            target = show.seed_ratio,
            "Seeding"
        );
        return Ok(());
    }

    ctx.torrent_client.pause_torrent(handle).await?;
    let record = ctx.store.advance(&record.id, EpisodeStatus::Complete)?;
    metrics::TRANSFERS_COMPLETED.inc();
    report.completed += 1;
    info!(
        show = %record.show_key,
        season = record.season,
        episode = record.episode,
        handle = %handle,
        ratio = info.ratio,
        "Seed target reached, episode complete"
    );

    run_cleanup(ctx, &record, Some(info), now, report).await
}

/// Query the record's transfer. A transfer the client no longer knows means
/// the record is forgotten; `None` is returned in that case.
async fn fetch_transfer(
    ctx: &AcquisitionContext,
    record: &EpisodeRecord,
    report: &mut MonitorReport,
) -> Result<Option<(String, TorrentInfo)>, MonitorError> {
    let Some(handle) = record.transfer_handle.clone() else {
        forget(ctx, record, report)?;
        return Ok(None);
    };

    match ctx.torrent_client.get_torrent(&handle).await {
        Ok(info) => Ok(Some((handle, info))),
        Err(TorrentClientError::TorrentNotFound(_)) => {
            forget(ctx, record, report)?;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn forget(
    ctx: &AcquisitionContext,
    record: &EpisodeRecord,
    report: &mut MonitorReport,
) -> Result<(), MonitorError> {
    ctx.store.delete(&record.id)?;
    metrics::TRANSFERS_VANISHED.inc();
    report.vanished += 1;
    info!(
        show = %record.show_key,
        season = record.season,
        episode = record.episode,
        handle = record.transfer_handle.as_deref().unwrap_or(""),
        "Transfer no longer exists, forgetting episode"
    );
    Ok(())
}

fn show_for<'a>(
    ctx: &'a AcquisitionContext,
    record: &EpisodeRecord,
) -> Result<&'a ShowConfig, MonitorError> {
    ctx.shows.get(&record.show_key).ok_or_else(|| {
        ctx.shows
            .error_for(&record.show_key)
            .unwrap_or_else(|| ConfigError::InvalidShow {
                show: record.show_key.clone(),
                reason: "show is no longer configured".to_string(),
            })
            .into()
    })
}

/// Put the transfer's primary file at the show's destination.
///
/// Moves when the seed target is already met (the transfer will not need the
/// file), copies otherwise.
async fn place_episode(
    ctx: &AcquisitionContext,
    record: &EpisodeRecord,
    show: &ShowConfig,
    info: &TorrentInfo,
    report: &mut MonitorReport,
) -> Result<(), MonitorError> {
    let file = info
        .largest_file()
        .ok_or_else(|| MonitorError::NoFiles(info.hash.clone()))?;
    let download_dir = ctx
        .download_dir_for(info.save_path.as_deref())
        .ok_or(PlacerError::NoDownloadDir)?;

    let source = download_dir.join(&file.path);
    let destination = show.destination.render(
        &EpisodeFields {
            show_name: &record.series_name,
            season: record.season,
            episode: record.episode,
            title: &record.title,
        },
        extension_of(&file.path),
    );
    let mode = if info.ratio >= show.seed_ratio {
        PlacementMode::Move
    } else {
        PlacementMode::Copy
    };

    let placed = ctx.placer.place(&source, &destination, mode).await?;
    metrics::EPISODES_PLACED
        .with_label_values(&[match mode {
            PlacementMode::Move => "move",
            PlacementMode::Copy => "copy",
        }])
        .inc();
    report.placed += 1;
    info!(
        show = %record.show_key,
        season = record.season,
        episode = record.episode,
        handle = %info.hash,
        destination = %placed.destination.display(),
        mode = ?mode,
        bytes = placed.size_bytes,
        "Placed episode"
    );
    Ok(())
}
