//! Removing a finished transfer's artifacts.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::metrics;
use crate::orchestrator::AcquisitionContext;
use crate::placer::PlacerError;
use crate::store::EpisodeRecord;
use crate::torrent_client::{TorrentClientError, TorrentInfo};

use super::types::{MonitorError, MonitorReport};

/// Delete the transfer's files and directories, then drop it from the
/// torrent client. On success the record's pending cleanup is cleared; on
/// failure the next attempt is scheduled with backoff.
///
/// `info` is the transfer as last seen this pass, if any.
pub(super) async fn run_cleanup(
    ctx: &AcquisitionContext,
    record: &EpisodeRecord,
    info: Option<TorrentInfo>,
    now: DateTime<Utc>,
    report: &mut MonitorReport,
) -> Result<(), MonitorError> {
    let Some(handle) = record.transfer_handle.as_deref() else {
        return finish(ctx, record, report);
    };

    let info = match info {
        Some(info) => info,
        None => match ctx.torrent_client.get_torrent(handle).await {
            Ok(info) => info,
            Err(TorrentClientError::TorrentNotFound(_)) => {
                debug!(show = %record.show_key, handle = %handle, "Transfer already gone, cleanup done");
                return finish(ctx, record, report);
            }
            Err(e) => return Err(e.into()),
        },
    };

    let Some(download_dir) = ctx.download_dir_for(info.save_path.as_deref()) else {
        return Err(schedule_retry(ctx, record, now, PlacerError::NoDownloadDir.into()));
    };

    let files: Vec<String> = info.files.iter().map(|f| f.path.clone()).collect();
    match ctx.placer.cleanup_transfer(download_dir, &files).await {
        Ok(summary) => debug!(
            show = %record.show_key,
            handle = %handle,
            files = summary.files_removed,
            directories = summary.directories_removed,
            skipped = summary.skipped_unsafe,
            "Removed transfer files"
        ),
        Err(e) => return Err(schedule_retry(ctx, record, now, e.into())),
    }

    match ctx.torrent_client.remove_torrent(handle, false).await {
        Ok(()) | Err(TorrentClientError::TorrentNotFound(_)) => {}
        Err(e) if e.is_unavailable() => {
            return Err(schedule_retry(
                ctx,
                record,
                now,
                MonitorError::DaemonUnavailable(e),
            ))
        }
        Err(e) => {
            return Err(schedule_retry(
                ctx,
                record,
                now,
                MonitorError::CleanupFailed {
                    handle: handle.to_string(),
                    source: e,
                },
            ))
        }
    }

    finish(ctx, record, report)
}

fn finish(
    ctx: &AcquisitionContext,
    record: &EpisodeRecord,
    report: &mut MonitorReport,
) -> Result<(), MonitorError> {
    ctx.store.clear_cleanup(&record.id)?;
    metrics::TRANSFERS_CLEANED.inc();
    report.cleaned += 1;
    info!(
        show = %record.show_key,
        season = record.season,
        episode = record.episode,
        handle = record.transfer_handle.as_deref().unwrap_or(""),
        "Transfer cleaned up"
    );
    Ok(())
}

/// Record the failed attempt and when to try again; returns `error`.
fn schedule_retry(
    ctx: &AcquisitionContext,
    record: &EpisodeRecord,
    now: DateTime<Utc>,
    error: MonitorError,
) -> MonitorError {
    let attempt = record.cleanup_attempts + 1;
    let delay = ctx.cleanup_retry.delay(attempt);
    let retry_at = now + chrono::Duration::seconds(delay.as_secs().min(i32::MAX as u64) as i64);

    metrics::CLEANUP_FAILURES.inc();
    warn!(
        show = %record.show_key,
        season = record.season,
        episode = record.episode,
        handle = record.transfer_handle.as_deref().unwrap_or(""),
        attempt,
        retry_at = %retry_at,
        error = %error,
        "Cleanup failed, will retry"
    );

    if let Err(e) = ctx
        .store
        .record_cleanup_failure(&record.id, &error.to_string(), retry_at)
    {
        warn!(id = %record.id, error = %e, "Failed to record cleanup failure");
    }
    error
}
