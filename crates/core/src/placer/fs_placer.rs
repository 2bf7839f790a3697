//! File system placer implementation.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::debug;

use super::error::PlacerError;

const DEFAULT_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// How the primary file reaches its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementMode {
    /// The transfer no longer needs the file: rename, copying across devices.
    Move,
    /// The transfer still seeds from the file: leave the source in place.
    Copy,
}

/// Outcome of a single placement.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedFile {
    pub destination: PathBuf,
    pub size_bytes: u64,
    pub mode: PlacementMode,
    /// The source was already gone and the destination present, i.e. an
    /// earlier pass moved the file but did not record it.
    pub already_placed: bool,
}

/// What a transfer cleanup removed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupSummary {
    pub files_removed: usize,
    pub directories_removed: usize,
    /// Entries skipped because they would resolve outside the download directory.
    pub skipped_unsafe: usize,
}

/// File system based placer implementation.
pub struct FsPlacer {
    buffer_size: usize,
}

impl Default for FsPlacer {
    fn default() -> Self {
        Self::new()
    }
}

impl FsPlacer {
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Uses a custom copy buffer size.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(4096);
        self
    }

    /// Place `source` at `destination`, creating parent directories.
    ///
    /// An existing destination is overwritten, so re-running a placement
    /// interrupted after the copy is harmless.
    pub async fn place(
        &self,
        source: &Path,
        destination: &Path,
        mode: PlacementMode,
    ) -> Result<PlacedFile, PlacerError> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PlacerError::DirectoryCreationFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        if !source.exists() {
            if let Ok(meta) = fs::metadata(destination).await {
                debug!(
                    source = %source.display(),
                    destination = %destination.display(),
                    "Source already moved to destination"
                );
                return Ok(PlacedFile {
                    destination: destination.to_path_buf(),
                    size_bytes: meta.len(),
                    mode,
                    already_placed: true,
                });
            }
            return Err(PlacerError::SourceNotFound {
                path: source.to_path_buf(),
            });
        }

        let size_bytes = match mode {
            PlacementMode::Move => {
                if Self::try_atomic_move(source, destination)
                    .await
                    .map_err(|e| PlacerError::MoveFailed {
                        source: source.to_path_buf(),
                        destination: destination.to_path_buf(),
                        error: e,
                    })?
                {
                    fs::metadata(destination).await.map(|m| m.len()).unwrap_or(0)
                } else {
                    let size = self.copy_file(source, destination).await?;
                    fs::remove_file(source)
                        .await
                        .map_err(|e| PlacerError::CleanupFailed {
                            path: source.to_path_buf(),
                            source: e,
                        })?;
                    size
                }
            }
            PlacementMode::Copy => self.copy_file(source, destination).await?,
        };

        Ok(PlacedFile {
            destination: destination.to_path_buf(),
            size_bytes,
            mode,
            already_placed: false,
        })
    }

    /// Remove every file a transfer lists, then the directories it created.
    ///
    /// `files` are the paths the daemon reports, relative to `download_dir`.
    /// Absolute entries and entries with `..` components are skipped. Entries
    /// that carry the download directory as a prefix have it stripped. Paths
    /// that are already gone are not errors.
    pub async fn cleanup_transfer(
        &self,
        download_dir: &Path,
        files: &[String],
    ) -> Result<CleanupSummary, PlacerError> {
        let mut summary = CleanupSummary::default();
        let mut top_dirs = BTreeSet::new();
        let mut relative_files = Vec::with_capacity(files.len());

        for entry in files {
            match safe_relative(download_dir, entry) {
                Some(rel) => {
                    let mut components = rel.components();
                    let first = components.next();
                    if components.next().is_some() {
                        if let Some(Component::Normal(dir)) = first {
                            top_dirs.insert(PathBuf::from(dir));
                        }
                    }
                    relative_files.push(rel);
                }
                None => {
                    debug!(entry = %entry, "Skipping unsafe transfer path");
                    summary.skipped_unsafe += 1;
                }
            }
        }

        for rel in relative_files {
            let path = download_dir.join(&rel);
            match fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), "Deleted");
                    summary.files_removed += 1;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(PlacerError::CleanupFailed { path, source: e }),
            }
        }

        for dir in top_dirs {
            let path = download_dir.join(&dir);
            match fs::remove_dir_all(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), "Deleted directory");
                    summary.directories_removed += 1;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(PlacerError::CleanupFailed { path, source: e }),
            }
        }

        Ok(summary)
    }

    /// Attempts to move a file atomically (rename).
    async fn try_atomic_move(source: &Path, destination: &Path) -> Result<bool, std::io::Error> {
        match fs::rename(source, destination).await {
            Ok(()) => Ok(true),
            Err(e) => {
                // EXDEV is 18 on Linux
                if e.kind() == ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) {
                    Ok(false)
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn copy_file(&self, source: &Path, destination: &Path) -> Result<u64, PlacerError> {
        let source_file = File::open(source).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                PlacerError::SourceNotFound {
                    path: source.to_path_buf(),
                }
            } else {
                PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
            }
        })?;

        let dest_file = File::create(destination).await.map_err(|e| {
            PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
        })?;

        let mut reader = BufReader::with_capacity(self.buffer_size, source_file);
        let mut writer = BufWriter::with_capacity(self.buffer_size, dest_file);
        let mut buffer = vec![0u8; self.buffer_size];
        let mut total_bytes = 0u64;

        loop {
            let bytes_read = reader.read(&mut buffer).await.map_err(|e| {
                PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
            })?;
            if bytes_read == 0 {
                break;
            }
            writer.write_all(&buffer[..bytes_read]).await.map_err(|e| {
                PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
            })?;
            total_bytes += bytes_read as u64;
        }

        writer.flush().await.map_err(|e| {
            PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
        })?;

        Ok(total_bytes)
    }
}

/// Resolve a daemon-reported path to one strictly inside the download dir.
fn safe_relative(download_dir: &Path, entry: &str) -> Option<PathBuf> {
    let dir = download_dir.to_string_lossy();
    let dir = dir.trim_end_matches('/');
    let stripped = match entry.strip_prefix(dir) {
        Some(rest) if !dir.is_empty() && (rest.is_empty() || rest.starts_with('/')) => {
            rest.trim_start_matches('/')
        }
        _ => entry,
    };

    let path = Path::new(stripped);
    if stripped.is_empty() || path.is_absolute() {
        return None;
    }
    if path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }
    Some(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_copy_keeps_source() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("downloads/ep.mkv");
        let dest = temp.path().join("tv/Show/Season 1/ep.mkv");
        fs::create_dir_all(source.parent().unwrap()).await.unwrap();
        fs::write(&source, b"episode").await.unwrap();

        let placed = FsPlacer::new()
            .place(&source, &dest, PlacementMode::Copy)
            .await
            .unwrap();

        assert_eq!(placed.size_bytes, 7);
        assert!(!placed.already_placed);
        assert!(source.exists());
        assert_eq!(fs::read(&dest).await.unwrap(), b"episode");
    }

    #[tokio::test]
    async fn test_move_removes_source() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("ep.mkv");
        let dest = temp.path().join("out/ep.mkv");
        fs::write(&source, b"episode").await.unwrap();

        let placed = FsPlacer::new()
            .place(&source, &dest, PlacementMode::Move)
            .await
            .unwrap();

        assert_eq!(placed.mode, PlacementMode::Move);
        assert!(!source.exists());
        assert!(dest.exists());
    }

    #[tokio::test]
    async fn test_place_overwrites_destination() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("ep.mkv");
        let dest = temp.path().join("ep-out.mkv");
        fs::write(&source, b"new").await.unwrap();
        fs::write(&dest, b"old partial copy").await.unwrap();

        FsPlacer::new()
            .place(&source, &dest, PlacementMode::Copy)
            .await
            .unwrap();
        assert_eq!(fs::read(&dest).await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_place_after_interrupted_move() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("gone.mkv");
        let dest = temp.path().join("out/gone.mkv");
        fs::create_dir_all(dest.parent().unwrap()).await.unwrap();
        fs::write(&dest, b"data").await.unwrap();

        let placed = FsPlacer::new()
            .place(&source, &dest, PlacementMode::Move)
            .await
            .unwrap();
        assert!(placed.already_placed);
    }

    #[tokio::test]
    async fn test_place_missing_source() {
        let temp = TempDir::new().unwrap();
        let result = FsPlacer::new()
            .place(
                &temp.path().join("missing.mkv"),
                &temp.path().join("out.mkv"),
                PlacementMode::Copy,
            )
            .await;
        assert!(matches!(result, Err(PlacerError::SourceNotFound { .. })));
    }

    #[tokio::test]
    async fn test_cleanup_removes_files_and_directories() {
        let temp = TempDir::new().unwrap();
        let base = temp.path();
        fs::create_dir_all(base.join("Show.S01E01/Subs")).await.unwrap();
        fs::write(base.join("Show.S01E01/ep.mkv"), b"x").await.unwrap();
        fs::write(base.join("Show.S01E01/Subs/en.srt"), b"x").await.unwrap();
        fs::write(base.join("loose.nfo"), b"x").await.unwrap();
        fs::write(base.join("unrelated.txt"), b"keep").await.unwrap();

        let files = vec![
            "Show.S01E01/ep.mkv".to_string(),
            "Show.S01E01/Subs/en.srt".to_string(),
            "loose.nfo".to_string(),
        ];
        let summary = FsPlacer::new().cleanup_transfer(base, &files).await.unwrap();

        assert_eq!(summary.files_removed, 3);
        assert_eq!(summary.directories_removed, 1);
        assert!(!base.join("Show.S01E01").exists());
        assert!(!base.join("loose.nfo").exists());
        assert!(base.join("unrelated.txt").exists());
    }

    #[tokio::test]
    async fn test_cleanup_ignores_missing_paths() {
        let temp = TempDir::new().unwrap();
        let files = vec!["already/gone.mkv".to_string(), "gone.nfo".to_string()];
        let summary = FsPlacer::new()
            .cleanup_transfer(temp.path(), &files)
            .await
            .unwrap();
        assert_eq!(summary.files_removed, 0);
        assert_eq!(summary.directories_removed, 0);
    }

    #[tokio::test]
    async fn test_cleanup_skips_unsafe_paths() {
        let temp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let victim = outside.path().join("victim.txt");
        fs::write(&victim, b"keep").await.unwrap();

        let files = vec![
            victim.to_string_lossy().to_string(),
            "../escape.txt".to_string(),
            "ok/../../escape.txt".to_string(),
        ];
        let summary = FsPlacer::new()
            .cleanup_transfer(temp.path(), &files)
            .await
            .unwrap();

        assert_eq!(summary.skipped_unsafe, 3);
        assert!(victim.exists());
    }

    #[tokio::test]
    async fn test_cleanup_strips_download_dir_prefix() {
        let temp = TempDir::new().unwrap();
        let base = temp.path();
        fs::write(base.join("ep.mkv"), b"x").await.unwrap();

        let prefixed = base.join("ep.mkv").to_string_lossy().to_string();
        let summary = FsPlacer::new()
            .cleanup_transfer(base, &[prefixed])
            .await
            .unwrap();

        assert_eq!(summary.files_removed, 1);
        assert!(!base.join("ep.mkv").exists());
    }

    #[test]
    fn test_safe_relative() {
        let dir = Path::new("/downloads");
        assert_eq!(
            safe_relative(dir, "Show/ep.mkv"),
            Some(PathBuf::from("Show/ep.mkv"))
        );
        assert_eq!(
            safe_relative(dir, "/downloads/Show/ep.mkv"),
            Some(PathBuf::from("Show/ep.mkv"))
        );
        assert_eq!(safe_relative(dir, "/etc/passwd"), None);
        assert_eq!(safe_relative(dir, "/downloads-other/x"), None);
        assert_eq!(safe_relative(dir, "../x"), None);
        assert_eq!(safe_relative(dir, ""), None);
    }
}
