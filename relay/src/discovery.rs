//! Waits for a new replay file to show up in a directory

use crate::config::DiscoveryConfig;
use crate::error::RelayError;
use crate::retry::poll_until;
use log::{info, warn};
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio_util::sync::CancellationToken;

/// Polls `config.dir` until a file with the configured extension and a
/// modification time after `since` exists, then returns the newest one after
/// the settle delay.
///
/// Files already there when the relay started are ignored, they belong to
/// finished matches. An unreadable directory is logged and polled again.
pub async fn wait_for_new_file(
    config: &DiscoveryConfig,
    since: SystemTime,
    cancel: &CancellationToken,
) -> Result<PathBuf, RelayError> {
    info!(
        "Waiting for a new .{} file in {}",
        config.extension,
        config.dir.display()
    );

    let found = poll_until(config.poll, cancel, |_| async move {
        match newest_since(&config.dir, &config.extension, since).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Error reading {}: {}", config.dir.display(), e);
                None
            }
        }
    })
    .await
    .map_err(|_| RelayError::DiscoveryCancelled {
        dir: config.dir.clone(),
    })?;

    info!(
        "Found new replay {}, starting in {:?}",
        found.display(),
        config.settle
    );
    tokio::select! {
        _ = cancel.cancelled() => {
            return Err(RelayError::DiscoveryCancelled { dir: config.dir.clone() });
        }
        _ = tokio::time::sleep(config.settle) => {}
    }

    Ok(found)
}

/// Newest regular file in `dir` with `extension`, modified after `since`.
pub async fn newest_since(
    dir: &Path,
    extension: &str,
    since: SystemTime,
) -> io::Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut newest: Option<(SystemTime, PathBuf)> = None;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension() != Some(OsStr::new(extension)) {
            continue;
        }

        // Entries can vanish between listing and stat.
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let Ok(modified) = metadata.modified() else {
            continue;
        };

        let is_newer = match &newest {
            Some((best, _)) => modified > *best,
            None => true,
        };
        if modified > since && is_newer {
            newest = Some((modified, path));
        }
    }

    Ok(newest.map(|(_, path)| path))
}
