//! Periodic patchlist refresh.
//!
//! Every mutation already regenerates the patchlist, so this task normally rewrites identical
//! bytes. It exists to repair the patchlist after a regeneration that failed or was skipped,
//! for example when the ledger was edited by hand.

use crate::service::PatchService;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Spawns the refresh loop on the current tokio runtime.
///
/// The first refresh happens one full interval after the call. Failures are logged and the loop
/// keeps running; abort the returned handle to stop it.
pub fn spawn_patchlist_refresh(service: PatchService) -> JoinHandle<()> {
    let period = service.config().refresh_interval();
    tracing::info!("patchlist refresh every {}s", period.as_secs());

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            interval.tick().await;
            refresh_once(&service).await;
        }
    })
}

/// Runs one regeneration on the blocking pool. Returns whether it succeeded.
pub async fn refresh_once(service: &PatchService) -> bool {
    let service = service.clone();
    match tokio::task::spawn_blocking(move || service.regenerate_patchlist()).await {
        Ok(Ok(entries)) => {
            tracing::debug!("scheduled patchlist refresh wrote {} entries", entries);
            true
        }
        Ok(Err(e)) => {
            tracing::error!("scheduled patchlist refresh failed: {}", e);
            false
        }
        Err(e) => {
            tracing::error!("scheduled patchlist refresh task failed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use patchlist_types::Folder;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn setup_service(root: &Path, interval: Duration) -> PatchService {
        let cfg = CoreConfig::new(
            root.join("uploads"),
            root.join("file_status.json"),
            root.join("patcher.txt"),
        )
        .unwrap()
        .with_refresh_interval(interval)
        .unwrap();
        PatchService::open(Arc::new(cfg)).unwrap()
    }

    #[tokio::test]
    async fn test_refresh_once_repairs_patchlist() {
        let temp = TempDir::new().unwrap();
        let service = setup_service(temp.path(), Duration::from_secs(300));
        service.upload("a.bin", Folder::Main, &b"hello"[..]).unwrap();
        let expected = service.read_patchlist().unwrap();
        fs::write(temp.path().join("patcher.txt"), "stale\n").unwrap();

        assert!(refresh_once(&service).await);

        assert_eq!(service.read_patchlist().unwrap(), expected);
    }

    #[tokio::test]
    async fn test_refresh_once_reports_failure() {
        let temp = TempDir::new().unwrap();
        let service = setup_service(temp.path(), Duration::from_secs(300));
        fs::write(temp.path().join("file_status.json"), "not json").unwrap();

        assert!(!refresh_once(&service).await);
    }

    #[tokio::test]
    async fn test_spawned_loop_keeps_running_after_failure() {
        let temp = TempDir::new().unwrap();
        let service = setup_service(temp.path(), Duration::from_millis(20));
        service.upload("a.bin", Folder::Pack, &b"hello"[..]).unwrap();
        let expected = service.read_patchlist().unwrap();

        let ledger_path = temp.path().join("file_status.json");
        let good_ledger = fs::read(&ledger_path).unwrap();
        fs::write(&ledger_path, "not json").unwrap();
        fs::remove_file(temp.path().join("patcher.txt")).unwrap();

        let handle = spawn_patchlist_refresh(service.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!temp.path().join("patcher.txt").exists());

        fs::write(&ledger_path, good_ledger).unwrap();
        let mut repaired = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if service.read_patchlist().ok().as_deref() == Some(expected.as_str()) {
                repaired = true;
                break;
            }
        }
        handle.abort();

        assert!(repaired, "scheduler did not regenerate the patchlist");
    }
}
