//! Auto-rollback watchdog for an unconfirmed deployment: restores the
//! pre-deploy backup if nobody confirms within the rollback window, or if an
//! optional health probe reports the deployment unhealthy.
//!
//! A `watch` channel stands in for a `threading.Event`-style cancellation
//! flag, the same shape `hr-ipv6::pd_client`/`ra` use for cooperative task
//! cancellation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use afo_nft::NftOps;
use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::backup::restore_backup;

/// Caller-supplied liveness check invoked once per watchdog tick. Returning
/// `false` (or the probe itself erroring) triggers the same rollback as a
/// timeout — this is the in-process equivalent of the `heartbeat_fn`
/// callback an RPC caller cannot hand across a socket boundary.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check(&self) -> bool;
}

pub type BoxedHealthProbe = Arc<dyn HealthProbe>;

const TICK: Duration = Duration::from_secs(1);

/// Handle to a running watchdog. Dropping this without calling [`confirm`]
/// leaves the watchdog running to its timeout — callers that want to
/// abandon monitoring without confirming should call [`confirm`] anyway so
/// the spawned task is joined promptly instead of outliving its caller.
///
/// [`confirm`]: Watchdog::confirm
pub struct Watchdog {
    confirm_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Spawns a watchdog that ticks once a second, rolling back to
/// `backup_path` if `rollback_timeout` elapses unconfirmed or `probe`
/// reports unhealthy.
pub fn spawn<N>(
    nft: N,
    backup_path: PathBuf,
    rollback_timeout: Duration,
    probe: Option<BoxedHealthProbe>,
) -> Watchdog
where
    N: NftOps + Clone + 'static,
{
    let (confirm_tx, mut confirm_rx) = watch::channel(false);

    tracing::debug!(
        backup = %backup_path.display(),
        deadline = %humantime::format_duration(rollback_timeout),
        "watchdog armed"
    );

    let handle = tokio::spawn(async move {
        let start = tokio::time::Instant::now();
        loop {
            tokio::select! {
                _ = tokio::time::sleep(TICK) => {}
                _ = confirm_rx.changed() => {
                    tracing::debug!(backup = %backup_path.display(), "deployment confirmed, watchdog standing down");
                    return;
                }
            }

            if start.elapsed() >= rollback_timeout {
                tracing::warn!(backup = %backup_path.display(), "deployment not confirmed in time, rolling back");
                if let Err(err) = restore_backup(&nft, &backup_path).await {
                    tracing::error!(%err, "watchdog auto-rollback failed");
                }
                return;
            }

            if let Some(probe) = &probe {
                if !probe.check().await {
                    tracing::warn!(backup = %backup_path.display(), "health probe reported unhealthy, rolling back");
                    if let Err(err) = restore_backup(&nft, &backup_path).await {
                        tracing::error!(%err, "watchdog auto-rollback failed");
                    }
                    return;
                }
            }
        }
    });

    Watchdog { confirm_tx, handle }
}

impl Watchdog {
    /// Signals the watchdog to stand down and waits up to two seconds for
    /// its task to finish.
    pub async fn confirm(self) -> bool {
        let signaled = self.confirm_tx.send(true).is_ok();
        let _ = tokio::time::timeout(Duration::from_secs(2), self.handle).await;
        signaled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afo_nft::MockNftOps;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct AlwaysHealthy;

    #[async_trait]
    impl HealthProbe for AlwaysHealthy {
        async fn check(&self) -> bool {
            true
        }
    }

    struct FlipsUnhealthyAfterFirstCheck(Arc<AtomicBool>);

    #[async_trait]
    impl HealthProbe for FlipsUnhealthyAfterFirstCheck {
        async fn check(&self) -> bool {
            !self.0.swap(true, Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn confirm_before_timeout_prevents_rollback() {
        let nft = MockNftOps::new("table inet filter { chain input { accept } }\n");
        let backup_dir = tempfile::tempdir().expect("tempdir");
        let backup_path = backup_dir.path().join("backup_r1_1.nft");
        tokio::fs::write(&backup_path, "table inet filter {}\n").await.expect("write backup");

        let watchdog = spawn(nft.clone(), backup_path, Duration::from_secs(10), None);
        watchdog.confirm().await;

        assert!(nft.current_ruleset().await.contains("chain input"));
    }

    #[tokio::test]
    async fn unconfirmed_watchdog_rolls_back_after_timeout() {
        let nft = MockNftOps::new("table inet filter { chain input { accept } }\n");
        let backup_dir = tempfile::tempdir().expect("tempdir");
        let backup_path = backup_dir.path().join("backup_r1_1.nft");
        tokio::fs::write(&backup_path, "table inet filter {}\n").await.expect("write backup");

        let watchdog = spawn(nft.clone(), backup_path, Duration::from_secs(1), None);
        tokio::time::sleep(Duration::from_millis(1300)).await;

        assert_eq!(nft.current_ruleset().await, "table inet filter {}\n");
        let _ = watchdog.confirm().await;
    }

    #[tokio::test]
    async fn healthy_probe_never_triggers_rollback() {
        let nft = MockNftOps::new("table inet filter { chain input { accept } }\n");
        let backup_dir = tempfile::tempdir().expect("tempdir");
        let backup_path = backup_dir.path().join("backup_r1_1.nft");
        tokio::fs::write(&backup_path, "table inet filter {}\n").await.expect("write backup");

        let watchdog = spawn(
            nft.clone(),
            backup_path,
            Duration::from_secs(10),
            Some(Arc::new(AlwaysHealthy)),
        );
        tokio::time::sleep(Duration::from_millis(1300)).await;

        assert!(nft.current_ruleset().await.contains("chain input"));
        let _ = watchdog.confirm().await;
    }

    #[tokio::test]
    async fn unhealthy_probe_triggers_rollback_before_timeout() {
        let nft = MockNftOps::new("table inet filter { chain input { accept } }\n");
        let backup_dir = tempfile::tempdir().expect("tempdir");
        let backup_path = backup_dir.path().join("backup_r1_1.nft");
        tokio::fs::write(&backup_path, "table inet filter {}\n").await.expect("write backup");

        let flipped = Arc::new(AtomicBool::new(false));
        let watchdog = spawn(
            nft.clone(),
            backup_path,
            Duration::from_secs(30),
            Some(Arc::new(FlipsUnhealthyAfterFirstCheck(flipped))),
        );
        tokio::time::sleep(Duration::from_millis(2300)).await;

        assert_eq!(nft.current_ruleset().await, "table inet filter {}\n");
        let _ = watchdog.confirm().await;
    }
}
