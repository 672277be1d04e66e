//! Driving the `nft` binary to capture, flush, and apply rulesets.
//! Structured as a trait with a real implementation and a stateful mock, the
//! same split `gnosis_vpn-root::routing::shell_ops` uses for its `ShellOps`
//! trait so the deployer can be exercised without a live `nft`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::shell_ext::{self, run_stdout};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Shell(#[from] shell_ext::Error),
    #[error("`{0}` timed out")]
    Timeout(&'static str),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait NftOps: Send + Sync {
    /// `nft list ruleset`.
    async fn list_ruleset(&self) -> Result<String, Error>;
    /// `nft flush ruleset`.
    async fn flush_ruleset(&self) -> Result<(), Error>;
    /// `nft -f <path>`.
    async fn apply_file(&self, path: &Path) -> Result<(), Error>;
    /// `nft --check -f <path>`, returns stdout/stderr regardless of exit status.
    async fn check_file(&self, path: &Path) -> Result<(bool, String, String), Error>;
}

/// Production [`NftOps`] shelling out to the real `nft` binary.
#[derive(Clone, Default)]
pub struct RealNftOps;

#[async_trait]
impl NftOps for RealNftOps {
    async fn list_ruleset(&self) -> Result<String, Error> {
        let fut = run_stdout(Command::new("nft").args(["list", "ruleset"]));
        timeout(Duration::from_secs(10), fut)
            .await
            .map_err(|_| Error::Timeout("nft list ruleset"))?
            .map_err(Error::from)
    }

    async fn flush_ruleset(&self) -> Result<(), Error> {
        let fut = run_stdout(Command::new("nft").args(["flush", "ruleset"]));
        timeout(Duration::from_secs(10), fut)
            .await
            .map_err(|_| Error::Timeout("nft flush ruleset"))?
            .map(|_| ())
            .map_err(Error::from)
    }

    async fn apply_file(&self, path: &Path) -> Result<(), Error> {
        let fut = run_stdout(Command::new("nft").arg("-f").arg(path));
        timeout(Duration::from_secs(30), fut)
            .await
            .map_err(|_| Error::Timeout("nft -f"))?
            .map(|_| ())
            .map_err(Error::from)
    }

    async fn check_file(&self, path: &Path) -> Result<(bool, String, String), Error> {
        let fut = Command::new("nft").args(["--check", "-f"]).arg(path).output();
        let output = timeout(Duration::from_secs(10), fut)
            .await
            .map_err(|_| Error::Timeout("nft --check"))??;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        Ok((output.status.success(), stdout, stderr))
    }
}

/// Stateful mock used by deployer/backup tests: holds the "ruleset" as a
/// string and can be told to fail specific operations, mirroring
/// `gnosis_vpn-root::routing::mocks`'s `fail_on` map.
#[derive(Clone, Default)]
pub struct MockNftOps {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    ruleset: String,
    fail_apply: bool,
    fail_list: bool,
    applied_files: Vec<String>,
}

impl MockNftOps {
    pub fn new(initial_ruleset: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                ruleset: initial_ruleset.into(),
                ..Default::default()
            })),
        }
    }

    pub async fn set_fail_apply(&self, fail: bool) {
        self.state.lock().await.fail_apply = fail;
    }

    pub async fn set_fail_list(&self, fail: bool) {
        self.state.lock().await.fail_list = fail;
    }

    pub async fn current_ruleset(&self) -> String {
        self.state.lock().await.ruleset.clone()
    }

    pub async fn applied_files(&self) -> Vec<String> {
        self.state.lock().await.applied_files.clone()
    }
}

#[async_trait]
impl NftOps for MockNftOps {
    async fn list_ruleset(&self) -> Result<String, Error> {
        let state = self.state.lock().await;
        if state.fail_list {
            return Err(Error::Timeout("nft list ruleset"));
        }
        Ok(state.ruleset.clone())
    }

    async fn flush_ruleset(&self) -> Result<(), Error> {
        self.state.lock().await.ruleset.clear();
        Ok(())
    }

    async fn apply_file(&self, path: &Path) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if state.fail_apply {
            return Err(Error::Shell(shell_ext::Error::NonZeroExit {
                code: Some(1),
                stdout: String::new(),
                stderr: "mock apply failure".to_string(),
            }));
        }
        let content = tokio::fs::read_to_string(path).await?;
        state.ruleset.push_str(&content);
        state.applied_files.push(path.display().to_string());
        Ok(())
    }

    async fn check_file(&self, _path: &Path) -> Result<(bool, String, String), Error> {
        Ok((true, String::new(), String::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_apply_file_appends_to_ruleset_and_records_path() {
        let mock = MockNftOps::new("table inet filter {}\n");
        let tmp = tempfile::NamedTempFile::new().expect("tmp file");
        tokio::fs::write(tmp.path(), "add rule inet filter input accept\n")
            .await
            .expect("write rule");

        mock.apply_file(tmp.path()).await.expect("apply succeeds");

        assert!(mock.current_ruleset().await.contains("add rule"));
        assert_eq!(mock.applied_files().await.len(), 1);
    }

    #[tokio::test]
    async fn mock_apply_file_honors_fail_injection() {
        let mock = MockNftOps::new("");
        mock.set_fail_apply(true).await;
        let tmp = tempfile::NamedTempFile::new().expect("tmp file");

        let err = mock.apply_file(tmp.path()).await.unwrap_err();
        assert!(matches!(err, Error::Shell(_)));
    }

    #[tokio::test]
    async fn mock_flush_clears_ruleset() {
        let mock = MockNftOps::new("table inet filter {}\n");
        mock.flush_ruleset().await.expect("flush succeeds");
        assert_eq!(mock.current_ruleset().await, "");
    }
}
