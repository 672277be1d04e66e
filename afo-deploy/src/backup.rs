//! Backup bookkeeping: a timestamped copy of the full ruleset is written
//! before every deploy, and rollback means flush-then-restore from the most
//! recent backup file for a given rule id.

use std::path::{Path, PathBuf};

use afo_nft::NftOps;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("nft error: {0}")]
    Nft(#[from] afo_nft::ruleset::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no backup found for rule `{0}`")]
    NotFound(String),
}

/// Ensures `backup_dir` exists and writes the current ruleset into a
/// timestamped file under it. `now` is unix-seconds, supplied by the caller
/// so this stays free of wall-clock reads.
pub async fn create_backup(
    nft: &impl NftOps,
    backup_dir: &Path,
    rule_id: &str,
    now: i64,
) -> Result<PathBuf, Error> {
    tokio::fs::create_dir_all(backup_dir).await?;
    let ruleset = nft.list_ruleset().await?;
    let path = backup_dir.join(format!("backup_{rule_id}_{now}.nft"));
    tokio::fs::write(&path, ruleset).await?;
    Ok(path)
}

/// Flushes the live ruleset and replays a backup file over it.
pub async fn restore_backup(nft: &impl NftOps, backup_path: &Path) -> Result<(), Error> {
    if !tokio::fs::try_exists(backup_path).await? {
        return Err(Error::NotFound(backup_path.display().to_string()));
    }
    nft.flush_ruleset().await?;
    nft.apply_file(backup_path).await?;
    Ok(())
}

/// Finds the most recently created backup file for `rule_id`, if any.
pub async fn most_recent_backup(backup_dir: &Path, rule_id: &str) -> Result<Option<PathBuf>, Error> {
    let prefix = format!("backup_{rule_id}_");
    let mut entries = match tokio::fs::read_dir(backup_dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    let mut candidates = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.starts_with(&prefix) && name.ends_with(".nft") {
            let modified = entry.metadata().await?.modified()?;
            candidates.push((modified, entry.path()));
        }
    }

    candidates.sort_by_key(|(modified, _)| *modified);
    Ok(candidates.pop().map(|(_, path)| path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use afo_nft::MockNftOps;

    #[tokio::test]
    async fn create_backup_writes_ruleset_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nft = MockNftOps::new("table inet filter {}\n");

        let path = create_backup(&nft, dir.path(), "r1", 1_000).await.expect("backup");

        let content = tokio::fs::read_to_string(&path).await.expect("read backup");
        assert_eq!(content, "table inet filter {}\n");
        assert!(path.file_name().unwrap().to_str().unwrap().starts_with("backup_r1_"));
    }

    #[tokio::test]
    async fn most_recent_backup_picks_the_latest_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nft = MockNftOps::new("ruleset-a");
        let first = create_backup(&nft, dir.path(), "r1", 1_000).await.expect("backup 1");
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let second = create_backup(&nft, dir.path(), "r1", 2_000).await.expect("backup 2");

        let found = most_recent_backup(dir.path(), "r1").await.expect("lookup").expect("some backup");
        assert_eq!(found, second);
        assert_ne!(found, first);
    }

    #[tokio::test]
    async fn most_recent_backup_is_none_when_directory_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("does-not-exist");
        let found = most_recent_backup(&missing, "r1").await.expect("lookup");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn restore_backup_fails_when_file_missing() {
        let nft = MockNftOps::new("");
        let err = restore_backup(&nft, Path::new("/nonexistent/backup.nft"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
