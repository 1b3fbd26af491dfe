//! Operator session persistence
//!
//! The role store is the one piece of state that outlives a console session.
//! It is injected where needed rather than read ambiently, so teardown and
//! tests can control exactly when the file is touched.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use parking_lot::RwLock;

use crate::error::Result;
use crate::fleet::{now, OperatorRole};

#[derive(Debug, Serialize, Deserialize)]
struct StoredRole {
    role: OperatorRole,
    #[serde(default)]
    saved_at: Option<String>,
}

/// File-backed store for the operator's role
///
/// `init` must run before the role is consulted; until then [`current`]
/// reports no role. A malformed file is treated as absent, not as an error.
///
/// [`current`]: RoleStore::current
#[derive(Debug)]
pub struct RoleStore {
    path: PathBuf,
    current: RwLock<Option<OperatorRole>>,
}

impl RoleStore {
    /// Store rooted under `$HOME/.muster`
    pub fn new() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Self::with_base_path(PathBuf::from(home).join(".muster"))
    }

    /// Store rooted under an explicit directory
    pub fn with_base_path(base: impl Into<PathBuf>) -> Self {
        Self {
            path: base.into().join("role.json"),
            current: RwLock::new(None),
        }
    }

    /// Load the persisted role, if any, into memory
    pub async fn init(&self) -> Result<Option<OperatorRole>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice::<StoredRole>(&bytes) {
                Ok(stored) => {
                    *self.current.write() = Some(stored.role);
                    debug!("Restored operator role {}", stored.role);
                    Ok(Some(stored.role))
                }
                Err(err) => {
                    warn!("Ignoring malformed role file: {}", err);
                    Ok(None)
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// The role loaded or set during this session
    pub fn current(&self) -> Option<OperatorRole> {
        *self.current.read()
    }

    /// Persist a role and make it current
    pub async fn set(&self, role: OperatorRole) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let stored = StoredRole {
            role,
            saved_at: Some(now().to_rfc3339()),
        };
        let bytes = serde_json::to_vec_pretty(&stored)?;
        tokio::fs::write(&self.path, bytes).await?;
        *self.current.write() = Some(role);
        info!("Operator role set to {}", role);
        Ok(())
    }

    /// Forget the role in memory and on disk
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        *self.current.write() = None;
        info!("Operator role cleared");
        Ok(())
    }
}

impl Default for RoleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_init_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = RoleStore::with_base_path(dir.path());

        store.set(OperatorRole::Operator).await.unwrap();
        assert_eq!(store.current(), Some(OperatorRole::Operator));

        let fresh = RoleStore::with_base_path(dir.path());
        assert_eq!(fresh.current(), None);
        assert_eq!(fresh.init().await.unwrap(), Some(OperatorRole::Operator));
        assert_eq!(fresh.current(), Some(OperatorRole::Operator));
    }

    #[tokio::test]
    async fn test_init_without_a_file_reports_no_role() {
        let dir = tempfile::tempdir().unwrap();
        let store = RoleStore::with_base_path(dir.path());

        assert_eq!(store.init().await.unwrap(), None);
        assert_eq!(store.current(), None);
    }

    #[tokio::test]
    async fn test_malformed_file_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("role.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let store = RoleStore::with_base_path(dir.path());
        assert_eq!(store.init().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_removes_the_file_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = RoleStore::with_base_path(dir.path());

        store.set(OperatorRole::Admin).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.current(), None);

        store.clear().await.unwrap();

        let fresh = RoleStore::with_base_path(dir.path());
        assert_eq!(fresh.init().await.unwrap(), None);
    }
}
