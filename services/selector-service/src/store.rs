//! Credential snapshot store
//!
//! Holds the credential records the selector reads, loaded from a JSON file
//! mapping auth IDs to records. Admin updates replace whole records and are
//! persisted with an atomic temp-file + rename. Readers get `Arc<Auth>`
//! clones, so a pick never holds the store lock.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use auth_selector::Auth;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Thread-safe credential snapshot backed by a JSON file.
pub struct AuthStore {
    path: PathBuf,
    state: RwLock<HashMap<String, Arc<Auth>>>,
}

impl AuthStore {
    /// Load records from `path`.
    ///
    /// A missing file is created as `{}` so the service can start with zero
    /// credentials. The map key is authoritative for each record's `id`.
    pub async fn load(path: PathBuf) -> common::Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path).await?;
            let records: HashMap<String, Auth> = serde_json::from_str(&contents)?;
            info!(path = %path.display(), auths = records.len(), "loaded credential snapshot");
            records
                .into_iter()
                .map(|(id, mut auth)| {
                    auth.id = id.clone();
                    (id, Arc::new(auth))
                })
                .collect()
        } else {
            info!(path = %path.display(), "credential snapshot not found, starting empty");
            let state = HashMap::new();
            write_atomic(&path, &state).await?;
            state
        };

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    /// Candidate set for `provider`, in no particular order.
    pub async fn candidates(&self, provider: &str) -> Vec<Arc<Auth>> {
        let state = self.state.read().await;
        state
            .values()
            .filter(|auth| auth.provider == provider)
            .cloned()
            .collect()
    }

    /// All records sorted by ID.
    pub async fn list(&self) -> Vec<Arc<Auth>> {
        let state = self.state.read().await;
        let mut auths: Vec<Arc<Auth>> = state.values().cloned().collect();
        auths.sort_by(|a, b| a.id.cmp(&b.id));
        auths
    }

    /// Add or replace a record. Memory only changes once the file is written.
    pub async fn upsert(&self, auth: Auth) -> common::Result<Arc<Auth>> {
        if auth.id.is_empty() {
            return Err(common::Error::InvalidRecord(
                "auth id must not be empty".into(),
            ));
        }
        let mut state = self.state.write().await;
        let auth = Arc::new(auth);
        let mut next = state.clone();
        next.insert(auth.id.clone(), Arc::clone(&auth));
        write_atomic(&self.path, &next).await?;
        *state = next;
        debug!(auth_id = %auth.id, provider = %auth.provider, "stored auth");
        Ok(auth)
    }

    /// Remove a record once the file is written. Returns whether it existed.
    pub async fn remove(&self, auth_id: &str) -> common::Result<bool> {
        let mut state = self.state.write().await;
        if !state.contains_key(auth_id) {
            return Ok(false);
        }
        let mut next = state.clone();
        next.remove(auth_id);
        write_atomic(&self.path, &next).await?;
        *state = next;
        debug!(auth_id, "removed auth");
        Ok(true)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.len()
    }
}

/// Write records to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over the
/// target. Permissions are 0600 on unix since records may carry account labels.
async fn write_atomic(path: &Path, data: &HashMap<String, Arc<Auth>>) -> common::Result<()> {
    let records: BTreeMap<&str, &Auth> = data
        .iter()
        .map(|(id, auth)| (id.as_str(), auth.as_ref()))
        .collect();
    let json = serde_json::to_string_pretty(&records)?;

    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    let tmp_path = dir.join(format!(".auths.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes()).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms).await?;
    }

    tokio::fs::rename(&tmp_path, path).await?;

    debug!(path = %path.display(), "persisted credential snapshot");
    Ok(())
}
