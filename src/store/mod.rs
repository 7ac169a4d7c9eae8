//! Persistent storage: a small JSON-object client registry plus a
//! rotated NDJSON delivery log, both under a configurable data
//! directory. All mutations serialize on one process-wide lock — reads
//! take the same lock, keeping the model simple at this scale.

mod log;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::warn;

use crate::models::{Client, LogEntry};

pub struct Store {
    clients_path: PathBuf,
    log_path: PathBuf,
    log_max_bytes: u64,
    log_backup_count: u32,
    lock: Mutex<()>,
}

impl Store {
    /// Create the data directory and seed missing files.
    pub fn init(
        data_dir: &str,
        log_max_bytes: u64,
        log_backup_count: u32,
    ) -> std::io::Result<Self> {
        let dir = Path::new(data_dir);
        std::fs::create_dir_all(dir)?;

        let clients_path = dir.join("clients.json");
        if !clients_path.exists() {
            write_clients_file(&clients_path, &HashMap::new())?;
        }

        let log_path = dir.join("notifications.log");
        if !log_path.exists() {
            std::fs::File::create(&log_path)?;
        }

        Ok(Self {
            clients_path,
            log_path,
            log_max_bytes,
            log_backup_count,
            lock: Mutex::new(()),
        })
    }

    pub async fn list_clients(&self) -> std::io::Result<Vec<Client>> {
        let _guard = self.lock.lock().await;
        let data = read_clients_file(&self.clients_path)?;
        Ok(data.into_values().collect())
    }

    pub async fn get(&self, id: &str) -> std::io::Result<Option<Client>> {
        let _guard = self.lock.lock().await;
        let data = read_clients_file(&self.clients_path)?;
        Ok(data.get(id).cloned())
    }

    pub async fn get_by_callback(&self, callback_url: &str) -> std::io::Result<Option<Client>> {
        let _guard = self.lock.lock().await;
        let data = read_clients_file(&self.clients_path)?;
        Ok(data.into_values().find(|c| c.callback_url == callback_url))
    }

    /// Insert or update a client record.
    pub async fn save(&self, client: Client) -> std::io::Result<Client> {
        let _guard = self.lock.lock().await;
        let mut data = read_clients_file(&self.clients_path)?;
        data.insert(client.id.clone(), client.clone());
        write_clients_file(&self.clients_path, &data)?;
        Ok(client)
    }

    /// Soft-delete: mark the record inactive. Returns `false` if the id is unknown.
    /// Deleting an already-inactive client is idempotent and still returns `true`.
    pub async fn delete(&self, id: &str) -> std::io::Result<bool> {
        let _guard = self.lock.lock().await;
        let mut data = read_clients_file(&self.clients_path)?;
        let Some(client) = data.get_mut(id) else {
            return Ok(false);
        };
        client.active = false;
        write_clients_file(&self.clients_path, &data)?;
        Ok(true)
    }

    /// Append one entry to the rotating delivery log. Failures here are
    /// swallowed — a logging failure must never break delivery.
    pub async fn append_log(&self, entry: &LogEntry) {
        let _guard = self.lock.lock().await;
        let line = match serde_json::to_string(entry) {
            Ok(l) => l,
            Err(e) => {
                warn!("failed to serialize log entry: {e}");
                return;
            }
        };
        if let Err(e) = log::append(&self.log_path, &line, self.log_max_bytes, self.log_backup_count) {
            warn!("failed to append notification log: {e}");
        }
    }

    /// Scan backup files newest-first, lines within each file in reverse
    /// order, applying optional filters, stopping once `limit` entries
    /// have been collected. Malformed lines are silently skipped.
    pub async fn read_logs(
        &self,
        limit: usize,
        event_type: Option<&str>,
        client_id: Option<&str>,
    ) -> Vec<LogEntry> {
        let _guard = self.lock.lock().await;
        let mut entries = Vec::new();

        for path in log::files_newest_first(&self.log_path, self.log_backup_count) {
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            for line in content.lines().rev() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let Ok(entry) = serde_json::from_str::<LogEntry>(line) else {
                    continue;
                };
                if let Some(et) = event_type {
                    if entry.event_type != et {
                        continue;
                    }
                }
                if let Some(cid) = client_id {
                    if entry.client_id != cid {
                        continue;
                    }
                }
                entries.push(entry);
                if entries.len() >= limit {
                    return entries;
                }
            }
        }

        entries
    }
}

fn read_clients_file(path: &Path) -> std::io::Result<HashMap<String, Client>> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(std::io::Error::from)
}

fn write_clients_file(path: &Path, data: &HashMap<String, Client>) -> std::io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    let content = serde_json::to_vec_pretty(data).map_err(std::io::Error::from)?;
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::models::{Mentions, Notification};

    fn notification() -> Notification {
        Notification {
            event_type: "pr".to_string(),
            heading: "New Pull Request".to_string(),
            body: "body".to_string(),
            url: String::new(),
            project: "proj".to_string(),
            avatar_b64: None,
            status_image: Some("new pr".to_string()),
            actor: "Alice".to_string(),
            actor_id: Some("A".to_string()),
            mentions: Mentions { user_ids: vec!["B".to_string()], names: vec![] },
            meta: Default::default(),
        }
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::init(dir.path().to_str().unwrap(), 5 * 1024 * 1024, 3).unwrap();

        let client = Client::new(
            "Alice's PC".into(),
            "http://localhost:9000/notify".into(),
            "A".into(),
            "Alice".into(),
            vec!["pr".into()],
        );
        let id = client.id.clone();
        store.save(client).await.unwrap();

        let fetched = store.get(&id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Alice's PC");
        assert_eq!(store.list_clients().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reregister_by_callback_url_updates_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::init(dir.path().to_str().unwrap(), 5 * 1024 * 1024, 3).unwrap();

        let client = Client::new(
            "Alice's PC".into(),
            "http://localhost:9000/notify".into(),
            "A".into(),
            "Alice".into(),
            vec!["pr".into()],
        );
        let first_id = client.id.clone();
        store.save(client).await.unwrap();

        let existing = store
            .get_by_callback("http://localhost:9000/notify")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(existing.id, first_id);

        let mut updated = existing;
        updated.name = "Alice's Laptop".to_string();
        store.save(updated).await.unwrap();

        assert_eq!(store.list_clients().await.unwrap().len(), 1);
        let refetched = store.get(&first_id).await.unwrap().unwrap();
        assert_eq!(refetched.name, "Alice's Laptop");
    }

    #[tokio::test]
    async fn delete_unknown_client_returns_false() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::init(dir.path().to_str().unwrap(), 5 * 1024 * 1024, 3).unwrap();
        assert!(!store.delete("nonexistent").await.unwrap());
    }

    #[tokio::test]
    async fn delete_is_idempotent_soft_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::init(dir.path().to_str().unwrap(), 5 * 1024 * 1024, 3).unwrap();

        let client = Client::new(
            "Alice's PC".into(),
            "http://localhost:9000/notify".into(),
            "A".into(),
            "Alice".into(),
            vec!["pr".into()],
        );
        let id = client.id.clone();
        store.save(client).await.unwrap();

        assert!(store.delete(&id).await.unwrap());
        assert!(store.delete(&id).await.unwrap());
        let fetched = store.get(&id).await.unwrap().unwrap();
        assert!(!fetched.active);
        // Soft-deleted records are never physically removed.
        assert_eq!(store.list_clients().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn logs_return_newest_first_and_support_filters() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::init(dir.path().to_str().unwrap(), 5 * 1024 * 1024, 3).unwrap();

        for i in 0..3 {
            let entry = LogEntry::new(
                format!("client-{i}"),
                "pr".to_string(),
                notification(),
                true,
                None,
            );
            store.append_log(&entry).await;
        }
        let other = LogEntry::new(
            "client-x".to_string(),
            "workitem".to_string(),
            notification(),
            false,
            Some("boom".to_string()),
        );
        store.append_log(&other).await;

        let all = store.read_logs(10, None, None).await;
        assert_eq!(all.len(), 4);
        // Newest appended entry comes first.
        assert_eq!(all[0].client_id, "client-x");

        let pr_only = store.read_logs(10, Some("pr"), None).await;
        assert_eq!(pr_only.len(), 3);

        let client_1_only = store.read_logs(10, None, Some("client-1")).await;
        assert_eq!(client_1_only.len(), 1);
    }
}
