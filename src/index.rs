//! Directory of saved workspaces.
//!
//! The index keeps `{id, name}` summaries plus the id of the default
//! workspace under [`INDEX_STORAGE_KEY`]; each workspace body lives under
//! [`storage_key`]. Reads recover from storage failures by falling back to
//! empty records. Writes never swallow failures.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{Instrument, debug, info, warn};

use crate::catalog::Catalogs;
use crate::error::{Error, Result};
use crate::settings::WorkspaceSettingsInitial;
use crate::storage::Storage;
use crate::telemetry::{metrics, workspace::start_index_span};
use crate::workspace::Workspace;

pub const INDEX_STORAGE_KEY: &str = "workspaces";
pub const DEFAULT_WORKSPACE_ID: &str = "default";
pub const DEFAULT_WORKSPACE_NAME: &str = "Default";

/// Storage key of the workspace body for `id`.
pub fn storage_key(id: &str) -> String {
    format!("workspace_{id}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceInfo {
    pub id: String,
    pub name: String,
}

/// The persisted index record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexRecord {
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub entries: Vec<WorkspaceInfo>,
}

/// What [`WorkspaceIndex::save`] writes.
pub enum SaveSource<'a> {
    /// Persisted through [`Workspace::commit`], so the dirty flag clears.
    Live(&'a Workspace),
    /// Written as-is.
    Record(WorkspaceSettingsInitial),
}

impl SaveSource<'_> {
    fn name(&self) -> String {
        match self {
            Self::Live(workspace) => workspace.name().get(),
            Self::Record(record) => record.name.clone().unwrap_or_default(),
        }
    }
}

impl<'a> From<&'a Workspace> for SaveSource<'a> {
    fn from(workspace: &'a Workspace) -> Self {
        Self::Live(workspace)
    }
}

impl From<WorkspaceSettingsInitial> for SaveSource<'_> {
    fn from(record: WorkspaceSettingsInitial) -> Self {
        Self::Record(record)
    }
}

pub struct WorkspaceIndex<S> {
    storage: Arc<S>,
    catalogs: Arc<Catalogs>,
    default_id: String,
    entries: Vec<WorkspaceInfo>,
}

impl<S: Storage + 'static> WorkspaceIndex<S> {
    /// Load the index from `storage`.
    ///
    /// An unreadable index is logged and treated as empty. An empty index is
    /// bootstrapped with a single "Default" workspace, which is persisted
    /// when storage is available.
    ///
    /// Without storage the "Default" entry is kept in memory only. Callers
    /// can then always resolve [`get_default`](Self::get_default) to an
    /// entry, even though the entry is never written.
    pub async fn create(storage: Arc<S>, catalogs: Arc<Catalogs>) -> Result<Self> {
        let span = start_index_span("create", None);
        async move {
            let record = if storage.is_available() {
                load_index(storage.as_ref()).await
            } else {
                debug!("storage unavailable, starting with an in-memory index");
                IndexRecord::default()
            };

            let mut index = Self {
                storage,
                catalogs,
                default_id: record
                    .default
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| DEFAULT_WORKSPACE_ID.to_string()),
                entries: dedup_entries(record.entries),
            };

            if index.entries.is_empty() {
                index.bootstrap().await?;
            }
            debug!(
                entries = index.entries.len(),
                default = %index.default_id,
                "workspace index loaded"
            );
            Ok(index)
        }
        .instrument(span)
        .await
    }

    async fn bootstrap(&mut self) -> Result<()> {
        let initial = WorkspaceSettingsInitial::named(DEFAULT_WORKSPACE_NAME);
        // A stored default may name an entry that no longer exists.
        self.default_id = DEFAULT_WORKSPACE_ID.to_string();
        if !self.storage.is_available() {
            self.entries = vec![WorkspaceInfo {
                id: DEFAULT_WORKSPACE_ID.to_string(),
                name: DEFAULT_WORKSPACE_NAME.to_string(),
            }];
            return Ok(());
        }
        let workspace = Workspace::create(Arc::clone(&self.catalogs), initial).await?;
        self.save(DEFAULT_WORKSPACE_ID, &workspace).await?;
        info!("bootstrapped default workspace");
        Ok(())
    }

    /// Summaries in persisted order.
    pub fn entries(&self) -> &[WorkspaceInfo] {
        &self.entries
    }

    /// The default id. May name a workspace that has not been saved yet.
    pub fn default_id(&self) -> &str {
        &self.default_id
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn catalogs(&self) -> &Arc<Catalogs> {
        &self.catalogs
    }

    /// The stored record for `id`, or an empty record if it is missing or
    /// cannot be read.
    pub async fn initial_settings(&self, id: &str) -> WorkspaceSettingsInitial {
        if !self.storage.is_available() {
            return WorkspaceSettingsInitial::default();
        }
        let key = storage_key(id);
        match read_value(self.storage.as_ref(), &key).await {
            Ok(Some(value)) => decode(&key, value).unwrap_or_else(|e| {
                recover("workspace", &e);
                WorkspaceSettingsInitial::default()
            }),
            Ok(None) => {
                debug!(id, "no stored workspace, using an empty record");
                WorkspaceSettingsInitial::default()
            }
            Err(e) => {
                recover("workspace", &e);
                WorkspaceSettingsInitial::default()
            }
        }
    }

    /// Build the live workspace stored under `id`.
    pub async fn get(&self, id: &str) -> Result<Workspace> {
        let span = start_index_span("get", Some(id));
        async {
            let settings = self.initial_settings(id).await;
            Workspace::create(Arc::clone(&self.catalogs), settings).await
        }
        .instrument(span)
        .await
    }

    pub async fn get_default(&self) -> Result<(String, Workspace)> {
        let id = self.default_id.clone();
        let workspace = self.get(&id).await?;
        Ok((id, workspace))
    }

    /// Record `id` in the index under the workspace's current name, then
    /// persist the workspace body.
    pub async fn save<'a>(&mut self, id: &str, source: impl Into<SaveSource<'a>>) -> Result<()> {
        let source = source.into();
        let span = start_index_span("save", Some(id));
        async move {
            self.ensure_available()?;

            let name = source.name();
            let mut entries = self.entries.clone();
            match entries.iter_mut().find(|entry| entry.id == id) {
                Some(entry) => entry.name = name,
                None => entries.push(WorkspaceInfo {
                    id: id.to_string(),
                    name,
                }),
            }
            self.write_index(&self.default_id, &entries).await?;
            self.entries = entries;

            let key = storage_key(id);
            match source {
                SaveSource::Live(workspace) => {
                    let storage = Arc::clone(&self.storage);
                    workspace
                        .commit(|record| async move {
                            let value = serde_json::to_value(record)?;
                            storage.set(HashMap::from([(key, value)])).await
                        })
                        .await?;
                }
                SaveSource::Record(record) => {
                    let value = serde_json::to_value(record)?;
                    self.storage.set(HashMap::from([(key, value)])).await?;
                }
            }
            info!("workspace saved");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Drop `ids` from the index and remove their stored bodies. Unknown ids
    /// are ignored.
    pub async fn delete(&mut self, ids: &[&str]) -> Result<()> {
        let span = start_index_span("delete", None);
        async move {
            self.ensure_available()?;

            let doomed: HashSet<&str> = ids.iter().copied().collect();
            let entries: Vec<WorkspaceInfo> = self
                .entries
                .iter()
                .filter(|entry| !doomed.contains(entry.id.as_str()))
                .cloned()
                .collect();
            self.write_index(&self.default_id, &entries).await?;
            self.entries = entries;

            let keys: Vec<String> = ids.iter().map(|id| storage_key(id)).collect();
            self.storage.remove(&keys).await?;
            debug!(count = ids.len(), "workspaces deleted");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Make `id` the default. The id is not required to have an entry yet,
    /// so a default can be chosen before its first save.
    pub async fn set_default(&mut self, id: &str) -> Result<()> {
        let span = start_index_span("set_default", Some(id));
        async move {
            self.ensure_available()?;
            if !self.entries.iter().any(|entry| entry.id == id) {
                warn!(id, "default set to a workspace that is not in the index");
            }
            self.write_index(id, &self.entries).await?;
            self.default_id = id.to_string();
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Erase all stored data, then bootstrap a fresh "Default" workspace so
    /// the in-memory index matches what is persisted.
    pub async fn wipe_all(&mut self) -> Result<()> {
        let span = start_index_span("wipe_all", None);
        async move {
            self.ensure_available()?;
            self.storage.clear().await?;
            self.entries.clear();
            self.default_id = DEFAULT_WORKSPACE_ID.to_string();
            warn!("storage wiped");
            self.bootstrap().await
        }
        .instrument(span)
        .await
    }

    fn ensure_available(&self) -> Result<()> {
        if self.storage.is_available() {
            Ok(())
        } else {
            Err(Error::StorageUnavailable)
        }
    }

    async fn write_index(&self, default: &str, entries: &[WorkspaceInfo]) -> Result<()> {
        let record = IndexRecord {
            default: Some(default.to_string()),
            entries: entries.to_vec(),
        };
        let value = serde_json::to_value(record)?;
        self.storage
            .set(HashMap::from([(INDEX_STORAGE_KEY.to_string(), value)]))
            .await
    }
}

async fn load_index<S: Storage>(storage: &S) -> IndexRecord {
    let value = match read_value(storage, INDEX_STORAGE_KEY).await {
        Ok(Some(value)) => value,
        Ok(None) => return IndexRecord::default(),
        Err(e) => {
            recover("index", &e);
            return IndexRecord::default();
        }
    };
    decode(INDEX_STORAGE_KEY, value).unwrap_or_else(|e| {
        recover("index", &e);
        IndexRecord::default()
    })
}

async fn read_value<S: Storage>(storage: &S, key: &str) -> Result<Option<Value>> {
    let mut values = storage.get(&[key.to_string()]).await?;
    Ok(values.remove(key).filter(|value| !value.is_null()))
}

fn decode<T: serde::de::DeserializeOwned>(key: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::StorageRead {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn recover(record: &'static str, error: &Error) {
    metrics::record_recovered_read(record);
    warn!(record, "falling back to an empty {record}: {error}");
}

/// Keep the first entry for each id.
fn dedup_entries(entries: Vec<WorkspaceInfo>) -> Vec<WorkspaceInfo> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.id.clone()))
        .collect()
}
