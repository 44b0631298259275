use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::{Value, json};
use tabdeck::catalog::Catalogs;
use tabdeck::error::{Error, Result};
use tabdeck::index::{
    DEFAULT_WORKSPACE_ID, DEFAULT_WORKSPACE_NAME, INDEX_STORAGE_KEY, WorkspaceIndex, storage_key,
};
use tabdeck::settings::{
    BackgroundKind, BackgroundSettingsInitial, WidgetKind, WidgetSettingsInitial,
    WorkspaceSettingsInitial,
};
use tabdeck::storage::{Backend, MemoryStorage, Storage};

/// Memory storage whose reads or writes can be made to fail.
#[derive(Default)]
struct FlakyStorage {
    inner: MemoryStorage,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl Storage for FlakyStorage {
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, Value>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Other("read refused".to_string()));
        }
        self.inner.get(keys).await
    }

    async fn set(&self, items: HashMap<String, Value>) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Other("write refused".to_string()));
        }
        self.inner.set(items).await
    }

    async fn remove(&self, keys: &[String]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Other("write refused".to_string()));
        }
        self.inner.remove(keys).await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }
}

fn catalogs() -> Arc<Catalogs> {
    Arc::new(Catalogs::builtin())
}

async fn memory_index() -> (Arc<MemoryStorage>, WorkspaceIndex<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let index = WorkspaceIndex::create(Arc::clone(&storage), catalogs())
        .await
        .unwrap();
    (storage, index)
}

#[tokio::test]
async fn fresh_storage_bootstraps_a_default_workspace() {
    let (storage, index) = memory_index().await;

    assert_eq!(index.entries().len(), 1);
    assert_eq!(index.entries()[0].id, DEFAULT_WORKSPACE_ID);
    assert_eq!(index.entries()[0].name, DEFAULT_WORKSPACE_NAME);
    assert_eq!(index.default_id(), DEFAULT_WORKSPACE_ID);

    let stored = storage.snapshot();
    assert_eq!(
        stored[INDEX_STORAGE_KEY],
        json!({ "default": "default", "entries": [{ "id": "default", "name": "Default" }] })
    );
    assert_eq!(stored[&storage_key(DEFAULT_WORKSPACE_ID)]["name"], "Default");
}

#[tokio::test]
async fn existing_index_is_loaded_without_bootstrap() {
    let storage = Arc::new(MemoryStorage::with_entries([(
        INDEX_STORAGE_KEY.to_string(),
        json!({ "default": "b", "entries": [{ "id": "a", "name": "A" }, { "id": "b", "name": "B" }] }),
    )]));

    let index = WorkspaceIndex::create(Arc::clone(&storage), catalogs())
        .await
        .unwrap();

    assert_eq!(index.default_id(), "b");
    let ids: Vec<&str> = index.entries().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, ["a", "b"]);
    assert!(!storage.snapshot().contains_key(&storage_key(DEFAULT_WORKSPACE_ID)));
}

#[tokio::test]
async fn corrupt_index_falls_back_to_bootstrap() {
    let storage = Arc::new(MemoryStorage::with_entries([(
        INDEX_STORAGE_KEY.to_string(),
        json!("not an index"),
    )]));

    let index = WorkspaceIndex::create(Arc::clone(&storage), catalogs())
        .await
        .unwrap();

    assert_eq!(index.entries().len(), 1);
    assert_eq!(index.default_id(), DEFAULT_WORKSPACE_ID);
}

#[tokio::test]
async fn empty_index_with_stale_default_bootstraps_a_reachable_default() {
    let storage = Arc::new(MemoryStorage::with_entries([(
        INDEX_STORAGE_KEY.to_string(),
        json!({ "default": "gone", "entries": [] }),
    )]));

    let index = WorkspaceIndex::create(Arc::clone(&storage), catalogs())
        .await
        .unwrap();

    assert_eq!(index.default_id(), DEFAULT_WORKSPACE_ID);
    assert!(index.entries().iter().any(|e| e.id == index.default_id()));
    assert_eq!(
        storage.snapshot()[INDEX_STORAGE_KEY]["default"],
        DEFAULT_WORKSPACE_ID
    );

    let (id, workspace) = index.get_default().await.unwrap();
    assert_eq!(id, DEFAULT_WORKSPACE_ID);
    assert_eq!(workspace.name().get(), DEFAULT_WORKSPACE_NAME);
}

#[tokio::test]
async fn deleting_every_workspace_then_reopening_restores_the_default() {
    let (storage, mut index) = memory_index().await;
    index
        .save("a", WorkspaceSettingsInitial::named("A"))
        .await
        .unwrap();
    index.set_default("a").await.unwrap();
    index.delete(&[DEFAULT_WORKSPACE_ID, "a"]).await.unwrap();

    let reopened = WorkspaceIndex::create(Arc::clone(&storage), catalogs())
        .await
        .unwrap();

    assert_eq!(reopened.default_id(), DEFAULT_WORKSPACE_ID);
    assert_eq!(reopened.entries().len(), 1);
    assert_eq!(reopened.entries()[0].id, DEFAULT_WORKSPACE_ID);
}

#[tokio::test]
async fn failing_reads_are_recovered() {
    let storage = Arc::new(FlakyStorage::default());
    storage.fail_reads.store(true, Ordering::SeqCst);

    let index = WorkspaceIndex::create(Arc::clone(&storage), catalogs())
        .await
        .unwrap();
    assert_eq!(index.entries().len(), 1);

    let workspace = index.get("anything").await.unwrap();
    assert_eq!(workspace.background().kind(), BackgroundKind::StaticColor);
    assert!(workspace.widgets().is_empty());
}

#[tokio::test]
async fn failing_writes_are_reported_and_leave_the_index_unchanged() {
    let storage = Arc::new(FlakyStorage::default());
    let mut index = WorkspaceIndex::create(Arc::clone(&storage), catalogs())
        .await
        .unwrap();
    storage.fail_writes.store(true, Ordering::SeqCst);

    let result = index.save("new", WorkspaceSettingsInitial::named("New")).await;

    assert!(result.is_err());
    assert_eq!(index.entries().len(), 1);
}

#[tokio::test]
async fn missing_or_corrupt_workspace_loads_as_empty() {
    let (storage, index) = memory_index().await;
    storage
        .set(HashMap::from([(storage_key("broken"), json!({ "widgets": 42 }))]))
        .await
        .unwrap();

    let missing = index.get("nope").await.unwrap();
    let broken = index.get("broken").await.unwrap();

    for workspace in [missing, broken] {
        assert_eq!(workspace.background().kind(), BackgroundKind::StaticColor);
        assert!(workspace.widgets().is_empty());
        assert_eq!(workspace.name().get(), "");
    }
}

#[tokio::test]
async fn saving_a_live_workspace_commits_it() {
    let (storage, mut index) = memory_index().await;
    let (id, mut workspace) = index.get_default().await.unwrap();
    assert_eq!(id, DEFAULT_WORKSPACE_ID);

    workspace.name().set("Desk".to_string());
    workspace
        .add_widget(WidgetSettingsInitial::new(WidgetKind::Date))
        .await
        .unwrap();
    assert!(workspace.has_changes());

    index.save(&id, &workspace).await.unwrap();

    assert!(!workspace.has_changes());
    assert_eq!(index.entries()[0].name, "Desk");
    let stored = &storage.snapshot()[&storage_key(&id)];
    assert_eq!(stored["widgets"][0]["type"], "date");
}

#[tokio::test]
async fn save_then_get_round_trips() {
    let (_storage, mut index) = memory_index().await;
    let mut workspace = index.get(DEFAULT_WORKSPACE_ID).await.unwrap();
    workspace
        .set_background(
            BackgroundSettingsInitial::new(BackgroundKind::StaticImage)
                .with_extra("url", "https://example.com/a.jpg"),
        )
        .await
        .unwrap();
    workspace
        .add_widget(WidgetSettingsInitial::new(WidgetKind::Note).with_extra("text", "hi"))
        .await
        .unwrap();
    index.save(DEFAULT_WORKSPACE_ID, &workspace).await.unwrap();

    let reloaded = index.get(DEFAULT_WORKSPACE_ID).await.unwrap();

    assert_eq!(reloaded.background().kind(), BackgroundKind::StaticImage);
    assert_eq!(reloaded.widgets().len(), 1);
    assert_eq!(reloaded.snapshot(), workspace.snapshot());
}

#[tokio::test]
async fn out_of_range_edits_are_refused_and_saved_workspaces_still_load() {
    let (_storage, mut index) = memory_index().await;
    let workspace = index.get(DEFAULT_WORKSPACE_ID).await.unwrap();
    let background = workspace.background().settings();

    assert!(matches!(background.set_blur(200), Err(Error::Construction { .. })));
    assert!(background.set_dimming(150).is_err());
    assert_eq!(background.blur().get(), 0);
    assert!(!workspace.has_changes());

    background.set_blur(40).unwrap();
    index.save(DEFAULT_WORKSPACE_ID, &workspace).await.unwrap();

    let reloaded = index.get(DEFAULT_WORKSPACE_ID).await.unwrap();
    assert_eq!(reloaded.background().settings().blur().get(), 40);
    assert_eq!(reloaded.snapshot(), workspace.snapshot());
}

#[tokio::test]
async fn saving_a_record_upserts_the_entry() {
    let (storage, mut index) = memory_index().await;

    index
        .save("work", WorkspaceSettingsInitial::named("Work"))
        .await
        .unwrap();
    index
        .save("work", WorkspaceSettingsInitial::named("Office"))
        .await
        .unwrap();

    assert_eq!(index.entries().len(), 2);
    assert_eq!(index.entries()[1].name, "Office");
    assert_eq!(storage.snapshot()[&storage_key("work")], json!({ "name": "Office" }));
}

#[tokio::test]
async fn delete_removes_entries_and_records() {
    let (storage, mut index) = memory_index().await;
    index
        .save("a", WorkspaceSettingsInitial::named("A"))
        .await
        .unwrap();
    index
        .save("b", WorkspaceSettingsInitial::named("B"))
        .await
        .unwrap();

    index.delete(&["a", "missing"]).await.unwrap();

    let ids: Vec<&str> = index.entries().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, [DEFAULT_WORKSPACE_ID, "b"]);
    let stored = storage.snapshot();
    assert!(!stored.contains_key(&storage_key("a")));
    assert!(stored.contains_key(&storage_key("b")));
    assert_eq!(stored[INDEX_STORAGE_KEY]["entries"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn set_default_persists_even_for_unknown_ids() {
    let (storage, mut index) = memory_index().await;

    index.set_default("later").await.unwrap();

    assert_eq!(index.default_id(), "later");
    assert_eq!(storage.snapshot()[INDEX_STORAGE_KEY]["default"], "later");

    let reopened = WorkspaceIndex::create(Arc::clone(&storage), catalogs())
        .await
        .unwrap();
    assert_eq!(reopened.default_id(), "later");
}

#[tokio::test]
async fn wipe_all_resets_to_a_single_default() {
    let (storage, mut index) = memory_index().await;
    index
        .save("a", WorkspaceSettingsInitial::named("A"))
        .await
        .unwrap();
    index.set_default("a").await.unwrap();

    index.wipe_all().await.unwrap();

    assert_eq!(index.entries().len(), 1);
    assert_eq!(index.default_id(), DEFAULT_WORKSPACE_ID);
    let stored = storage.snapshot();
    assert!(!stored.contains_key(&storage_key("a")));
    assert_eq!(stored[INDEX_STORAGE_KEY]["default"], DEFAULT_WORKSPACE_ID);
}

#[tokio::test]
async fn unavailable_storage_reads_empty_and_refuses_writes() {
    let storage = Arc::new(Backend::Unavailable);
    let mut index = WorkspaceIndex::create(storage, catalogs()).await.unwrap();

    assert_eq!(index.entries().len(), 1);
    assert_eq!(index.default_id(), DEFAULT_WORKSPACE_ID);

    let (_, workspace) = index.get_default().await.unwrap();
    assert!(workspace.widgets().is_empty());

    let result = index.save("x", WorkspaceSettingsInitial::named("X")).await;
    assert!(matches!(result, Err(Error::StorageUnavailable)));
    assert_eq!(index.entries().len(), 1);

    assert!(matches!(
        index.delete(&[DEFAULT_WORKSPACE_ID]).await,
        Err(Error::StorageUnavailable)
    ));
    assert!(matches!(
        index.set_default("x").await,
        Err(Error::StorageUnavailable)
    ));
    assert!(matches!(index.wipe_all().await, Err(Error::StorageUnavailable)));
}
