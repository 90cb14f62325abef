use heylisten_storage::{Registry, UpsertOutcome, REGISTRY_FILE_NAME};
use heylisten_types::{PlaylistId, PlaylistInfo, RecipientId, RegistryEntry};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn pid(s: &str) -> PlaylistId {
    PlaylistId::parse(s).unwrap()
}

fn rid(s: &str) -> RecipientId {
    RecipientId::parse(s).unwrap()
}

fn info(id: &str) -> PlaylistInfo {
    PlaylistInfo::new(pid(id), format!("Playlist {id}"), 10)
}

fn recipients_for(entries: &[RegistryEntry], id: &str) -> Vec<Option<String>> {
    entries
        .iter()
        .filter(|e| e.id.as_str() == id)
        .map(|e| e.recipient.as_ref().map(|r| r.to_string()))
        .collect()
}

// ── upsert ──────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_inserts_new_entry() {
    let registry = Registry::in_memory();
    let outcome = registry.upsert(info("p1"), Some(rid("alice"))).await.unwrap();

    assert_eq!(outcome, UpsertOutcome::Inserted);
    assert_eq!(registry.len().await, 1);
    assert!(registry.get(&pid("p1"), Some(&rid("alice"))).await.is_some());
}

#[tokio::test]
async fn upsert_duplicate_is_noop() {
    let registry = Registry::in_memory();
    registry.upsert(info("p1"), Some(rid("alice"))).await.unwrap();
    let outcome = registry.upsert(info("p1"), Some(rid("alice"))).await.unwrap();

    assert_eq!(outcome, UpsertOutcome::AlreadyPresent);
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn upsert_attaches_recipient_to_unowned_entry() {
    let registry = Registry::in_memory();
    registry.upsert(info("p1"), None).await.unwrap();
    let outcome = registry.upsert(info("p1"), Some(rid("alice"))).await.unwrap();

    assert_eq!(outcome, UpsertOutcome::AttachedRecipient);
    let entries = registry.list().await;
    assert_eq!(recipients_for(&entries, "p1"), vec![Some("alice".to_string())]);
}

#[tokio::test]
async fn upsert_without_recipient_preserves_existing_owner() {
    let registry = Registry::in_memory();
    registry.upsert(info("p1"), Some(rid("alice"))).await.unwrap();
    let outcome = registry.upsert(info("p1"), None).await.unwrap();

    assert_eq!(outcome, UpsertOutcome::AlreadyPresent);
    let entries = registry.list().await;
    assert_eq!(recipients_for(&entries, "p1"), vec![Some("alice".to_string())]);
}

#[tokio::test]
async fn second_recipient_creates_independent_entry() {
    let registry = Registry::in_memory();
    registry.upsert(info("p1"), Some(rid("u1"))).await.unwrap();
    let outcome = registry.upsert(info("p1"), Some(rid("u2"))).await.unwrap();

    assert_eq!(outcome, UpsertOutcome::Inserted);
    let entries = registry.list().await;
    assert_eq!(
        recipients_for(&entries, "p1"),
        vec![Some("u1".to_string()), Some("u2".to_string())]
    );
    assert_eq!(registry.playlist_ids().await, vec![pid("p1")]);
}

// ── list_for_recipient / remove ─────────────────────────────────

#[tokio::test]
async fn list_for_recipient_filters_exactly() {
    let registry = Registry::in_memory();
    registry.upsert(info("p1"), Some(rid("u1"))).await.unwrap();
    registry.upsert(info("p2"), Some(rid("u2"))).await.unwrap();
    registry.upsert(info("p3"), None).await.unwrap();

    let mine = registry.list_for_recipient(&rid("u1")).await;
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, pid("p1"));
}

#[tokio::test]
async fn remove_only_matching_pair() {
    let registry = Registry::in_memory();
    registry.upsert(info("p1"), Some(rid("u1"))).await.unwrap();
    registry.upsert(info("p1"), Some(rid("u2"))).await.unwrap();

    assert!(registry.remove(&pid("p1"), Some(&rid("u1"))).await.unwrap());
    let entries = registry.list().await;
    assert_eq!(recipients_for(&entries, "p1"), vec![Some("u2".to_string())]);
}

#[tokio::test]
async fn remove_without_recipient_targets_unowned_entry() {
    let registry = Registry::in_memory();
    registry.upsert(info("p1"), Some(rid("u1"))).await.unwrap();
    registry.upsert(info("p2"), None).await.unwrap();

    assert!(!registry.remove(&pid("p1"), None).await.unwrap());
    assert!(registry.remove(&pid("p2"), None).await.unwrap());
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn remove_missing_returns_false() {
    let registry = Registry::in_memory();
    assert!(!registry.remove(&pid("p1"), Some(&rid("u1"))).await.unwrap());
}

// ── replace_set ─────────────────────────────────────────────────

#[tokio::test]
async fn replace_set_empty_removes_only_that_recipient() {
    let registry = Registry::in_memory();
    registry.upsert(info("e"), Some(rid("u1"))).await.unwrap();
    registry.upsert(info("e"), Some(rid("u2"))).await.unwrap();

    let candidates = vec![info("e")];
    registry.replace_set(&[], &candidates, Some(&rid("u1"))).await.unwrap();

    let entries = registry.list().await;
    assert_eq!(recipients_for(&entries, "e"), vec![Some("u2".to_string())]);
}

#[tokio::test]
async fn replace_set_draws_from_candidates() {
    let registry = Registry::in_memory();
    registry.upsert(info("old"), Some(rid("u1"))).await.unwrap();
    registry.upsert(info("shared"), Some(rid("u2"))).await.unwrap();

    let candidates = vec![info("a"), info("b"), info("c")];
    registry
        .replace_set(&[pid("a"), pid("c"), pid("not-listed")], &candidates, Some(&rid("u1")))
        .await
        .unwrap();

    let mine: Vec<PlaylistId> = registry
        .list_for_recipient(&rid("u1"))
        .await
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(mine, vec![pid("a"), pid("c")]);
    assert_eq!(registry.list_for_recipient(&rid("u2")).await.len(), 1);
}

#[tokio::test]
async fn replace_set_ignores_duplicate_candidates() {
    let registry = Registry::in_memory();
    let candidates = vec![info("a"), info("a")];
    registry
        .replace_set(&[pid("a")], &candidates, Some(&rid("u1")))
        .await
        .unwrap();
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn replace_set_without_recipient_leaves_owned_entries() {
    let registry = Registry::in_memory();
    registry.upsert(info("p1"), None).await.unwrap();
    registry.upsert(info("p2"), Some(rid("u1"))).await.unwrap();

    registry.replace_set(&[], &[], None).await.unwrap();

    let entries = registry.list().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, pid("p2"));
}

// ── update_metadata ─────────────────────────────────────────────

#[tokio::test]
async fn update_metadata_touches_every_entry_for_playlist() {
    let registry = Registry::in_memory();
    registry.upsert(info("p1"), Some(rid("u1"))).await.unwrap();
    registry.upsert(info("p1"), Some(rid("u2"))).await.unwrap();
    registry.upsert(info("p2"), Some(rid("u1"))).await.unwrap();

    let fresh = PlaylistInfo::new(pid("p1"), "Renamed", 42);
    assert_eq!(registry.update_metadata(&fresh).await.unwrap(), 2);
    assert_eq!(registry.update_metadata(&fresh).await.unwrap(), 0);

    for entry in registry.list().await {
        if entry.id == pid("p1") {
            assert_eq!(entry.name, "Renamed");
            assert_eq!(entry.track_count, 42);
        } else {
            assert_eq!(entry.name, "Playlist p2");
        }
    }
}

// ── Persistence ─────────────────────────────────────────────────

#[tokio::test]
async fn open_creates_empty_document() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(REGISTRY_FILE_NAME);
    let registry = Registry::open(&path).await.unwrap();

    assert!(registry.is_empty().await);
    assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
}

#[tokio::test]
async fn entries_survive_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(REGISTRY_FILE_NAME);
    {
        let registry = Registry::open(&path).await.unwrap();
        registry.upsert(info("p1"), Some(rid("u1"))).await.unwrap();
        registry.upsert(info("p2"), None).await.unwrap();
    }

    let reopened = Registry::open(&path).await.unwrap();
    let entries = reopened.list().await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].recipient, Some(rid("u1")));
    assert_eq!(entries[1].recipient, None);
}

#[tokio::test]
async fn malformed_document_opens_empty_and_is_repaired() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(REGISTRY_FILE_NAME);
    std::fs::write(&path, "[{ broken").unwrap();

    let registry = Registry::open(&path).await.unwrap();
    assert!(registry.is_empty().await);

    registry.upsert(info("p1"), None).await.unwrap();
    let reopened = Registry::open(&path).await.unwrap();
    assert_eq!(reopened.len().await, 1);
}

#[tokio::test]
async fn duplicate_entries_in_document_are_collapsed() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(REGISTRY_FILE_NAME);
    std::fs::write(
        &path,
        r#"[
            {"id": "p1", "name": "A", "track_count": 1, "user_id": "u1"},
            {"id": "p1", "name": "A", "track_count": 1, "user_id": "u1"},
            {"id": "p1", "name": "A", "track_count": 1}
        ]"#,
    )
    .unwrap();

    let registry = Registry::open(&path).await.unwrap();
    assert_eq!(registry.len().await, 2);
}

#[tokio::test]
async fn failed_write_leaves_registry_unchanged() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("data");
    let registry = Registry::open(dir.join(REGISTRY_FILE_NAME)).await.unwrap();
    registry.upsert(info("p1"), None).await.unwrap();

    std::fs::remove_dir_all(&dir).unwrap();
    std::fs::write(&dir, "not a directory").unwrap();

    assert!(registry.upsert(info("p2"), Some(rid("u1"))).await.is_err());
    assert!(registry.remove(&pid("p1"), None).await.is_err());

    let entries = registry.list().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, pid("p1"));
}
