//! Repository dispatch layer over the in-memory backend.

mod common;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use common::{ticket, ticket_entity_mapper};
use tablekit::store::{MemoryTableClient, StoreError, TableClient};
use tablekit::{MapperRegistry, RepoError, TableRepository, member};

fn repo(client: &Arc<MemoryTableClient>) -> TableRepository<common::Ticket> {
    let registry = Arc::new(MapperRegistry::new());
    let mapper = ticket_entity_mapper(registry);
    let client: Arc<dyn TableClient> = client.clone();
    TableRepository::new("tickets", client, mapper)
}

#[tokio::test]
async fn create_then_get_round_trips() {
    let client = Arc::new(MemoryTableClient::new());
    let repo = repo(&client);
    let cancel = CancellationToken::new();

    let original = ticket("acme", "t-1", "active", 4);
    repo.create(&original, cancel.clone()).await.unwrap();

    let loaded = repo.get("acme", "t-1", cancel).await.unwrap();
    assert_eq!(loaded, original);
}

#[tokio::test]
async fn load_of_a_missing_key_pair_is_none_not_an_error() {
    let client = Arc::new(MemoryTableClient::new());
    let repo = repo(&client);
    let cancel = CancellationToken::new();

    let found = repo.load("acme", "missing", cancel.clone()).await.unwrap();
    assert!(found.is_none());

    let err = repo.get("acme", "missing", cancel).await.unwrap_err();
    assert!(matches!(
        err,
        RepoError::EntityNotFound { partition_key, row_key }
            if partition_key == "acme" && row_key == "missing"
    ));
}

#[tokio::test]
async fn create_twice_surfaces_the_backend_conflict() {
    let client = Arc::new(MemoryTableClient::new());
    let repo = repo(&client);
    let cancel = CancellationToken::new();

    let t = ticket("acme", "t-1", "active", 1);
    repo.create(&t, cancel.clone()).await.unwrap();
    let err = repo.create(&t, cancel).await.unwrap_err();
    assert!(matches!(
        err,
        RepoError::Store(StoreError::AlreadyExists { .. })
    ));
}

#[tokio::test]
async fn update_replaces_the_stored_entity() {
    let client = Arc::new(MemoryTableClient::new());
    let repo = repo(&client);
    let cancel = CancellationToken::new();

    let mut t = ticket("acme", "t-1", "active", 1);
    repo.create(&t, cancel.clone()).await.unwrap();

    t.status = "closed".to_owned();
    t.priority = 9;
    repo.update(&t, cancel.clone()).await.unwrap();

    let loaded = repo.get("acme", "t-1", cancel).await.unwrap();
    assert_eq!(loaded.status, "closed");
    assert_eq!(loaded.priority, 9);
}

#[tokio::test]
async fn update_of_a_missing_entity_is_entity_not_found() {
    let client = Arc::new(MemoryTableClient::new());
    let repo = repo(&client);
    let cancel = CancellationToken::new();

    let t = ticket("acme", "ghost", "active", 1);
    let err = repo.update(&t, cancel).await.unwrap_err();
    assert!(matches!(err, RepoError::EntityNotFound { .. }));
}

#[tokio::test]
async fn delete_removes_and_repeat_delete_is_entity_not_found() {
    let client = Arc::new(MemoryTableClient::new());
    let repo = repo(&client);
    let cancel = CancellationToken::new();

    let t = ticket("acme", "t-1", "active", 1);
    repo.create(&t, cancel.clone()).await.unwrap();

    repo.delete(&t, cancel.clone()).await.unwrap();
    assert!(repo.load("acme", "t-1", cancel.clone()).await.unwrap().is_none());

    let err = repo.delete(&t, cancel).await.unwrap_err();
    assert!(matches!(err, RepoError::EntityNotFound { .. }));
}

#[tokio::test]
async fn concurrent_modification_surfaces_the_token_conflict() {
    let client = Arc::new(MemoryTableClient::new());
    let repo_a = repo(&client);
    let repo_b = repo(&client);
    let cancel = CancellationToken::new();

    let mut t = ticket("acme", "t-1", "active", 1);
    repo_a.create(&t, cancel.clone()).await.unwrap();

    // repo_b modifies behind repo_a's back, so repo_a's cached token is stale
    let mut theirs = repo_b.get("acme", "t-1", cancel.clone()).await.unwrap();
    theirs.priority = 5;
    repo_b.update(&theirs, cancel.clone()).await.unwrap();

    t.priority = 2;
    let err = repo_a.update(&t, cancel.clone()).await.unwrap_err();
    assert!(matches!(
        err,
        RepoError::Store(StoreError::EtagMismatch { .. })
    ));

    // the stale token was evicted; a fresh attempt re-reads and succeeds
    repo_a.update(&t, cancel.clone()).await.unwrap();
    let loaded = repo_a.get("acme", "t-1", cancel).await.unwrap();
    assert_eq!(loaded.priority, 2);
}

#[tokio::test]
async fn find_first_translates_and_applies_the_predicate() {
    let client = Arc::new(MemoryTableClient::new());
    let repo = repo(&client);
    let cancel = CancellationToken::new();

    for (id, status, priority) in [("a", "open", 1), ("b", "closed", 5), ("c", "open", 9)] {
        repo.create(&ticket("acme", id, status, priority), cancel.clone())
            .await
            .unwrap();
    }

    let found = repo
        .find_first(
            &member("status").eq("open").and(member("priority").ge(5)),
            cancel.clone(),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, "c");

    let none = repo
        .find_first(&member("status").eq("archived"), cancel)
        .await
        .unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn untranslatable_predicate_fails_closed_without_querying() {
    let client = Arc::new(MemoryTableClient::new());
    let repo = repo(&client);
    let cancel = CancellationToken::new();

    let err = repo
        .find_first(&member("payload").eq("x"), cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Query(_)));
}

#[tokio::test]
async fn list_drains_every_matching_entity() {
    let client = Arc::new(MemoryTableClient::new());
    let repo = repo(&client);
    let cancel = CancellationToken::new();

    for i in 0..10 {
        repo.create(
            &ticket("acme", &format!("t-{i}"), if i % 2 == 0 { "open" } else { "closed" }, i),
            cancel.clone(),
        )
        .await
        .unwrap();
    }

    let all = repo.list(None, cancel.clone()).await.unwrap();
    assert_eq!(all.len(), 10);

    let open = repo
        .list(Some(&member("status").eq("open")), cancel)
        .await
        .unwrap();
    assert_eq!(open.len(), 5);
    assert!(open.iter().all(|t| t.status == "open"));
}

#[tokio::test]
async fn page_walks_the_collection_with_continuations() {
    let client = Arc::new(MemoryTableClient::new());
    let repo = repo(&client);
    let cancel = CancellationToken::new();

    for id in ["a", "b", "c", "d", "e"] {
        repo.create(&ticket("acme", id, "open", 1), cancel.clone())
            .await
            .unwrap();
    }

    let mut ids = Vec::new();
    let mut token: Option<String> = None;
    loop {
        let page = repo
            .page(None, Some(2), token.as_deref(), cancel.clone())
            .await
            .unwrap();
        assert!(page.items.len() <= 2);
        ids.extend(page.items.iter().map(|t| t.id.clone()));
        match page.continuation {
            Some(next) => token = Some(next),
            None => break,
        }
    }
    assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
}
