use anyhow::Result;
use checkin_core::{Employee, Task};
use checkin_storage::{collections, DocumentStore, LocalFileStore, MemoryDocumentStore};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

fn sample_employee(id: &str) -> Employee {
    Employee {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        display_name: "Ada".to_string(),
        department: None,
        is_active: true,
        created_at: Utc::now(),
        last_update_at: None,
    }
}

#[tokio::test]
async fn local_store_round_trips_documents() -> Result<()> {
    let root = tempfile::tempdir()?;
    let store = LocalFileStore::new(root.path().join("store"))?;

    store.set("employees", "users/42", &json!({"id": "users/42"})).await?;
    let doc = store.get("employees", "users/42").await?;
    assert_eq!(doc.unwrap()["id"], "users/42");

    assert!(store.get("employees", "nobody").await?.is_none());
    assert!(store.list("projects").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn typed_helpers_skip_malformed_documents() -> Result<()> {
    let root = tempfile::tempdir()?;
    let store: Arc<dyn DocumentStore> = Arc::new(LocalFileStore::new(root.path())?);

    let employee = sample_employee("u1");
    store.put(collections::EMPLOYEES, &employee.id, &employee).await?;
    store.set(collections::EMPLOYEES, "broken", &json!({"id": 7})).await?;

    let loaded: Vec<Employee> = store.load_all(collections::EMPLOYEES).await?;
    assert_eq!(loaded, vec![employee.clone()]);

    let fetched: Option<Employee> = store.fetch(collections::EMPLOYEES, "u1").await?;
    assert_eq!(fetched, Some(employee));
    Ok(())
}

#[tokio::test]
async fn memory_store_lists_per_collection() -> Result<()> {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());

    let tasks: Vec<Task> = store.load_all(collections::TASKS).await?;
    assert!(tasks.is_empty());

    store.put(collections::EMPLOYEES, "u1", &sample_employee("u1")).await?;
    store.put(collections::EMPLOYEES, "u2", &sample_employee("u2")).await?;
    assert_eq!(store.list(collections::EMPLOYEES).await?.len(), 2);
    assert!(store.list(collections::UPDATES).await?.is_empty());
    Ok(())
}
