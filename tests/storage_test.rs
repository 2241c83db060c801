//! Storage-level tests against a temporary SQLite database.

use chrono::DateTime;
use taskd::storage::Storage;
use taskd::tasks::{NewTask, TaskPatch, TaskStatus};
use tempfile::TempDir;

async fn open_storage(dir: &TempDir) -> Storage {
    let url = format!("sqlite://{}", dir.path().join("tasks.db").display());
    Storage::connect(&url).await.unwrap()
}

fn new_task(title: &str, status: TaskStatus) -> NewTask {
    NewTask {
        title: title.to_string(),
        description: None,
        status,
    }
}

#[tokio::test]
async fn create_assigns_id_and_equal_timestamps() {
    let dir = TempDir::new().unwrap();
    let storage = open_storage(&dir).await;

    let task = storage
        .create_task(&NewTask {
            title: "Test Task".to_string(),
            description: Some("Test Description".to_string()),
            status: TaskStatus::Todo,
        })
        .await
        .unwrap();

    assert!(task.id > 0);
    assert_eq!(task.title, "Test Task");
    assert_eq!(task.description.as_deref(), Some("Test Description"));
    assert_eq!(task.status, TaskStatus::Todo);
    assert_eq!(task.created_at, task.updated_at);
    DateTime::parse_from_rfc3339(&task.created_at).unwrap();
}

#[tokio::test]
async fn created_ids_are_distinct_and_increasing() {
    let dir = TempDir::new().unwrap();
    let storage = open_storage(&dir).await;

    let first = storage
        .create_task(&new_task("first", TaskStatus::Todo))
        .await
        .unwrap();
    let second = storage
        .create_task(&new_task("second", TaskStatus::Todo))
        .await
        .unwrap();
    assert!(second.id > first.id);
}

#[tokio::test]
async fn ids_are_not_reused_after_delete() {
    let dir = TempDir::new().unwrap();
    let storage = open_storage(&dir).await;

    let first = storage
        .create_task(&new_task("first", TaskStatus::Todo))
        .await
        .unwrap();
    assert!(storage.delete_task(first.id).await.unwrap());

    let second = storage
        .create_task(&new_task("second", TaskStatus::Todo))
        .await
        .unwrap();
    assert!(second.id > first.id);
}

#[tokio::test]
async fn get_unknown_id_returns_none() {
    let dir = TempDir::new().unwrap();
    let storage = open_storage(&dir).await;

    assert!(storage.get_task(9999).await.unwrap().is_none());
}

#[tokio::test]
async fn list_orders_by_id_and_filters_by_status() {
    let dir = TempDir::new().unwrap();
    let storage = open_storage(&dir).await;

    storage
        .create_task(&new_task("a", TaskStatus::Todo))
        .await
        .unwrap();
    storage
        .create_task(&new_task("b", TaskStatus::InProgress))
        .await
        .unwrap();
    storage
        .create_task(&new_task("c", TaskStatus::Todo))
        .await
        .unwrap();

    let all = storage.list_tasks(None).await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|pair| pair[0].id < pair[1].id));

    let todo = storage.list_tasks(Some(TaskStatus::Todo)).await.unwrap();
    assert_eq!(todo.len(), 2);
    assert!(todo.iter().all(|t| t.status == TaskStatus::Todo));

    let completed = storage
        .list_tasks(Some(TaskStatus::Completed))
        .await
        .unwrap();
    assert!(completed.is_empty());
}

#[tokio::test]
async fn update_applies_only_patched_fields() {
    let dir = TempDir::new().unwrap();
    let storage = open_storage(&dir).await;

    let task = storage
        .create_task(&NewTask {
            title: "Test Task".to_string(),
            description: Some("Test Description".to_string()),
            status: TaskStatus::Todo,
        })
        .await
        .unwrap();

    let patch = TaskPatch {
        status: Some(TaskStatus::InProgress),
        ..TaskPatch::default()
    };
    let updated = storage.update_task(task.id, &patch).await.unwrap().unwrap();

    assert_eq!(updated.title, "Test Task");
    assert_eq!(updated.description.as_deref(), Some("Test Description"));
    assert_eq!(updated.status, TaskStatus::InProgress);
    assert_eq!(updated.created_at, task.created_at);

    let created = DateTime::parse_from_rfc3339(&updated.created_at).unwrap();
    let refreshed = DateTime::parse_from_rfc3339(&updated.updated_at).unwrap();
    assert!(refreshed >= created);
}

#[tokio::test]
async fn update_clears_description_on_explicit_null() {
    let dir = TempDir::new().unwrap();
    let storage = open_storage(&dir).await;

    let task = storage
        .create_task(&NewTask {
            title: "Test Task".to_string(),
            description: Some("Test Description".to_string()),
            status: TaskStatus::Todo,
        })
        .await
        .unwrap();

    let patch = TaskPatch {
        description: Some(None),
        ..TaskPatch::default()
    };
    let updated = storage.update_task(task.id, &patch).await.unwrap().unwrap();
    assert!(updated.description.is_none());
    assert_eq!(updated.title, "Test Task");
}

#[tokio::test]
async fn update_unknown_id_returns_none() {
    let dir = TempDir::new().unwrap();
    let storage = open_storage(&dir).await;

    let patch = TaskPatch {
        title: Some("renamed".to_string()),
        ..TaskPatch::default()
    };
    assert!(storage.update_task(9999, &patch).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_then_get_returns_none() {
    let dir = TempDir::new().unwrap();
    let storage = open_storage(&dir).await;

    let task = storage
        .create_task(&new_task("doomed", TaskStatus::Todo))
        .await
        .unwrap();

    assert!(storage.delete_task(task.id).await.unwrap());
    assert!(storage.get_task(task.id).await.unwrap().is_none());
    // Second delete finds nothing.
    assert!(!storage.delete_task(task.id).await.unwrap());
}
