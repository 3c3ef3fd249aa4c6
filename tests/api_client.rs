//! Tests against a live API.
//! They are ignored by default, run them with `cargo test -- --ignored` once `DESKBOOK_*` variables point to a test account.

use chrono::{Duration, Utc};

use deskbook::config::ClientConfig;
use deskbook::traits::{ReservationStore, TaskStore};
use deskbook::{Client, ReservationDraft, Scheduler};

fn client() -> Client {
    let config = ClientConfig::from_env().unwrap();
    Client::new(&config).unwrap()
}

#[tokio::test]
#[ignore]
async fn test_reservation_round_trip() {
    let _ = env_logger::builder().is_test(true).try_init();

    let client = client();
    let start = Utc::now() + Duration::days(30);
    let draft = ReservationDraft {
        title: "deskbook test".to_string(),
        start,
        end: start + Duration::hours(1),
        comment: String::new(),
    };
    let id = client.create_reservation(&draft).await.unwrap();

    let listed = client.list_reservations().await.unwrap();
    assert!(listed.iter().any(|r| r.id.as_ref() == Some(&id) && r.title == "deskbook test"));

    let mut moved = draft.clone();
    moved.comment = "moved".to_string();
    client.update_reservation(&id, &moved).await.unwrap();
    client.delete_reservation(&id).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_scheduler_load() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut scheduler = Scheduler::new(client());
    let count = scheduler.load().await.unwrap();
    deskbook::utils::print_cache(scheduler.cache());
    assert_eq!(count, scheduler.cache().len());
}

#[tokio::test]
#[ignore]
async fn test_tasks() {
    let _ = env_logger::builder().is_test(true).try_init();

    let client = client();
    let task = client.create_task("deskbook test").await.unwrap();
    assert!(client.list_tasks().await.unwrap().iter().any(|t| t.id() == task.id()));
    client.delete_task(task.id()).await.unwrap();
}
