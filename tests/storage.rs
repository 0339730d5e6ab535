//! JSON file persistence.

use time::{Duration, OffsetDateTime};

use bailiff::domain::moderation::{
    Infraction, InfractionKind, TemporaryInfraction, TemporaryInfractionKind,
};
use bailiff::domain::user::RecordCollection;
use bailiff::infra::storage::{JsonFileStore, RecordPersistence};

fn sample_records() -> RecordCollection {
    let mut records = RecordCollection::new();
    let first = records.request_infraction_id().unwrap();
    let second = records.request_infraction_id().unwrap();

    let user = records.get_or_create(42);
    user.infractions.push(
        Infraction::new(first, InfractionKind::Warning, 7)
            .with_description("spam")
            .with_additional_info("first offence"),
    );
    user.infractions
        .push(Infraction::new(second, InfractionKind::Kick, 7).with_description("spam again"));
    user.set_temporary_infraction(TemporaryInfraction::new(
        TemporaryInfractionKind::Mute,
        OffsetDateTime::now_utc() + Duration::hours(1),
    ));
    records
}

#[tokio::test]
async fn missing_file_loads_empty_collection() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("users.json"));

    let mut records = store.load().await.unwrap();

    assert!(records.users().is_empty());
    assert_eq!(records.request_infraction_id().unwrap(), 1);
}

#[tokio::test]
async fn saved_collection_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("nested").join("users.json"));
    let records = sample_records();

    store.save(&records).await.unwrap();
    let loaded = store.load().await.unwrap();

    assert_eq!(loaded.users().len(), 1);
    let user = loaded.get(42).unwrap();
    assert_eq!(user.infractions.len(), 2);
    assert_eq!(user.infractions[0].description, "spam");
    assert_eq!(
        user.infractions[0].additional_info.as_deref(),
        Some("first offence")
    );
    assert!(user
        .temporary_infraction(TemporaryInfractionKind::Mute)
        .is_some());
    assert!(!dir.path().join("nested").join("users.json.tmp").exists());
}

#[tokio::test]
async fn counter_survives_deleting_the_highest_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("users.json"));
    let mut records = sample_records();
    records.remove_infraction(2).unwrap();

    store.save(&records).await.unwrap();
    let mut loaded = store.load().await.unwrap();

    assert_eq!(loaded.request_infraction_id().unwrap(), 3);
}

#[tokio::test]
async fn corrupt_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.json");
    std::fs::write(&path, b"{ not json").unwrap();

    let err = JsonFileStore::new(&path).load().await.unwrap_err();
    assert!(err.to_string().contains("invalid user data"));
}

#[tokio::test]
async fn stored_id_without_successor_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.json");
    let body = r#"{"users":[{"id":3,"infractions":[{"id":18446744073709551615,"kind":"warning",
        "moderator_id":1,"description":"x","additional_info":null,
        "created_at":"2024-01-01T00:00:00Z"}]}]}"#;
    std::fs::write(&path, body).unwrap();

    let err = JsonFileStore::new(&path).load().await.unwrap_err();
    assert!(err.to_string().contains("invalid user data"));
    assert!(err.to_string().contains("has no successor"));
}
