use revision_core::model::{RoundData, SubjectKey, TOTAL_ROUNDS, empty_rounds};
use storage::repository::{
    NewRowRecord, NewSubjectRecord, RowRepository, StorageError, SubjectRepository,
};
use storage::sqlite::SqliteRepository;

fn new_subject(label: &str, icon: &str, sort_order: usize) -> NewSubjectRecord {
    NewSubjectRecord {
        key: SubjectKey::derive(label),
        label: label.to_owned(),
        icon: icon.to_owned(),
        sort_order,
    }
}

#[tokio::test]
async fn sqlite_roundtrip_persists_subjects_and_rows() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let subject_id = repo
        .insert_new_subject(new_subject("Chemistry", "⚗️", 0))
        .await
        .unwrap();

    let mut rounds = empty_rounds();
    rounds[0].mcq = true;
    rounds[3].essay = true;
    let row_id = repo
        .insert_new_row(NewRowRecord {
            subject_id,
            name: "2015".to_owned(),
            rounds: rounds.clone(),
            sort_order: 0,
        })
        .await
        .unwrap();

    let subjects = repo.list_subjects().await.unwrap();
    assert_eq!(subjects.len(), 1);
    assert_eq!(subjects[0].id, subject_id);
    assert_eq!(subjects[0].key.as_str(), "chemistry");
    assert_eq!(subjects[0].label, "Chemistry");

    let rows = repo.list_rows().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, row_id);
    assert_eq!(rows[0].subject_id, subject_id);
    assert_eq!(rows[0].rounds, rounds);
}

#[tokio::test]
async fn sqlite_lists_by_sort_order_and_updates_in_place() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_updates?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let subject_id = repo
        .insert_new_subject(new_subject("Physics", "⚛️", 0))
        .await
        .unwrap();

    let ids = repo
        .insert_new_rows(vec![
            NewRowRecord {
                subject_id,
                name: "2016".to_owned(),
                rounds: empty_rounds(),
                sort_order: 1,
            },
            NewRowRecord {
                subject_id,
                name: "2015".to_owned(),
                rounds: empty_rounds(),
                sort_order: 0,
            },
        ])
        .await
        .unwrap();
    assert_eq!(ids.len(), 2);

    let rows = repo.list_rows().await.unwrap();
    assert_eq!(rows[0].name, "2015");
    assert_eq!(rows[1].name, "2016");

    repo.update_row_name(ids[0], "2016 revised").await.unwrap();
    let mut rounds = empty_rounds();
    rounds[7].essay = true;
    repo.update_row_rounds(ids[0], &rounds).await.unwrap();

    repo.update_subject(subject_id, "Physics II", "🔭")
        .await
        .unwrap();

    let rows = repo.list_rows().await.unwrap();
    let updated = rows.iter().find(|r| r.id == ids[0]).unwrap();
    assert_eq!(updated.name, "2016 revised");
    assert!(updated.rounds[7].essay);

    let subjects = repo.list_subjects().await.unwrap();
    assert_eq!(subjects[0].label, "Physics II");
    assert_eq!(subjects[0].icon, "🔭");
    // key is immutable through label edits
    assert_eq!(subjects[0].key.as_str(), "physics");
}

#[tokio::test]
async fn sqlite_rejects_duplicate_subject_key() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_conflict?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.insert_new_subject(new_subject("Chemistry", "⚗️", 0))
        .await
        .unwrap();
    let err = repo
        .insert_new_subject(new_subject("Chemistry", "📘", 1))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_delete_subject_cascades_to_rows() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_cascade?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let subject_id = repo
        .insert_new_subject(new_subject("Chemistry", "⚗️", 0))
        .await
        .unwrap();
    repo.insert_new_row(NewRowRecord {
        subject_id,
        name: "2015".to_owned(),
        rounds: empty_rounds(),
        sort_order: 0,
    })
    .await
    .unwrap();

    repo.delete_subject(subject_id).await.unwrap();

    assert!(repo.list_subjects().await.unwrap().is_empty());
    assert!(repo.list_rows().await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_reads_malformed_rounds_leniently() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_lenient?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let subject_id = repo
        .insert_new_subject(new_subject("Chemistry", "⚗️", 0))
        .await
        .unwrap();

    // Write a corrupt rounds column directly, bypassing the repository.
    sqlx::query(
        "INSERT INTO practice_rows (id, subject_id, name, rounds, sort_order) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind("8c1d2f30-aa11-4e2b-9b7c-0f6e5d4c3b2a")
    .bind(subject_id.to_string())
    .bind("2015")
    .bind("this is not json")
    .bind(0_i64)
    .execute(repo.pool())
    .await
    .unwrap();

    let rows = repo.list_rows().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].rounds.is_empty());
}

#[tokio::test]
async fn sqlite_round_lengths_survive_unchanged() {
    // The store keeps whatever length it is given; normalization to
    // TOTAL_ROUNDS happens in the engine, not the adapter.
    let repo = SqliteRepository::connect("sqlite:file:memdb_lengths?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let subject_id = repo
        .insert_new_subject(new_subject("Chemistry", "⚗️", 0))
        .await
        .unwrap();
    repo.insert_new_row(NewRowRecord {
        subject_id,
        name: "legacy".to_owned(),
        rounds: vec![RoundData::default(); 3],
        sort_order: 0,
    })
    .await
    .unwrap();

    let rows = repo.list_rows().await.unwrap();
    assert_eq!(rows[0].rounds.len(), 3);
    assert_ne!(rows[0].rounds.len(), TOTAL_ROUNDS);
}
