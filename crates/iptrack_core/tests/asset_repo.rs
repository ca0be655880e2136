use chrono::NaiveDate;
use iptrack_core::db::{open_db, open_db_in_memory};
use iptrack_core::{
    generate, Asset, AssetId, AssetKind, AssetListQuery, AssetRepository, AssetStatus, Deadline,
    DeadlineDraft, DeadlineKind, InMemoryAssetRepository, Jurisdiction, NewAsset, NotFoundError,
    Priority, RepoError, SqliteAssetRepository, UrgencyClassifier, ValidationError,
};
use std::collections::BTreeSet;
use std::thread;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn new_asset(kind: AssetKind, title: &str) -> NewAsset {
    NewAsset {
        kind,
        title: title.to_string(),
        description: String::new(),
        status: AssetStatus::Draft,
        priority: Priority::Medium,
        jurisdictions: BTreeSet::new(),
        filing_date: None,
        expiry_date: None,
        owners: Default::default(),
        application_number: None,
        documents: Vec::new(),
        deadlines: vec![DeadlineDraft::new(
            DeadlineKind::Renewal,
            "Renewal",
            date(2024, 2, 15),
        )],
        lookback_days: 30,
    }
}

fn filed_asset(id: &str, kind: AssetKind) -> Asset {
    let id = AssetId::parse(id).unwrap();
    let mut asset = Asset::new(id.clone(), kind, format!("Asset {id}"));
    asset.status = AssetStatus::Filed;
    asset.jurisdictions.insert(Jurisdiction::parse("US").unwrap());
    asset
        .push_deadline(
            Deadline::new(id, DeadlineKind::MaintenanceFee, "Maintenance Fee", date(2024, 3, 1))
                .unwrap(),
        )
        .unwrap();
    asset
}

fn allocates_sequential_ids_per_year(repo: &dyn AssetRepository) {
    let first = repo.create_asset(new_asset(AssetKind::Patent, "First"), 2024).unwrap();
    let second = repo.create_asset(new_asset(AssetKind::Design, "Second"), 2024).unwrap();
    let other_year = repo.create_asset(new_asset(AssetKind::Trademark, "Third"), 2025).unwrap();

    assert_eq!(first.id.as_str(), "IP-2024-001");
    assert_eq!(second.id.as_str(), "IP-2024-002");
    assert_eq!(other_year.id.as_str(), "IP-2025-001");
    assert_eq!(first.deadlines[0].asset_id, first.id);
    assert_eq!(first.deadlines[0].window_start, date(2024, 1, 16));
}

fn import_advances_sequence(repo: &dyn AssetRepository) {
    repo.insert_asset(filed_asset("IP-2024-041", AssetKind::Patent)).unwrap();
    let created = repo.create_asset(new_asset(AssetKind::Patent, "Next"), 2024).unwrap();
    assert_eq!(created.id.as_str(), "IP-2024-042");

    let err = repo
        .insert_asset(filed_asset("IP-2024-041", AssetKind::Design))
        .unwrap_err();
    assert!(matches!(err, RepoError::AlreadyExists(_)));
}

fn failed_create_does_not_consume_an_id(repo: &dyn AssetRepository) {
    let mut invalid = new_asset(AssetKind::Patent, "Filed without office");
    invalid.status = AssetStatus::Filed;
    let err = repo.create_asset(invalid, 2024).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::MissingJurisdiction { .. })
    ));

    let created = repo.create_asset(new_asset(AssetKind::Patent, "Valid"), 2024).unwrap();
    assert_eq!(created.id.as_str(), "IP-2024-001");
}

fn listing_keeps_insertion_order_and_hides_archived(repo: &dyn AssetRepository) {
    for id in ["IP-2024-003", "IP-2023-045", "IP-2024-001"] {
        repo.insert_asset(filed_asset(id, AssetKind::Patent)).unwrap();
    }
    let id = AssetId::parse("IP-2023-045").unwrap();
    repo.update_with(&id, &mut |asset| {
        asset.status = AssetStatus::Archived;
        Ok(())
    })
    .unwrap();

    let visible: Vec<String> = repo
        .list_assets(&AssetListQuery::default())
        .unwrap()
        .into_iter()
        .map(|asset| asset.id.to_string())
        .collect();
    assert_eq!(visible, vec!["IP-2024-003", "IP-2024-001"]);

    let all = repo.snapshot().unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[1].status, AssetStatus::Archived);
}

fn resolve_is_monotonic_and_archived_is_frozen(repo: &dyn AssetRepository) {
    let asset = filed_asset("IP-2024-001", AssetKind::Patent);
    let deadline_id = asset.deadlines[0].id;
    repo.insert_asset(asset).unwrap();
    let id = AssetId::parse("IP-2024-001").unwrap();

    assert!(repo.resolve_deadline(&id, deadline_id).unwrap());
    assert!(!repo.resolve_deadline(&id, deadline_id).unwrap());
    assert!(repo.require_asset(&id).unwrap().deadlines[0].is_resolved());

    let missing = uuid::Uuid::new_v4();
    let err = repo.resolve_deadline(&id, missing).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound(NotFoundError::Deadline { .. })
    ));

    let mut edited = repo.require_asset(&id).unwrap();
    edited.status = AssetStatus::Archived;
    repo.update_asset(edited).unwrap();

    let mut frozen = repo.require_asset(&id).unwrap();
    frozen.title = "Renamed".to_string();
    let err = repo.update_asset(frozen).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::ArchivedAsset(_))
    ));
}

fn append_deadline_keeps_order(repo: &dyn AssetRepository) {
    repo.insert_asset(filed_asset("IP-2024-001", AssetKind::Patent)).unwrap();
    let id = AssetId::parse("IP-2024-001").unwrap();

    let appended = repo
        .append_deadline(
            &id,
            DeadlineDraft::new(DeadlineKind::OfficeActionResponse, "Response", date(2024, 1, 5)),
            10,
        )
        .unwrap();
    assert_eq!(appended.window_start, date(2023, 12, 26));

    let stored = repo.require_asset(&id).unwrap();
    assert_eq!(stored.deadlines.len(), 2);
    assert_eq!(stored.deadlines[1].id, appended.id);

    let err = repo
        .append_deadline(
            &AssetId::parse("IP-2099-001").unwrap(),
            DeadlineDraft::new(DeadlineKind::Renewal, "Renewal", date(2024, 1, 5)),
            10,
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(NotFoundError::Asset(_))));
}

fn update_cannot_drop_or_reopen_deadlines(repo: &dyn AssetRepository) {
    repo.insert_asset(filed_asset("IP-2024-001", AssetKind::Patent)).unwrap();
    let id = AssetId::parse("IP-2024-001").unwrap();

    let err = repo
        .update_with(&id, &mut |asset| {
            asset.deadlines.clear();
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::DeadlineRemoved(_))
    ));

    let err = repo
        .update_with(&id, &mut |asset| {
            asset.id = AssetId::parse("IP-2024-777").unwrap();
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::AssetIdChanged { .. })
    ));

    assert_eq!(repo.require_asset(&id).unwrap().deadlines.len(), 1);
}

fn deadline_ids_stay_with_their_owner(repo: &dyn AssetRepository) {
    let first = filed_asset("IP-2024-001", AssetKind::Patent);
    let shared_id = first.deadlines[0].id;
    repo.insert_asset(first).unwrap();

    let mut second = filed_asset("IP-2024-002", AssetKind::Design);
    second.deadlines[0].id = shared_id;
    second.deadlines[0].label = "Design Fee".to_string();
    let err = repo.insert_asset(second).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::DuplicateDeadline(id)) if id == shared_id
    ));
    assert!(repo.get_asset(&AssetId::parse("IP-2024-002").unwrap()).unwrap().is_none());

    repo.insert_asset(filed_asset("IP-2024-003", AssetKind::Trademark)).unwrap();
    let third = AssetId::parse("IP-2024-003").unwrap();
    let mut taken = repo
        .require_asset(&AssetId::parse("IP-2024-001").unwrap())
        .unwrap()
        .deadlines[0]
        .clone();
    taken.asset_id = third.clone();
    taken.label = "Taken".to_string();
    let err = repo
        .update_with(&third, &mut |asset| {
            asset.deadlines.push(taken.clone());
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::DuplicateDeadline(_))
    ));

    let owner = repo
        .require_asset(&AssetId::parse("IP-2024-001").unwrap())
        .unwrap();
    assert_eq!(owner.deadlines.len(), 1);
    assert_eq!(owner.deadlines[0].id, shared_id);
    assert_eq!(owner.deadlines[0].label, "Maintenance Fee");
    assert_eq!(repo.require_asset(&third).unwrap().deadlines.len(), 1);
}

fn dangling_deadline_is_kept_and_reported(repo: &dyn AssetRepository) {
    let mut asset = filed_asset("IP-2024-001", AssetKind::Patent);
    let stray = Deadline::new(
        AssetId::parse("IP-2024-999").unwrap(),
        DeadlineKind::Renewal,
        "Renewal",
        date(2024, 2, 20),
    )
    .unwrap();
    let stray_id = stray.id;
    asset.deadlines.push(stray);
    repo.insert_asset(asset.clone()).unwrap();
    repo.insert_asset(filed_asset("IP-2024-002", AssetKind::Design)).unwrap();

    let stored = repo.require_asset(&asset.id).unwrap();
    assert_eq!(stored, asset);

    let feed = generate(
        &repo.snapshot().unwrap(),
        date(2024, 2, 10),
        &UrgencyClassifier::default(),
    );
    assert_eq!(feed.len(), 2);
    assert_eq!(
        feed.unresolved_references(),
        &[NotFoundError::DanglingDeadline {
            deadline_id: stray_id,
            owner: asset.id.clone(),
            referenced: AssetId::parse("IP-2024-999").unwrap(),
        }]
    );

    let mut foreign = Deadline::new(
        AssetId::parse("IP-2024-777").unwrap(),
        DeadlineKind::Renewal,
        "Renewal",
        date(2024, 4, 1),
    )
    .unwrap();
    foreign.label = "Foreign".to_string();
    let err = repo
        .update_with(&asset.id, &mut |asset| {
            asset.deadlines.push(foreign.clone());
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::DeadlineAssetMismatch { .. })
    ));
}

#[test]
fn memory_allocates_sequential_ids_per_year() {
    allocates_sequential_ids_per_year(&InMemoryAssetRepository::new());
}

#[test]
fn sqlite_allocates_sequential_ids_per_year() {
    let conn = open_db_in_memory().unwrap();
    allocates_sequential_ids_per_year(&SqliteAssetRepository::try_new(&conn).unwrap());
}

#[test]
fn memory_import_advances_sequence() {
    import_advances_sequence(&InMemoryAssetRepository::new());
}

#[test]
fn sqlite_import_advances_sequence() {
    let conn = open_db_in_memory().unwrap();
    import_advances_sequence(&SqliteAssetRepository::try_new(&conn).unwrap());
}

#[test]
fn memory_failed_create_does_not_consume_an_id() {
    failed_create_does_not_consume_an_id(&InMemoryAssetRepository::new());
}

#[test]
fn sqlite_failed_create_does_not_consume_an_id() {
    let conn = open_db_in_memory().unwrap();
    failed_create_does_not_consume_an_id(&SqliteAssetRepository::try_new(&conn).unwrap());
}

#[test]
fn memory_listing_keeps_insertion_order_and_hides_archived() {
    listing_keeps_insertion_order_and_hides_archived(&InMemoryAssetRepository::new());
}

#[test]
fn sqlite_listing_keeps_insertion_order_and_hides_archived() {
    let conn = open_db_in_memory().unwrap();
    listing_keeps_insertion_order_and_hides_archived(
        &SqliteAssetRepository::try_new(&conn).unwrap(),
    );
}

#[test]
fn memory_resolve_is_monotonic_and_archived_is_frozen() {
    resolve_is_monotonic_and_archived_is_frozen(&InMemoryAssetRepository::new());
}

#[test]
fn sqlite_resolve_is_monotonic_and_archived_is_frozen() {
    let conn = open_db_in_memory().unwrap();
    resolve_is_monotonic_and_archived_is_frozen(&SqliteAssetRepository::try_new(&conn).unwrap());
}

#[test]
fn memory_append_deadline_keeps_order() {
    append_deadline_keeps_order(&InMemoryAssetRepository::new());
}

#[test]
fn sqlite_append_deadline_keeps_order() {
    let conn = open_db_in_memory().unwrap();
    append_deadline_keeps_order(&SqliteAssetRepository::try_new(&conn).unwrap());
}

#[test]
fn memory_update_cannot_drop_or_reopen_deadlines() {
    update_cannot_drop_or_reopen_deadlines(&InMemoryAssetRepository::new());
}

#[test]
fn sqlite_update_cannot_drop_or_reopen_deadlines() {
    let conn = open_db_in_memory().unwrap();
    update_cannot_drop_or_reopen_deadlines(&SqliteAssetRepository::try_new(&conn).unwrap());
}

#[test]
fn sqlite_round_trips_every_field_through_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("portfolio.db");

    let mut asset = filed_asset("IP-2024-001", AssetKind::Trademark);
    asset.description = "Word mark".to_string();
    asset.priority = Priority::High;
    asset.jurisdictions.insert(Jurisdiction::parse("EU").unwrap());
    asset.filing_date = Some(date(2023, 6, 20));
    asset.expiry_date = Some(date(2033, 6, 20));
    asset.owners.inventors = vec!["Dr. Sarah Chen".to_string()];
    asset.owners.assignee = Some("TechCorp Inc.".to_string());
    asset.application_number = Some("TM-88123".to_string());
    asset.documents = vec!["specimen.pdf".to_string()];
    asset.deadlines[0].resolve();

    {
        let conn = open_db(&path).unwrap();
        let repo = SqliteAssetRepository::try_new(&conn).unwrap();
        repo.insert_asset(asset.clone()).unwrap();
    }

    let conn = open_db(&path).unwrap();
    let repo = SqliteAssetRepository::try_new(&conn).unwrap();
    let loaded = repo.require_asset(&asset.id).unwrap();
    assert_eq!(loaded, asset);
}

#[test]
fn memory_deadline_ids_stay_with_their_owner() {
    deadline_ids_stay_with_their_owner(&InMemoryAssetRepository::new());
}

#[test]
fn sqlite_deadline_ids_stay_with_their_owner() {
    let conn = open_db_in_memory().unwrap();
    deadline_ids_stay_with_their_owner(&SqliteAssetRepository::try_new(&conn).unwrap());
}

#[test]
fn memory_dangling_deadline_is_kept_and_reported() {
    dangling_deadline_is_kept_and_reported(&InMemoryAssetRepository::new());
}

#[test]
fn sqlite_dangling_deadline_is_kept_and_reported() {
    let conn = open_db_in_memory().unwrap();
    dangling_deadline_is_kept_and_reported(&SqliteAssetRepository::try_new(&conn).unwrap());
}

#[test]
fn memory_import_skips_refused_assets_and_keeps_the_rest() {
    let mut untitled = filed_asset("IP-2024-002", AssetKind::Design);
    untitled.title = "  ".to_string();

    let (repo, rejected) = InMemoryAssetRepository::import(vec![
        filed_asset("IP-2024-001", AssetKind::Patent),
        untitled,
        filed_asset("IP-2024-001", AssetKind::Trademark),
        filed_asset("IP-2024-003", AssetKind::Copyright),
    ]);

    assert_eq!(rejected.len(), 2);
    assert!(matches!(
        rejected[0],
        RepoError::Validation(ValidationError::EmptyTitle)
    ));
    assert!(matches!(rejected[1], RepoError::AlreadyExists(_)));

    let kept: Vec<String> = repo
        .snapshot()
        .unwrap()
        .into_iter()
        .map(|asset| asset.id.to_string())
        .collect();
    assert_eq!(kept, vec!["IP-2024-001", "IP-2024-003"]);
}

#[test]
fn memory_concurrent_creates_allocate_distinct_contiguous_ids() {
    const WORKERS: usize = 8;
    const PER_WORKER: usize = 25;
    let repo = InMemoryAssetRepository::new();

    let mut ids: Vec<AssetId> = thread::scope(|scope| {
        let handles: Vec<_> = (0..WORKERS)
            .map(|worker| {
                let repo = &repo;
                scope.spawn(move || {
                    (0..PER_WORKER)
                        .map(|n| {
                            repo.create_asset(
                                new_asset(AssetKind::Patent, &format!("Worker {worker} #{n}")),
                                2024,
                            )
                            .unwrap()
                            .id
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect()
    });

    ids.sort();
    let expected: Vec<AssetId> = (1..=(WORKERS * PER_WORKER) as u32)
        .map(|sequence| AssetId::from_parts(2024, sequence).unwrap())
        .collect();
    assert_eq!(ids, expected);
    assert_eq!(repo.snapshot().unwrap().len(), WORKERS * PER_WORKER);
}
