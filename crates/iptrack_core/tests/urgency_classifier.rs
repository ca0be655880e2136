use chrono::{Days, NaiveDate};
use iptrack_core::{
    AssetId, Deadline, DeadlineKind, EngineConfig, UrgencyClassifier, UrgencyThresholds,
    UrgencyTier,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 2, 8).unwrap()
}

fn deadline_due_in(days: i64) -> Deadline {
    let due = if days >= 0 {
        today() + Days::new(days as u64)
    } else {
        today() - Days::new(days.unsigned_abs())
    };
    Deadline::new(
        AssetId::parse("IP-2024-001").unwrap(),
        DeadlineKind::Renewal,
        "Renewal",
        due,
    )
    .unwrap()
}

#[test]
fn due_in_seven_days_is_urgent_with_partial_progress() {
    let result = UrgencyClassifier::default().classify(&deadline_due_in(7), today());

    assert_eq!(result.days_left, 7);
    assert_eq!(result.tier, UrgencyTier::Urgent);
    assert!((result.progress - 23.0 / 30.0).abs() < 1e-9);
}

#[test]
fn overdue_by_five_days_is_urgent_and_complete() {
    let result = UrgencyClassifier::default().classify(&deadline_due_in(-5), today());

    assert_eq!(result.days_left, -5);
    assert_eq!(result.tier, UrgencyTier::Urgent);
    assert_eq!(result.progress, 1.0);
}

#[test]
fn due_in_forty_five_days_is_not_reportable() {
    let classifier = UrgencyClassifier::default();
    let result = classifier.classify(&deadline_due_in(45), today());

    assert_eq!(result.tier, UrgencyTier::Success);
    assert_eq!(result.progress, 0.0);
    assert!(!classifier.is_reportable(result.days_left));
}

#[test]
fn due_today_is_urgent_and_complete() {
    let result = UrgencyClassifier::default().classify(&deadline_due_in(0), today());

    assert_eq!(result.days_left, 0);
    assert_eq!(result.tier, UrgencyTier::Urgent);
    assert_eq!(result.progress, 1.0);
}

#[test]
fn classification_is_deterministic() {
    let classifier = UrgencyClassifier::default();
    let deadline = deadline_due_in(12);
    assert_eq!(
        classifier.classify(&deadline, today()),
        classifier.classify(&deadline, today())
    );
}

#[test]
fn classifier_follows_loaded_configuration() {
    let config = EngineConfig::from_json_str(
        r#"{"thresholds": {"urgent_days": 3, "warning_days": 10, "info_days": 60}}"#,
    )
    .unwrap();
    let classifier = UrgencyClassifier::new(config.thresholds);

    assert_eq!(classifier.classify(&deadline_due_in(5), today()).tier, UrgencyTier::Warning);
    assert_eq!(classifier.classify(&deadline_due_in(45), today()).tier, UrgencyTier::Info);
    assert_eq!(
        classifier.thresholds(),
        &UrgencyThresholds::new(3, 10, 60).unwrap()
    );
}
