use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use studia_core::entity::{Constraint, Goal, GoalStatus, Priority};
use studia_core::plan::DayOfWeek;
use studia_core::traits::{SettingRecord, SyncStore};
use studia_core::VectorClock;
use studia_storage::PlannerStore;

fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
}

#[test]
fn goal_roundtrip_preserves_all_fields() {
    let store = PlannerStore::open_in_memory().unwrap();
    let mut goal = Goal::new("Linear Algebra", 300, Priority::High, t0());
    goal.uuid = Some("g-1".into());
    goal.deadline = Some(Utc.with_ymd_and_hms(2026, 3, 20, 0, 0, 0).unwrap());
    let mut clock = VectorClock::default();
    clock.increment("device-a");
    goal.sync.vector_clock = Some(clock.clone());
    goal.sync.version = Some(3);

    let stored = store.insert_goal(&goal).unwrap();
    assert!(stored.id > 0);

    let loaded = store.load_goals().unwrap();
    assert_eq!(loaded.len(), 1);
    let back = &loaded[0];
    assert_eq!(back.title, "Linear Algebra");
    assert_eq!(back.target_minutes, 300);
    assert_eq!(back.priority, Priority::High);
    assert_eq!(back.status, GoalStatus::Active);
    assert_eq!(back.deadline, goal.deadline);
    assert_eq!(back.sync.version, Some(3));
    assert_eq!(back.sync.vector_clock, Some(clock));
}

#[test]
fn reopening_a_database_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("planner.db");
    {
        let store = PlannerStore::open(&path).unwrap();
        store
            .insert_goal(&Goal::new("Chemistry", 120, Priority::Low, t0()))
            .unwrap();
    }
    let store = PlannerStore::open(&path).unwrap();
    assert_eq!(store.load_goals().unwrap().len(), 1);
}

#[test]
fn delete_leaves_a_tombstone() {
    let store = PlannerStore::open_in_memory().unwrap();
    let stored = store
        .insert_goal(&Goal::new("History", 90, Priority::Medium, t0()))
        .unwrap();

    let later = t0() + chrono::Duration::hours(1);
    store.delete_goal(stored.id, later, "device-a").unwrap();

    let loaded = store.load_goals().unwrap();
    assert_eq!(loaded.len(), 1);
    assert!(loaded[0].sync.is_deleted);
    assert_eq!(loaded[0].sync.updated_at, later);
    assert!(loaded[0].sync.version.unwrap_or(0) >= 1);
}

#[test]
fn upsert_matches_by_uuid_and_inserts_unknowns() {
    let store = PlannerStore::open_in_memory().unwrap();
    let mut local = Goal::new("Physics", 240, Priority::Medium, t0());
    local.uuid = Some("g-phys".into());
    let local = store.insert_goal(&local).unwrap();

    let mut updated = local.clone();
    updated.id = 99; // remote row id differs; uuid is identity
    updated.target_minutes = 360;
    let mut fresh = Goal::new("Biology", 60, Priority::Low, t0());
    fresh.uuid = Some("g-bio".into());

    store.upsert_goals(&[updated, fresh]).unwrap();

    let loaded = store.load_goals().unwrap();
    assert_eq!(loaded.len(), 2);
    let phys = loaded.iter().find(|g| g.uuid.as_deref() == Some("g-phys")).unwrap();
    assert_eq!(phys.id, local.id);
    assert_eq!(phys.target_minutes, 360);
    assert!(loaded.iter().any(|g| g.uuid.as_deref() == Some("g-bio")));
}

#[test]
fn constraint_day_roundtrip() {
    let store = PlannerStore::open_in_memory().unwrap();
    store
        .insert_constraint(&Constraint::new("Gym", 120, Some(DayOfWeek::Tuesday), t0()))
        .unwrap();
    store
        .insert_constraint(&Constraint::new("Chores", 90, None, t0()))
        .unwrap();

    let loaded = store.load_constraints().unwrap();
    assert_eq!(loaded[0].day, Some(DayOfWeek::Tuesday));
    assert_eq!(loaded[1].day, None);
}

#[test]
fn settings_upsert_overwrites_by_key() {
    let store = PlannerStore::open_in_memory().unwrap();
    store
        .upsert_setting(&SettingRecord {
            key: "theme".into(),
            value: serde_json::json!("light"),
            updated_at: t0(),
        })
        .unwrap();
    store
        .upsert_setting(&SettingRecord {
            key: "theme".into(),
            value: serde_json::json!("dark"),
            updated_at: t0() + chrono::Duration::minutes(5),
        })
        .unwrap();

    let record = store.get_setting("theme").unwrap().unwrap();
    assert_eq!(record.value, serde_json::json!("dark"));
    assert_eq!(store.load_settings().unwrap().len(), 1);
}

#[test]
fn change_listener_fires_on_data_writes_only() {
    let store = PlannerStore::open_in_memory().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    store.on_change(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    store
        .insert_goal(&Goal::new("Math", 120, Priority::High, t0()))
        .unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    store
        .append_event(studia_storage::EventType::SchedulerRun, t0(), None)
        .unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
