use chrono::{DateTime, Duration, Utc};
use studia_core::entity::{Goal, Priority};
use studia_scheduler::run_weekly_plan;
use studia_storage::{EventType, PlannerStore};

fn t0() -> DateTime<Utc> {
    "2026-03-02T08:00:00Z".parse().unwrap()
}

#[test]
fn a_run_is_recorded_in_the_event_log() {
    let store = PlannerStore::open_in_memory().unwrap();
    let now = t0();
    store
        .insert_goal(&Goal::new("Math", 120, Priority::Medium, now))
        .unwrap();

    let outcome = run_weekly_plan(&store, now).unwrap();
    assert!(outcome.issues.is_empty());

    let events = store
        .events_between(now - Duration::minutes(1), now + Duration::minutes(1))
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::SchedulerRun);

    let payload = events[0].payload.as_ref().unwrap();
    assert_eq!(payload["goals"], 1);
    assert_eq!(payload["constraints"], 0);
    let study: u32 = outcome.plan.iter().map(|d| d.study_minutes()).sum();
    assert_eq!(payload["study_minutes"], study);
}

#[test]
fn guardian_findings_become_warning_events() {
    let store = PlannerStore::open_in_memory().unwrap();
    let now = t0();
    let mut late = Goal::new("Late", 60, Priority::High, now);
    late.deadline = Some(now - Duration::days(1));
    store.insert_goal(&late).unwrap();

    let outcome = run_weekly_plan(&store, now).unwrap();
    assert!(!outcome.issues.is_empty());

    let events = store
        .events_between(now - Duration::minutes(1), now + Duration::minutes(1))
        .unwrap();
    let warnings: Vec<_> = events
        .iter()
        .filter(|e| e.event_type == EventType::GuardianWarning)
        .collect();
    assert_eq!(warnings.len(), outcome.issues.len());
    let payload = warnings[0].payload.as_ref().unwrap();
    assert_eq!(payload["kind"], "missed_deadline");
    assert_eq!(payload["subject"], "Late");

    // The run summary is still there alongside the findings.
    assert!(events
        .iter()
        .any(|e| e.event_type == EventType::SchedulerRun));
}
