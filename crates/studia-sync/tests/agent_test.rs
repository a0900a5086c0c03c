use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use studia_core::config::SyncConfig;
use studia_core::entity::{Goal, Priority};
use studia_core::errors::{StudiaError, SyncError};
use studia_core::traits::{SettingRecord, SyncStore};
use studia_storage::PlannerStore;
use studia_sync::{PeerChannel, PeerState, SyncAgent, SyncSnapshot};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
}

/// Records outbound payloads instead of hitting a network.
#[derive(Default)]
struct RecordingChannel {
    sent: Mutex<Vec<(String, Vec<u8>)>>,
}

impl RecordingChannel {
    fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    fn last_payload(&self) -> Vec<u8> {
        self.sent.lock().unwrap().last().unwrap().1.clone()
    }
}

impl PeerChannel for RecordingChannel {
    fn connect(&self, _peer_id: &str) -> Result<(), SyncError> {
        Ok(())
    }

    fn send(&self, peer_id: &str, payload: &[u8]) -> Result<(), SyncError> {
        self.sent.lock().unwrap().push((peer_id.to_string(), payload.to_vec()));
        Ok(())
    }
}

struct Device {
    agent: SyncAgent,
    channel: Arc<RecordingChannel>,
    store: Arc<PlannerStore>,
}

fn device(id: &str) -> Device {
    let channel = Arc::new(RecordingChannel::default());
    let store = Arc::new(PlannerStore::open_in_memory().unwrap());
    let agent = SyncAgent::new(
        id.to_string(),
        Arc::clone(&channel) as Arc<dyn PeerChannel>,
        Arc::clone(&store) as Arc<dyn SyncStore>,
        SyncConfig::default(),
    );
    agent.initialize(t0()).unwrap();
    Device { agent, channel, store }
}

#[test]
fn device_id_survives_restarts() {
    let store = PlannerStore::open_in_memory().unwrap();
    let first = SyncAgent::load_or_create_device_id(&store, t0()).unwrap();
    let second = SyncAgent::load_or_create_device_id(&store, t0() + Duration::hours(1)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn connecting_to_own_id_is_rejected() {
    let d = device("alpha");
    let err = d.agent.connect_peer("alpha", t0()).unwrap_err();
    assert!(matches!(
        err,
        StudiaError::Sync(SyncError::DuplicateIdentifier { .. })
    ));
}

#[test]
fn snapshot_exchange_converges_and_responses_stop() {
    let a = device("alpha");
    let b = device("beta");
    a.store
        .insert_goal(&Goal::new("Math", 240, Priority::High, t0()))
        .unwrap();

    // Connection opens: alpha pushes a request snapshot.
    a.agent.on_peer_connected("beta", t0()).unwrap();
    assert_eq!(a.channel.sent_count(), 1);
    let request = a.channel.last_payload();

    // Beta merges and answers with exactly one response.
    b.agent.on_peer_connected("alpha", t0()).unwrap();
    let b_sends_before = b.channel.sent_count();
    b.agent.handle_message("alpha", &request, t0()).unwrap();
    assert_eq!(b.channel.sent_count(), b_sends_before + 1);
    let titles: Vec<_> = b.store.load_goals().unwrap().iter().map(|g| g.title.clone()).collect();
    assert_eq!(titles, ["Math"]);

    // The response merges on alpha without triggering another send.
    let response = b.channel.last_payload();
    let snapshot: SyncSnapshot = serde_json::from_slice(&response).unwrap();
    assert!(snapshot.is_response);
    let a_sends_before = a.channel.sent_count();
    a.agent.handle_message("beta", &response, t0()).unwrap();
    assert_eq!(a.channel.sent_count(), a_sends_before);
    assert_eq!(a.store.load_goals().unwrap().len(), 1);
}

#[test]
fn same_titled_uuidless_goals_converge_to_the_newer_edit() {
    let a = device("alpha");
    let b = device("beta");

    // Pre-sync rows from before uuids existed: both sides carry "Math" at
    // row id 1, so the numeric-id fallback has to pair them up.
    let mut older = Goal::new("Math", 120, Priority::Medium, t0());
    older.uuid = None;
    a.store.insert_goal(&older).unwrap();
    let mut newer = Goal::new("Math", 180, Priority::Medium, t0() + Duration::seconds(2));
    newer.uuid = None;
    b.store.insert_goal(&newer).unwrap();

    // One full exchange: alpha requests, beta merges and responds, alpha
    // merges the response.
    a.agent.on_peer_connected("beta", t0()).unwrap();
    b.agent.on_peer_connected("alpha", t0()).unwrap();
    b.agent
        .handle_message("alpha", &a.channel.last_payload(), t0() + Duration::seconds(3))
        .unwrap();
    a.agent
        .handle_message("beta", &b.channel.last_payload(), t0() + Duration::seconds(3))
        .unwrap();

    for store in [&a.store, &b.store] {
        let goals = store.load_goals().unwrap();
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].title, "Math");
        assert_eq!(goals[0].target_minutes, 180);
    }
}

#[test]
fn merging_a_snapshot_does_not_schedule_a_rebroadcast() {
    let a = device("alpha");
    let b = device("beta");
    b.store
        .insert_goal(&Goal::new("Physics", 120, Priority::Low, t0()))
        .unwrap();
    b.agent.on_peer_connected("alpha", t0()).unwrap();

    // Wire storage change notifications into the agent, as the application
    // does. The guard must keep merge-induced writes from counting as edits.
    let agent = Arc::new(a.agent);
    let hook = Arc::clone(&agent);
    a.store.on_change(move || hook.note_local_change(t0()));

    agent.handle_message("beta", &b.channel.last_payload(), t0()).unwrap();
    assert_eq!(a.store.load_goals().unwrap().len(), 1);
    assert!(!agent.has_pending_broadcast());
}

#[test]
fn local_changes_debounce_into_one_broadcast() {
    let a = device("alpha");
    a.agent.on_peer_connected("beta", t0()).unwrap();
    let baseline = a.channel.sent_count();

    a.agent.note_local_change(t0());
    a.agent.note_local_change(t0() + Duration::milliseconds(100));
    a.agent.poll(t0() + Duration::milliseconds(200));
    assert_eq!(a.channel.sent_count(), baseline);

    // 300 ms after the *last* change the single coalesced broadcast goes out.
    a.agent.poll(t0() + Duration::milliseconds(400));
    assert_eq!(a.channel.sent_count(), baseline + 1);
    assert!(!a.agent.has_pending_broadcast());

    // Nothing further without new changes.
    a.agent.poll(t0() + Duration::milliseconds(900));
    assert_eq!(a.channel.sent_count(), baseline + 1);
}

#[test]
fn stalled_connection_attempts_time_out() {
    let d = device("alpha");
    d.agent.connect_peer("beta", t0()).unwrap();
    assert_eq!(d.agent.peer_state("beta"), PeerState::Connecting);

    d.agent.poll(t0() + Duration::seconds(5));
    assert_eq!(d.agent.peer_state("beta"), PeerState::Connecting);

    d.agent.poll(t0() + Duration::seconds(10));
    assert_eq!(d.agent.peer_state("beta"), PeerState::Disconnected);
}

#[test]
fn device_local_settings_never_travel() {
    let a = device("alpha");
    SyncAgent::load_or_create_device_id(a.store.as_ref(), t0()).unwrap();
    a.store
        .upsert_setting(&SettingRecord {
            key: "theme".into(),
            value: serde_json::json!("dark"),
            updated_at: t0(),
        })
        .unwrap();

    a.agent.on_peer_connected("beta", t0()).unwrap();
    let snapshot: SyncSnapshot = serde_json::from_slice(&a.channel.last_payload()).unwrap();
    let keys: Vec<_> = snapshot.settings.iter().map(|s| s.key.clone()).collect();
    assert_eq!(keys, ["theme"]);
}

#[test]
fn newer_remote_setting_wins_older_loses() {
    let a = device("alpha");
    a.store
        .upsert_setting(&SettingRecord {
            key: "theme".into(),
            value: serde_json::json!("dark"),
            updated_at: t0(),
        })
        .unwrap();

    let snapshot = SyncSnapshot {
        source_device: "beta".into(),
        is_response: true,
        sent_at: t0(),
        goals: vec![],
        constraints: vec![],
        settings: vec![
            SettingRecord {
                key: "theme".into(),
                value: serde_json::json!("light"),
                updated_at: t0() - Duration::minutes(5),
            },
            SettingRecord {
                key: "locale".into(),
                value: serde_json::json!("it-IT"),
                updated_at: t0(),
            },
        ],
    };
    let payload = serde_json::to_vec(&snapshot).unwrap();
    a.agent.handle_message("beta", &payload, t0()).unwrap();

    let theme = a.store.get_setting("theme").unwrap().unwrap();
    assert_eq!(theme.value, serde_json::json!("dark"));
    let locale = a.store.get_setting("locale").unwrap().unwrap();
    assert_eq!(locale.value, serde_json::json!("it-IT"));
}
