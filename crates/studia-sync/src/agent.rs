//! [`SyncAgent`] — peer connection lifecycle and snapshot exchange.
//!
//! One agent per running device process, explicitly constructed and injected
//! (never a global), so tests can run several independent instances against
//! in-memory stores.
//!
//! The agent is event-driven: callers invoke `on_*` handlers when transport
//! events arrive and `poll` on a timer tick. All time is injected, never read
//! from a wall clock, which keeps every code path deterministic under test.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use studia_core::config::SyncConfig;
use studia_core::entity::{Constraint, Goal};
use studia_core::errors::{StudiaResult, SyncError};
use studia_core::traits::{SettingRecord, SyncStore};

use crate::list_merge::merge_lists;
use crate::resolver::ConflictResolver;
use crate::snapshot::{decode_entities, encode_entities, SyncSnapshot};

/// Agent lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Uninitialized,
    Initializing,
    Ready,
}

/// Per-peer connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    Unknown,
    Connecting,
    Connected,
    Disconnected,
}

/// Point-to-point reliable ordered transport, addressed by peer identifier.
/// Connection completion and inbound data are reported back through the
/// agent's `on_*` handlers by the transport layer.
pub trait PeerChannel: Send + Sync {
    fn connect(&self, peer_id: &str) -> Result<(), SyncError>;
    fn send(&self, peer_id: &str, payload: &[u8]) -> Result<(), SyncError>;
}

#[derive(Debug, Clone)]
struct PeerInfo {
    state: PeerState,
    last_seen: DateTime<Utc>,
    connect_started: Option<DateTime<Utc>>,
}

/// Persisted known-peer entry: remembered across restarts, independent of
/// live connection state.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct KnownPeer {
    id: String,
    last_seen: DateTime<Utc>,
}

/// Settings key for the durable device identifier.
pub const DEVICE_ID_KEY: &str = "deviceId";
/// Settings key for the persisted known-peer set.
pub const KNOWN_PEERS_KEY: &str = "knownPeers";
/// Settings that describe this device and must never travel in a snapshot.
const LOCAL_ONLY_KEYS: [&str; 2] = [DEVICE_ID_KEY, KNOWN_PEERS_KEY];

type StateListener = Box<dyn Fn(&str, PeerState) + Send + Sync>;

/// The peer connection lifecycle manager.
pub struct SyncAgent {
    device_id: String,
    config: SyncConfig,
    resolver: ConflictResolver,
    channel: Arc<dyn PeerChannel>,
    store: Arc<dyn SyncStore>,
    state: Mutex<AgentState>,
    peers: DashMap<String, PeerInfo>,
    /// Last local change awaiting the debounce window, if any.
    dirty_since: Mutex<Option<DateTime<Utc>>>,
    /// Re-entrancy guard: set while an incoming snapshot is being applied so
    /// the resulting storage writes don't look like fresh local changes.
    is_receiving: AtomicBool,
    state_listeners: Mutex<Vec<StateListener>>,
}

impl SyncAgent {
    pub fn new(
        device_id: String,
        channel: Arc<dyn PeerChannel>,
        store: Arc<dyn SyncStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            device_id,
            resolver: ConflictResolver::new(&config),
            config,
            channel,
            store,
            state: Mutex::new(AgentState::Uninitialized),
            peers: DashMap::new(),
            dirty_since: Mutex::new(None),
            is_receiving: AtomicBool::new(false),
            state_listeners: Mutex::new(Vec::new()),
        }
    }

    /// Read the durable device identifier, creating it on first run.
    /// Stable across process restarts.
    pub fn load_or_create_device_id(
        store: &dyn SyncStore,
        now: DateTime<Utc>,
    ) -> StudiaResult<String> {
        if let Some(record) = store.get_setting(DEVICE_ID_KEY)? {
            if let Some(id) = record.value.as_str() {
                return Ok(id.to_string());
            }
        }
        let id = uuid::Uuid::new_v4().to_string();
        store.upsert_setting(&SettingRecord {
            key: DEVICE_ID_KEY.to_string(),
            value: serde_json::Value::String(id.clone()),
            updated_at: now,
        })?;
        info!(device_id = %id, "created durable device identifier");
        Ok(id)
    }

    /// Enter service: load the known-peer set and attempt reconnection to
    /// every known peer. Connection failures are logged, not fatal.
    #[tracing::instrument(skip(self, now), fields(device_id = %self.device_id))]
    pub fn initialize(&self, now: DateTime<Utc>) -> StudiaResult<()> {
        *self.state.lock().expect("agent state lock") = AgentState::Initializing;
        let known = self.load_known_peers()?;
        *self.state.lock().expect("agent state lock") = AgentState::Ready;
        info!(device_id = %self.device_id, known_peers = known.len(), "sync agent ready");

        for peer in known {
            self.peers.insert(
                peer.id.clone(),
                PeerInfo {
                    state: PeerState::Unknown,
                    last_seen: peer.last_seen,
                    connect_started: None,
                },
            );
            if let Err(err) = self.connect_peer(&peer.id, now) {
                warn!(peer = %peer.id, %err, "reconnect attempt failed");
            }
        }
        Ok(())
    }

    /// Start an outbound connection attempt. The transport reports
    /// completion through [`SyncAgent::on_peer_connected`].
    pub fn connect_peer(&self, peer_id: &str, now: DateTime<Utc>) -> StudiaResult<()> {
        if peer_id == self.device_id {
            return Err(SyncError::DuplicateIdentifier {
                peer: peer_id.to_string(),
            }
            .into());
        }
        self.transition(peer_id, PeerState::Connecting, now, Some(now));
        if let Err(err) = self.channel.connect(peer_id) {
            self.transition(peer_id, PeerState::Disconnected, now, None);
            return Err(err.into());
        }
        Ok(())
    }

    /// A connection to `peer_id` is live — inbound or completed outbound.
    /// Remembers the peer and immediately pushes a full snapshot (a request;
    /// the peer answers with a response).
    pub fn on_peer_connected(&self, peer_id: &str, now: DateTime<Utc>) -> StudiaResult<()> {
        self.transition(peer_id, PeerState::Connected, now, None);
        if let Err(err) = self.persist_known_peers(now) {
            warn!(peer = peer_id, %err, "failed to persist known peers");
        }
        self.push_snapshot(peer_id, false, now)
    }

    pub fn on_peer_disconnected(&self, peer_id: &str, now: DateTime<Utc>) {
        self.transition(peer_id, PeerState::Disconnected, now, None);
    }

    /// A transport-level failure for one peer. Surfaced to state listeners;
    /// never crashes the agent or blocks other peers.
    pub fn on_peer_error(&self, peer_id: &str, reason: &str, now: DateTime<Utc>) {
        warn!(peer = peer_id, reason, "peer connection error");
        self.transition(peer_id, PeerState::Disconnected, now, None);
    }

    /// Inbound payload from a peer: decode, merge, and answer requests with
    /// exactly one response. A response never triggers another response.
    #[tracing::instrument(skip(self, payload, now), fields(bytes = payload.len()))]
    pub fn handle_message(
        &self,
        peer_id: &str,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> StudiaResult<()> {
        let snapshot: SyncSnapshot =
            serde_json::from_slice(payload).map_err(|err| SyncError::MalformedSnapshot {
                reason: err.to_string(),
            })?;
        if let Some(mut peer) = self.peers.get_mut(peer_id) {
            peer.last_seen = now;
        }
        let is_response = snapshot.is_response;
        self.apply_snapshot(&snapshot);
        if !is_response {
            self.push_snapshot(peer_id, true, now)?;
        }
        Ok(())
    }

    /// Record a local data change. Broadcast happens after the debounce
    /// window elapses (see [`SyncAgent::poll`]). Ignored while an incoming
    /// snapshot is being applied — a merge must not look like a fresh edit.
    pub fn note_local_change(&self, now: DateTime<Utc>) {
        if self.is_receiving.load(Ordering::SeqCst) {
            debug!("local change during snapshot application, not rebroadcasting");
            return;
        }
        *self.dirty_since.lock().expect("dirty lock") = Some(now);
    }

    /// Timer tick: expire stale connection attempts and flush the debounce
    /// window.
    pub fn poll(&self, now: DateTime<Utc>) {
        // Connection attempts past the timeout fail (logged, not fatal).
        let mut timed_out = Vec::new();
        for entry in self.peers.iter() {
            if entry.state == PeerState::Connecting {
                if let Some(started) = entry.connect_started {
                    if (now - started).num_milliseconds() >= self.config.connect_timeout_ms {
                        timed_out.push(entry.key().clone());
                    }
                }
            }
        }
        for peer in timed_out {
            warn!(peer = %peer, "connection attempt timed out");
            self.transition(&peer, PeerState::Disconnected, now, None);
        }

        let due = {
            let mut dirty = self.dirty_since.lock().expect("dirty lock");
            match *dirty {
                Some(since) if (now - since).num_milliseconds() >= self.config.debounce_ms => {
                    *dirty = None;
                    true
                }
                _ => false,
            }
        };
        if due {
            self.broadcast(now);
        }
    }

    /// Push the current full state to every connected peer.
    fn broadcast(&self, now: DateTime<Utc>) {
        let connected: Vec<String> = self
            .peers
            .iter()
            .filter(|e| e.state == PeerState::Connected)
            .map(|e| e.key().clone())
            .collect();
        debug!(peers = connected.len(), "broadcasting debounced local changes");
        for peer in connected {
            if let Err(err) = self.push_snapshot(&peer, false, now) {
                warn!(peer = %peer, %err, "broadcast to peer failed");
            }
        }
    }

    fn push_snapshot(&self, peer_id: &str, is_response: bool, now: DateTime<Utc>) -> StudiaResult<()> {
        let snapshot = self.build_snapshot(is_response, now)?;
        let payload = serde_json::to_vec(&snapshot)?;
        if let Err(err) = self.channel.send(peer_id, &payload) {
            self.transition(peer_id, PeerState::Disconnected, now, None);
            return Err(err.into());
        }
        Ok(())
    }

    /// Gather the full syncable state. Local-only settings stay home.
    fn build_snapshot(&self, is_response: bool, now: DateTime<Utc>) -> StudiaResult<SyncSnapshot> {
        let goals = self.store.load_goals()?;
        let constraints = self.store.load_constraints()?;
        let settings = self
            .store
            .load_settings()?
            .into_iter()
            .filter(|s| !LOCAL_ONLY_KEYS.contains(&s.key.as_str()))
            .collect();
        Ok(SyncSnapshot {
            source_device: self.device_id.clone(),
            is_response,
            sent_at: now,
            goals: encode_entities(&goals)?,
            constraints: encode_entities(&constraints)?,
            settings,
        })
    }

    /// Merge an incoming snapshot into local storage. Each entity type is a
    /// separate storage transaction; a failed write is logged and retried on
    /// the next triggered sync, not within this cycle.
    fn apply_snapshot(&self, snapshot: &SyncSnapshot) {
        self.is_receiving.store(true, Ordering::SeqCst);
        info!(
            source = %snapshot.source_device,
            goals = snapshot.goals.len(),
            constraints = snapshot.constraints.len(),
            settings = snapshot.settings.len(),
            response = snapshot.is_response,
            "applying incoming snapshot"
        );

        self.apply_entities::<Goal>("goals", &snapshot.goals, |merged| {
            self.store.upsert_goals(merged)
        });
        self.apply_entities::<Constraint>("constraints", &snapshot.constraints, |merged| {
            self.store.upsert_constraints(merged)
        });
        self.apply_settings(&snapshot.settings);

        self.is_receiving.store(false, Ordering::SeqCst);
    }

    fn apply_entities<T: studia_core::traits::Syncable>(
        &self,
        kind: &str,
        incoming: &[serde_json::Value],
        persist: impl FnOnce(&[T]) -> StudiaResult<()>,
    ) where
        SyncAgent: LoadLocal<T>,
    {
        let decoded: Vec<T> = decode_entities(kind, incoming);
        let local = match self.load_local() {
            Ok(local) => local,
            Err(err) => {
                warn!(kind, %err, "cannot load local entities, skipping merge");
                return;
            }
        };
        match merge_lists(&self.resolver, &local, &decoded) {
            Ok(merged) => {
                if let Err(err) = persist(&merged) {
                    warn!(kind, %err, "storage write failed, will retry next sync");
                }
            }
            Err(err) => warn!(kind, %err, "merge failed"),
        }
    }

    /// Settings carry no vector clock; plain last-write-wins keyed by name.
    fn apply_settings(&self, incoming: &[SettingRecord]) {
        for record in incoming {
            if LOCAL_ONLY_KEYS.contains(&record.key.as_str()) {
                continue;
            }
            let newer = match self.store.get_setting(&record.key) {
                Ok(local) => local.map_or(true, |l| record.updated_at > l.updated_at),
                Err(err) => {
                    warn!(key = %record.key, %err, "cannot read local setting");
                    continue;
                }
            };
            if newer {
                if let Err(err) = self.store.upsert_setting(record) {
                    warn!(key = %record.key, %err, "setting write failed");
                }
            }
        }
    }

    fn transition(
        &self,
        peer_id: &str,
        state: PeerState,
        now: DateTime<Utc>,
        connect_started: Option<DateTime<Utc>>,
    ) {
        {
            let mut entry = self.peers.entry(peer_id.to_string()).or_insert(PeerInfo {
                state: PeerState::Unknown,
                last_seen: now,
                connect_started: None,
            });
            entry.state = state;
            entry.last_seen = now;
            entry.connect_started = connect_started;
        }
        debug!(peer = peer_id, ?state, "peer state transition");
        for listener in self.state_listeners.lock().expect("listener lock").iter() {
            listener(peer_id, state);
        }
    }

    fn load_known_peers(&self) -> StudiaResult<Vec<KnownPeer>> {
        match self.store.get_setting(KNOWN_PEERS_KEY)? {
            Some(record) => Ok(serde_json::from_value(record.value)?),
            None => Ok(Vec::new()),
        }
    }

    fn persist_known_peers(&self, now: DateTime<Utc>) -> StudiaResult<()> {
        let known: Vec<KnownPeer> = self
            .peers
            .iter()
            .map(|e| KnownPeer {
                id: e.key().clone(),
                last_seen: e.last_seen,
            })
            .collect();
        self.store.upsert_setting(&SettingRecord {
            key: KNOWN_PEERS_KEY.to_string(),
            value: serde_json::to_value(&known)?,
            updated_at: now,
        })
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn state(&self) -> AgentState {
        *self.state.lock().expect("agent state lock")
    }

    pub fn peer_state(&self, peer_id: &str) -> PeerState {
        self.peers
            .get(peer_id)
            .map(|p| p.state)
            .unwrap_or(PeerState::Unknown)
    }

    /// Known peer ids with last-seen timestamps, regardless of live state.
    pub fn known_peers(&self) -> Vec<(String, DateTime<Utc>)> {
        self.peers
            .iter()
            .map(|e| (e.key().clone(), e.last_seen))
            .collect()
    }

    /// Subscribe to peer connection-state transitions.
    pub fn on_peer_state_change(&self, listener: impl Fn(&str, PeerState) + Send + Sync + 'static) {
        self.state_listeners
            .lock()
            .expect("listener lock")
            .push(Box::new(listener));
    }

    /// True while a local change is waiting out the debounce window.
    pub fn has_pending_broadcast(&self) -> bool {
        self.dirty_since.lock().expect("dirty lock").is_some()
    }
}

/// Internal helper: which local list an entity type merges against.
trait LoadLocal<T> {
    fn load_local(&self) -> StudiaResult<Vec<T>>;
}

impl LoadLocal<Goal> for SyncAgent {
    fn load_local(&self) -> StudiaResult<Vec<Goal>> {
        self.store.load_goals()
    }
}

impl LoadLocal<Constraint> for SyncAgent {
    fn load_local(&self) -> StudiaResult<Vec<Constraint>> {
        self.store.load_constraints()
    }
}
