//! Append-only event log.
//!
//! Records planner activity (scheduler runs, focus session outcomes, policy
//! changes) for the auto-tuner and for troubleshooting. Events are local
//! observations and never travel in sync snapshots.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use serde_json::Value;
use tracing::debug;

use studia_core::errors::StudiaResult;

use crate::store::PlannerStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    SchedulerRun,
    PolicyChanged,
    GuardianWarning,
    FocusCompleted,
    SessionPostponed,
    SessionCancelled,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::SchedulerRun => "scheduler_run",
            EventType::PolicyChanged => "policy_changed",
            EventType::GuardianWarning => "guardian_warning",
            EventType::FocusCompleted => "focus_completed",
            EventType::SessionPostponed => "session_postponed",
            EventType::SessionCancelled => "session_cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduler_run" => Some(EventType::SchedulerRun),
            "policy_changed" => Some(EventType::PolicyChanged),
            "guardian_warning" => Some(EventType::GuardianWarning),
            "focus_completed" => Some(EventType::FocusCompleted),
            "session_postponed" => Some(EventType::SessionPostponed),
            "session_cancelled" => Some(EventType::SessionCancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventRecord {
    pub id: i64,
    pub event_type: EventType,
    pub occurred_at: DateTime<Utc>,
    pub payload: Option<Value>,
}

impl PlannerStore {
    pub fn append_event(
        &self,
        event_type: EventType,
        occurred_at: DateTime<Utc>,
        payload: Option<&Value>,
    ) -> StudiaResult<()> {
        let payload_raw = payload.map(serde_json::to_string).transpose()?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO events (event_type, occurred_at, payload) VALUES (?1, ?2, ?3)",
                rusqlite::params![
                    event_type.as_str(),
                    occurred_at.to_rfc3339(),
                    payload_raw,
                ],
            )?;
            Ok(())
        })?;
        debug!(event = event_type.as_str(), "event appended");
        Ok(())
    }

    /// Events in `[from, to)`, oldest first. Rows whose type is no longer
    /// known are skipped.
    pub fn events_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StudiaResult<Vec<EventRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, event_type, occurred_at, payload FROM events
                 WHERE occurred_at >= ?1 AND occurred_at < ?2
                 ORDER BY occurred_at, id",
            )?;
            let rows = stmt.query_map(
                rusqlite::params![from.to_rfc3339(), to.to_rfc3339()],
                row_to_event,
            )?;
            rows.filter_map(|r| r.transpose()).collect()
        })
    }
}

fn row_to_event(row: &Row) -> rusqlite::Result<Option<EventRecord>> {
    let type_raw: String = row.get(1)?;
    let Some(event_type) = EventType::parse(&type_raw) else {
        return Ok(None);
    };
    let occurred_raw: String = row.get(2)?;
    let occurred_at = DateTime::parse_from_rfc3339(&occurred_raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(err)))?;
    let payload_raw: Option<String> = row.get(3)?;
    let payload = match payload_raw {
        Some(raw) => Some(serde_json::from_str(&raw).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(err))
        })?),
        None => None,
    };
    Ok(Some(EventRecord {
        id: row.get(0)?,
        event_type,
        occurred_at,
        payload,
    }))
}
