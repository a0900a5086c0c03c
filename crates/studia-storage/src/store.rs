//! [`PlannerStore`] — the SQLite-backed store behind every subsystem.
//!
//! One connection behind a mutex; statements are short-lived and the busy
//! timeout covers cross-process contention. Change listeners fire after each
//! successful data write, which is how the sync agent learns about local
//! edits. Event-log appends do not notify, they are observations rather than
//! syncable data.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::debug;

use studia_core::entity::{Constraint, Goal, GoalStatus, Priority, SyncMeta};
use studia_core::errors::{StorageError, StudiaResult};
use studia_core::plan::DayOfWeek;
use studia_core::traits::{SettingRecord, SyncStore};
use studia_core::VectorClock;

use crate::migrations;

type ChangeListener = Box<dyn Fn() + Send + Sync>;

pub struct PlannerStore {
    conn: Mutex<Connection>,
    listeners: Mutex<Vec<ChangeListener>>,
}

impl PlannerStore {
    /// Open (creating if needed) and migrate a database file.
    pub fn open(path: impl AsRef<Path>) -> StudiaResult<Self> {
        let conn = Connection::open(path).map_err(sql_err)?;
        conn.pragma_update(None, "journal_mode", "WAL").map_err(sql_err)?;
        conn.pragma_update(None, "synchronous", "NORMAL").map_err(sql_err)?;
        conn.pragma_update(None, "busy_timeout", 5000).map_err(sql_err)?;
        Self::from_connection(conn)
    }

    /// In-memory database, used by tests and throwaway tooling.
    pub fn open_in_memory() -> StudiaResult<Self> {
        let conn = Connection::open_in_memory().map_err(sql_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> StudiaResult<Self> {
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            listeners: Mutex::new(Vec::new()),
        })
    }

    /// Register a callback fired after every successful data write.
    pub fn on_change(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.listeners.lock().expect("listener lock").push(Box::new(listener));
    }

    fn notify(&self) {
        for listener in self.listeners.lock().expect("listener lock").iter() {
            listener();
        }
    }

    pub(crate) fn with_conn<R>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<R>,
    ) -> StudiaResult<R> {
        let conn = self.conn.lock().expect("connection lock");
        f(&conn).map_err(|err| sql_err(err).into())
    }

    // ── Goals ───────────────────────────────────────────────────────────

    /// Insert a new goal, returning it with the assigned row id.
    pub fn insert_goal(&self, goal: &Goal) -> StudiaResult<Goal> {
        let clock = encode_clock(&goal.sync)?;
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO goals (uuid, title, target_minutes, priority, deadline, status,
                                    updated_at, version, is_deleted, vector_clock)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    goal.uuid,
                    goal.title,
                    goal.target_minutes,
                    goal.priority.as_str(),
                    goal.deadline.map(|d| d.to_rfc3339()),
                    goal.status.as_str(),
                    goal.sync.updated_at.to_rfc3339(),
                    goal.sync.version,
                    goal.sync.is_deleted,
                    clock,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        debug!(id, title = %goal.title, "goal inserted");
        self.notify();
        let mut stored = goal.clone();
        stored.id = id;
        Ok(stored)
    }

    pub fn update_goal(&self, goal: &Goal) -> StudiaResult<()> {
        let clock = encode_clock(&goal.sync)?;
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE goals SET uuid = ?2, title = ?3, target_minutes = ?4, priority = ?5,
                                  deadline = ?6, status = ?7, updated_at = ?8, version = ?9,
                                  is_deleted = ?10, vector_clock = ?11
                 WHERE id = ?1",
                rusqlite::params![
                    goal.id,
                    goal.uuid,
                    goal.title,
                    goal.target_minutes,
                    goal.priority.as_str(),
                    goal.deadline.map(|d| d.to_rfc3339()),
                    goal.status.as_str(),
                    goal.sync.updated_at.to_rfc3339(),
                    goal.sync.version,
                    goal.sync.is_deleted,
                    clock,
                ],
            )?;
            Ok(())
        })?;
        self.notify();
        Ok(())
    }

    /// Soft-delete: tombstone the row so the deletion travels to peers.
    pub fn delete_goal(&self, id: i64, now: DateTime<Utc>, device_id: &str) -> StudiaResult<()> {
        if let Some(mut goal) = self.goal(id)? {
            goal.sync.is_deleted = true;
            goal.sync.touch(now, device_id);
            self.update_goal(&goal)?;
        }
        Ok(())
    }

    pub fn goal(&self, id: i64) -> StudiaResult<Option<Goal>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, uuid, title, target_minutes, priority, deadline, status,
                        updated_at, version, is_deleted, vector_clock
                 FROM goals WHERE id = ?1",
                [id],
                row_to_goal,
            )
            .optional()
        })
    }

    // ── Constraints ─────────────────────────────────────────────────────

    pub fn insert_constraint(&self, constraint: &Constraint) -> StudiaResult<Constraint> {
        let clock = encode_clock(&constraint.sync)?;
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO constraints (uuid, title, minutes_per_week, day,
                                          updated_at, version, is_deleted, vector_clock)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    constraint.uuid,
                    constraint.title,
                    constraint.minutes_per_week,
                    constraint.day.map(|d| d.index() as i64),
                    constraint.sync.updated_at.to_rfc3339(),
                    constraint.sync.version,
                    constraint.sync.is_deleted,
                    clock,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        debug!(id, title = %constraint.title, "constraint inserted");
        self.notify();
        let mut stored = constraint.clone();
        stored.id = id;
        Ok(stored)
    }

    pub fn update_constraint(&self, constraint: &Constraint) -> StudiaResult<()> {
        let clock = encode_clock(&constraint.sync)?;
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE constraints SET uuid = ?2, title = ?3, minutes_per_week = ?4, day = ?5,
                                        updated_at = ?6, version = ?7, is_deleted = ?8,
                                        vector_clock = ?9
                 WHERE id = ?1",
                rusqlite::params![
                    constraint.id,
                    constraint.uuid,
                    constraint.title,
                    constraint.minutes_per_week,
                    constraint.day.map(|d| d.index() as i64),
                    constraint.sync.updated_at.to_rfc3339(),
                    constraint.sync.version,
                    constraint.sync.is_deleted,
                    clock,
                ],
            )?;
            Ok(())
        })?;
        self.notify();
        Ok(())
    }

    pub fn delete_constraint(&self, id: i64, now: DateTime<Utc>, device_id: &str) -> StudiaResult<()> {
        if let Some(mut constraint) = self.constraint(id)? {
            constraint.sync.is_deleted = true;
            constraint.sync.touch(now, device_id);
            self.update_constraint(&constraint)?;
        }
        Ok(())
    }

    pub fn constraint(&self, id: i64) -> StudiaResult<Option<Constraint>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, uuid, title, minutes_per_week, day,
                        updated_at, version, is_deleted, vector_clock
                 FROM constraints WHERE id = ?1",
                [id],
                row_to_constraint,
            )
            .optional()
        })
    }
}

/// The storage surface the sync agent merges through. Upserts match by uuid
/// when present, falling back to the numeric id; entities new to this device
/// are inserted.
impl SyncStore for PlannerStore {
    fn load_goals(&self) -> StudiaResult<Vec<Goal>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, uuid, title, target_minutes, priority, deadline, status,
                        updated_at, version, is_deleted, vector_clock
                 FROM goals ORDER BY id",
            )?;
            let rows = stmt.query_map([], row_to_goal)?;
            rows.collect()
        })
    }

    fn load_constraints(&self) -> StudiaResult<Vec<Constraint>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, uuid, title, minutes_per_week, day,
                        updated_at, version, is_deleted, vector_clock
                 FROM constraints ORDER BY id",
            )?;
            let rows = stmt.query_map([], row_to_constraint)?;
            rows.collect()
        })
    }

    fn load_settings(&self) -> StudiaResult<Vec<SettingRecord>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT key, value, updated_at FROM settings ORDER BY key")?;
            let rows = stmt.query_map([], row_to_setting)?;
            rows.collect()
        })
    }

    fn upsert_goals(&self, goals: &[Goal]) -> StudiaResult<()> {
        let encoded: Vec<Option<String>> = goals
            .iter()
            .map(|g| encode_clock(&g.sync))
            .collect::<StudiaResult<_>>()?;
        {
            let mut conn = self.conn.lock().expect("connection lock");
            let tx = conn.transaction().map_err(sql_err)?;
            for (goal, clock) in goals.iter().zip(&encoded) {
                let updated = tx
                    .execute(
                        "UPDATE goals SET title = ?3, target_minutes = ?4, priority = ?5,
                                          deadline = ?6, status = ?7, updated_at = ?8,
                                          version = ?9, is_deleted = ?10, vector_clock = ?11
                         WHERE (uuid IS NOT NULL AND uuid = ?2) OR (?2 IS NULL AND id = ?1)",
                        rusqlite::params![
                            goal.id,
                            goal.uuid,
                            goal.title,
                            goal.target_minutes,
                            goal.priority.as_str(),
                            goal.deadline.map(|d| d.to_rfc3339()),
                            goal.status.as_str(),
                            goal.sync.updated_at.to_rfc3339(),
                            goal.sync.version,
                            goal.sync.is_deleted,
                            clock,
                        ],
                    )
                    .map_err(sql_err)?;
                if updated == 0 {
                    tx.execute(
                        "INSERT INTO goals (uuid, title, target_minutes, priority, deadline,
                                            status, updated_at, version, is_deleted, vector_clock)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                        rusqlite::params![
                            goal.uuid,
                            goal.title,
                            goal.target_minutes,
                            goal.priority.as_str(),
                            goal.deadline.map(|d| d.to_rfc3339()),
                            goal.status.as_str(),
                            goal.sync.updated_at.to_rfc3339(),
                            goal.sync.version,
                            goal.sync.is_deleted,
                            clock,
                        ],
                    )
                    .map_err(sql_err)?;
                }
            }
            tx.commit().map_err(sql_err)?;
        }
        self.notify();
        Ok(())
    }

    fn upsert_constraints(&self, constraints: &[Constraint]) -> StudiaResult<()> {
        let encoded: Vec<Option<String>> = constraints
            .iter()
            .map(|c| encode_clock(&c.sync))
            .collect::<StudiaResult<_>>()?;
        {
            let mut conn = self.conn.lock().expect("connection lock");
            let tx = conn.transaction().map_err(sql_err)?;
            for (constraint, clock) in constraints.iter().zip(&encoded) {
                let updated = tx
                    .execute(
                        "UPDATE constraints SET title = ?3, minutes_per_week = ?4, day = ?5,
                                                updated_at = ?6, version = ?7, is_deleted = ?8,
                                                vector_clock = ?9
                         WHERE (uuid IS NOT NULL AND uuid = ?2) OR (?2 IS NULL AND id = ?1)",
                        rusqlite::params![
                            constraint.id,
                            constraint.uuid,
                            constraint.title,
                            constraint.minutes_per_week,
                            constraint.day.map(|d| d.index() as i64),
                            constraint.sync.updated_at.to_rfc3339(),
                            constraint.sync.version,
                            constraint.sync.is_deleted,
                            clock,
                        ],
                    )
                    .map_err(sql_err)?;
                if updated == 0 {
                    tx.execute(
                        "INSERT INTO constraints (uuid, title, minutes_per_week, day,
                                                  updated_at, version, is_deleted, vector_clock)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                        rusqlite::params![
                            constraint.uuid,
                            constraint.title,
                            constraint.minutes_per_week,
                            constraint.day.map(|d| d.index() as i64),
                            constraint.sync.updated_at.to_rfc3339(),
                            constraint.sync.version,
                            constraint.sync.is_deleted,
                            clock,
                        ],
                    )
                    .map_err(sql_err)?;
                }
            }
            tx.commit().map_err(sql_err)?;
        }
        self.notify();
        Ok(())
    }

    fn upsert_setting(&self, record: &SettingRecord) -> StudiaResult<()> {
        let value = serde_json::to_string(&record.value)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                updated_at = excluded.updated_at",
                rusqlite::params![record.key, value, record.updated_at.to_rfc3339()],
            )?;
            Ok(())
        })?;
        self.notify();
        Ok(())
    }

    fn get_setting(&self, key: &str) -> StudiaResult<Option<SettingRecord>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT key, value, updated_at FROM settings WHERE key = ?1",
                [key],
                row_to_setting,
            )
            .optional()
        })
    }
}

fn sql_err(err: rusqlite::Error) -> StorageError {
    StorageError::SqliteError {
        message: err.to_string(),
    }
}

fn encode_clock(sync: &SyncMeta) -> StudiaResult<Option<String>> {
    sync.vector_clock
        .as_ref()
        .map(|c| serde_json::to_string(c))
        .transpose()
        .map_err(Into::into)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
        })
}

fn row_to_sync_meta(row: &Row, base: usize) -> rusqlite::Result<SyncMeta> {
    let updated_raw: String = row.get(base)?;
    let clock_raw: Option<String> = row.get(base + 3)?;
    let vector_clock: Option<VectorClock> = match clock_raw {
        Some(raw) => Some(serde_json::from_str(&raw).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(base + 3, Type::Text, Box::new(err))
        })?),
        None => None,
    };
    Ok(SyncMeta {
        updated_at: parse_timestamp(base, &updated_raw)?,
        version: row.get(base + 1)?,
        is_deleted: row.get(base + 2)?,
        vector_clock,
    })
}

fn row_to_goal(row: &Row) -> rusqlite::Result<Goal> {
    let priority_raw: String = row.get(4)?;
    let status_raw: String = row.get(6)?;
    let deadline_raw: Option<String> = row.get(5)?;
    let deadline = match deadline_raw {
        Some(raw) => Some(parse_timestamp(5, &raw)?),
        None => None,
    };
    Ok(Goal {
        id: row.get(0)?,
        uuid: row.get(1)?,
        title: row.get(2)?,
        target_minutes: row.get(3)?,
        priority: Priority::parse(&priority_raw).unwrap_or(Priority::Medium),
        deadline,
        status: GoalStatus::parse(&status_raw).unwrap_or(GoalStatus::Active),
        sync: row_to_sync_meta(row, 7)?,
    })
}

fn row_to_constraint(row: &Row) -> rusqlite::Result<Constraint> {
    let day_raw: Option<i64> = row.get(4)?;
    Ok(Constraint {
        id: row.get(0)?,
        uuid: row.get(1)?,
        title: row.get(2)?,
        minutes_per_week: row.get(3)?,
        day: day_raw.and_then(|i| DayOfWeek::ALL.get(i as usize).copied()),
        sync: row_to_sync_meta(row, 5)?,
    })
}

fn row_to_setting(row: &Row) -> rusqlite::Result<SettingRecord> {
    let value_raw: String = row.get(1)?;
    let updated_raw: String = row.get(2)?;
    Ok(SettingRecord {
        key: row.get(0)?,
        value: serde_json::from_str(&value_raw).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(err))
        })?,
        updated_at: parse_timestamp(2, &updated_raw)?,
    })
}
