#![forbid(unsafe_code)]

mod error;
mod members;
mod messages;
mod requests;
mod support;
mod tasks;

pub use error::StoreError;
pub use requests::*;

use crate::config::{TeamConfig, load_team_config};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tl_core::ids::TeamId;

const SCHEMA_VERSION: i64 = 1;

/// Durable, authoritative store of one team's tasks, members and messages.
///
/// One ledger instance owns exactly one team directory and one SQLite
/// connection. The ledger never serializes callers itself; every operation is
/// a synchronous call whose correctness comes from statement-level atomicity
/// (single conditional writes, or explicit transactions where two rows must
/// move together). `close` is terminal: all later operations fail with
/// [`StoreError::Closed`].
#[derive(Debug)]
pub struct TeamLedger {
    team: TeamId,
    team_dir: PathBuf,
    conn: Option<Connection>,
}

impl TeamLedger {
    pub fn open(state_dir: impl AsRef<Path>, team: &TeamId) -> Result<Self, StoreError> {
        let team_dir = state_dir.as_ref().join(team.as_str());
        std::fs::create_dir_all(&team_dir)?;

        let db_path = team_dir.join("ledger.db");
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;

        install_schema(&conn, team.as_str())?;

        Ok(Self {
            team: team.clone(),
            team_dir,
            conn: Some(conn),
        })
    }

    pub fn team_name(&self) -> &str {
        self.team.as_str()
    }

    pub fn team_dir(&self) -> &Path {
        &self.team_dir
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    pub fn status(&self) -> LedgerStatus {
        if self.is_closed() {
            LedgerStatus::Shutdown
        } else {
            LedgerStatus::Active
        }
    }

    /// Releases the database connection. Idempotent; every operation after
    /// the first `close` fails with [`StoreError::Closed`].
    pub fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            let _ = conn.close();
        }
    }

    /// Reads the static team descriptor (`config.json` in the team
    /// directory). A missing file yields a default seeded with the team
    /// name; a malformed one is an error.
    pub fn team_config(&self) -> Result<TeamConfig, StoreError> {
        self.conn()?;
        load_team_config(&self.team_dir, self.team.as_str())
    }

    /// Full snapshot for context injection: config, members, tasks and the
    /// broadcast inbox in one read.
    pub fn team_state(&self) -> Result<TeamState, StoreError> {
        Ok(TeamState {
            team_name: self.team.as_str().to_string(),
            config: self.team_config()?,
            members: self.list_members()?,
            tasks: self.list_tasks()?,
            messages: self.retrieve_messages("")?,
            status: self.status(),
        })
    }

    fn conn(&self) -> Result<&Connection, StoreError> {
        self.conn.as_ref().ok_or(StoreError::Closed)
    }

    fn conn_mut(&mut self) -> Result<&mut Connection, StoreError> {
        self.conn.as_mut().ok_or(StoreError::Closed)
    }
}

fn install_schema(conn: &Connection, team: &str) -> Result<(), StoreError> {
    let now_ms = now_ms();

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS ledger_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL,
          team TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS counters (
          name TEXT PRIMARY KEY,
          value INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tasks (
          id TEXT PRIMARY KEY,
          subject TEXT NOT NULL,
          description TEXT NOT NULL,
          active_form TEXT,
          status TEXT NOT NULL,
          owner TEXT NOT NULL DEFAULT '',
          blocked_by TEXT NOT NULL DEFAULT '[]',
          blocks TEXT NOT NULL DEFAULT '[]',
          metadata TEXT,
          created_at_ms INTEGER NOT NULL,
          claimed_at_ms INTEGER,
          completed_at_ms INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_status_created
          ON tasks(status, created_at_ms, id);

        CREATE TABLE IF NOT EXISTS members (
          session_key TEXT PRIMARY KEY,
          agent_id TEXT NOT NULL,
          name TEXT NOT NULL,
          role TEXT NOT NULL,
          agent_type TEXT,
          status TEXT NOT NULL,
          current_task TEXT,
          joined_at_ms INTEGER NOT NULL,
          last_active_at_ms INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_members_joined
          ON members(joined_at_ms, session_key);

        CREATE TABLE IF NOT EXISTS messages (
          id TEXT PRIMARY KEY,
          sender TEXT NOT NULL,
          recipient TEXT NOT NULL DEFAULT '',
          kind TEXT NOT NULL,
          content TEXT NOT NULL,
          summary TEXT,
          request_id TEXT,
          approve INTEGER,
          created_at_ms INTEGER NOT NULL,
          delivered INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_messages_recipient_created
          ON messages(recipient, created_at_ms, id);
        "#,
    )?;

    let state = conn
        .query_row(
            "SELECT schema_version, team FROM ledger_state WHERE singleton=1",
            [],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;

    match state {
        Some((version, _)) if version != SCHEMA_VERSION => Err(StoreError::InvalidInput(
            "unsupported ledger schema version",
        )),
        Some((_, stored_team)) if stored_team != team => Err(StoreError::InvalidInput(
            "ledger belongs to a different team",
        )),
        Some(_) => Ok(()),
        None => {
            conn.execute(
                "INSERT INTO ledger_state(singleton, schema_version, team, created_at_ms, updated_at_ms) \
                 VALUES (1, ?1, ?2, ?3, ?3)",
                params![SCHEMA_VERSION, team, now_ms],
            )?;
            Ok(())
        }
    }
}

fn next_counter_tx(tx: &Transaction<'_>, name: &str) -> Result<i64, StoreError> {
    let current: i64 = tx
        .query_row(
            "SELECT value FROM counters WHERE name=?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0);
    let next = current + 1;
    tx.execute(
        "INSERT INTO counters(name, value) VALUES (?1, ?2) \
         ON CONFLICT(name) DO UPDATE SET value=excluded.value",
        params![name, next],
    )?;
    Ok(next)
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration,
        Err(_) => return 0,
    };

    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
