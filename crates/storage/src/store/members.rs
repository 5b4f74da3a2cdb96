#![forbid(unsafe_code)]

use super::*;
use tl_core::model::{MemberRole, MemberStatus};

const MEMBER_COLUMNS: &str = "session_key, agent_id, name, role, agent_type, status, \
     current_task, joined_at_ms, last_active_at_ms";

impl TeamLedger {
    /// Registers a member, or refreshes one already registered under the
    /// same name. The upsert is a single statement: a new row joins idle
    /// with `joined_at=now`; an existing row keeps its join time while
    /// agent id, role, type and status are overwritten and the current-task
    /// slot is cleared.
    pub fn add_member(&mut self, request: MemberUpsertRequest) -> Result<MemberRecord, StoreError> {
        if request.name.trim().is_empty() {
            return Err(StoreError::InvalidInput("member name must not be empty"));
        }

        let now_ms = now_ms();
        let conn = self.conn_mut()?;
        conn.execute(
            "INSERT INTO members(session_key, agent_id, name, role, agent_type, status, \
                                 current_task, joined_at_ms, last_active_at_ms) \
             VALUES (?1, ?2, ?1, ?3, ?4, ?5, NULL, ?6, ?6) \
             ON CONFLICT(session_key) DO UPDATE SET \
               agent_id=excluded.agent_id, \
               name=excluded.name, \
               role=excluded.role, \
               agent_type=excluded.agent_type, \
               status=excluded.status, \
               current_task=NULL, \
               last_active_at_ms=excluded.last_active_at_ms",
            params![
                request.name,
                request.agent_id,
                request.role.as_str(),
                request.agent_type,
                request.status.as_str(),
                now_ms
            ],
        )?;

        self.get_member(&request.name)?
            .ok_or(StoreError::InvalidInput("member row missing after upsert"))
    }

    pub fn get_member(&self, name: &str) -> Result<Option<MemberRecord>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE session_key=?1");
        let raw = conn
            .query_row(&sql, params![name], read_raw_member)
            .optional()?;
        raw.map(decode_member).transpose()
    }

    pub fn list_members(&self) -> Result<Vec<MemberRecord>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} FROM members ORDER BY joined_at_ms ASC, session_key ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(decode_member(read_raw_member(row)?)?);
        }
        Ok(out)
    }

    /// Reports activity. `last_active_at` is always refreshed; a status is
    /// written when given. The outer `Option` on `current_task` is
    /// "provided or not": `Some(task)` writes the slot (including
    /// `Some(None)` to clear it explicitly), while `None` leaves it alone.
    /// Exception: a member going idle has released its task, so an idle
    /// status without an explicit task clears the slot.
    pub fn update_member_activity(
        &mut self,
        name: &str,
        status: Option<MemberStatus>,
        current_task: Option<Option<String>>,
    ) -> Result<bool, StoreError> {
        let now_ms = now_ms();
        let conn = self.conn_mut()?;
        let tx = conn.transaction()?;

        let row = tx
            .query_row(
                "SELECT status, current_task FROM members WHERE session_key=?1",
                params![name],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
            )
            .optional()?;
        let Some((existing_status, existing_task)) = row else {
            return Ok(false);
        };

        let new_status = match status {
            Some(status) => status.as_str().to_string(),
            None => existing_status,
        };
        let new_task = match current_task {
            Some(task) => task,
            None => match status {
                Some(MemberStatus::Idle) => None,
                _ => existing_task,
            },
        };

        tx.execute(
            "UPDATE members SET status=?2, current_task=?3, last_active_at_ms=?4 \
             WHERE session_key=?1",
            params![name, new_status, new_task, now_ms],
        )?;

        tx.commit()?;
        Ok(true)
    }

    /// Unconditional removal; any tasks the member still owns are left
    /// claimed and must be released by the caller first.
    pub fn remove_member(&mut self, name: &str) -> Result<bool, StoreError> {
        let conn = self.conn_mut()?;
        let changed = conn.execute("DELETE FROM members WHERE session_key=?1", params![name])?;
        Ok(changed > 0)
    }
}

struct RawMemberRow {
    session_key: String,
    agent_id: String,
    name: String,
    role: String,
    agent_type: Option<String>,
    status: String,
    current_task: Option<String>,
    joined_at_ms: i64,
    last_active_at_ms: Option<i64>,
}

fn read_raw_member(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawMemberRow> {
    Ok(RawMemberRow {
        session_key: row.get(0)?,
        agent_id: row.get(1)?,
        name: row.get(2)?,
        role: row.get(3)?,
        agent_type: row.get(4)?,
        status: row.get(5)?,
        current_task: row.get(6)?,
        joined_at_ms: row.get(7)?,
        last_active_at_ms: row.get(8)?,
    })
}

fn decode_member(raw: RawMemberRow) -> Result<MemberRecord, StoreError> {
    let role = MemberRole::parse(&raw.role)
        .ok_or(StoreError::InvalidInput("invalid member role in row"))?;
    let status = MemberStatus::parse(&raw.status)
        .ok_or(StoreError::InvalidInput("invalid member status in row"))?;
    Ok(MemberRecord {
        session_key: raw.session_key,
        agent_id: raw.agent_id,
        name: raw.name,
        role,
        agent_type: raw.agent_type,
        status,
        current_task: raw.current_task,
        joined_at_ms: raw.joined_at_ms,
        last_active_at_ms: raw.last_active_at_ms,
    })
}
