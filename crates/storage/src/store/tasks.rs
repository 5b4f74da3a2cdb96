#![forbid(unsafe_code)]

use super::support::{encode_id_array, parse_id_array, parse_metadata};
use super::*;
use std::collections::BTreeMap;
use tl_core::model::TaskStatus;

const TASK_COLUMNS: &str = "id, subject, description, active_form, status, owner, \
     blocked_by, blocks, metadata, created_at_ms, claimed_at_ms, completed_at_ms";

impl TeamLedger {
    /// Allocates a new pending, unowned task with empty dependency sets.
    pub fn create_task(&mut self, request: CreateTaskRequest) -> Result<TaskRecord, StoreError> {
        if request.subject.trim().is_empty() {
            return Err(StoreError::InvalidInput("task subject must not be empty"));
        }

        let now_ms = now_ms();
        let conn = self.conn_mut()?;
        let tx = conn.transaction()?;

        let seq = next_counter_tx(&tx, "task_seq")?;
        let id = format!("TASK-{seq:03}");
        let metadata_json = request.metadata.as_ref().map(|value| value.to_string());

        tx.execute(
            "INSERT INTO tasks(id, subject, description, active_form, status, owner, \
                               blocked_by, blocks, metadata, created_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, '', '[]', '[]', ?6, ?7)",
            params![
                id,
                request.subject,
                request.description,
                request.active_form,
                TaskStatus::Pending.as_str(),
                metadata_json,
                now_ms
            ],
        )?;

        tx.commit()?;
        Ok(TaskRecord {
            id,
            subject: request.subject,
            description: request.description,
            active_form: request.active_form,
            status: TaskStatus::Pending,
            owner: String::new(),
            blocked_by: Vec::new(),
            blocks: Vec::new(),
            metadata: request.metadata,
            created_at_ms: now_ms,
            claimed_at_ms: None,
            completed_at_ms: None,
        })
    }

    pub fn list_tasks(&self) -> Result<Vec<TaskRecord>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at_ms ASC, id ASC");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(decode_task(read_raw_task(row)?)?);
        }
        Ok(out)
    }

    pub fn get_task(&self, task_id: &str) -> Result<Option<TaskRecord>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id=?1");
        let raw = conn
            .query_row(&sql, params![task_id], read_raw_task)
            .optional()?;
        raw.map(decode_task).transpose()
    }

    /// "What can I pick up next": pending, unowned tasks whose `blocked_by`
    /// set is empty, oldest-created first. Emptiness is decided on the
    /// decoded set, not the stored text, so a corrupt column reads as
    /// unblocked here exactly as it does on every other read path.
    pub fn find_available_tasks(&self, limit: usize) -> Result<Vec<TaskRecord>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks \
             WHERE status=?1 \
               AND (owner IS NULL OR owner='') \
             ORDER BY created_at_ms ASC, id ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![TaskStatus::Pending.as_str()])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            if out.len() == limit {
                break;
            }
            let record = decode_task(read_raw_task(row)?)?;
            if record.blocked_by.is_empty() {
                out.push(record);
            }
        }
        Ok(out)
    }

    /// Takes exclusive ownership of a task.
    ///
    /// The grant is a single conditional UPDATE carrying the whole guard
    /// (non-terminal status, owner empty or already us, no outstanding
    /// blockers), so two agents racing on one id can never both succeed.
    /// Re-claiming by the current owner succeeds and keeps the original
    /// `claimed_at` timestamp. When the write touches no row, the refusal is
    /// classified inside the same transaction.
    pub fn claim_task(
        &mut self,
        task_id: &str,
        agent_name: &str,
    ) -> Result<ClaimOutcome, StoreError> {
        if agent_name.trim().is_empty() {
            return Err(StoreError::InvalidInput("agent name must not be empty"));
        }

        let now_ms = now_ms();
        let conn = self.conn_mut()?;
        let tx = conn.transaction()?;

        let changed = tx.execute(
            "UPDATE tasks \
             SET status=?2, owner=?3, claimed_at_ms=COALESCE(claimed_at_ms, ?4) \
             WHERE id=?1 \
               AND status IN ('pending', 'in_progress') \
               AND (owner='' OR owner=?3) \
               AND (blocked_by='' OR blocked_by='[]')",
            params![task_id, TaskStatus::InProgress.as_str(), agent_name, now_ms],
        )?;

        if changed > 0 {
            tx.commit()?;
            return Ok(ClaimOutcome::Claimed);
        }

        let row = tx
            .query_row(
                "SELECT status, owner, blocked_by FROM tasks WHERE id=?1",
                params![task_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;

        let outcome = match row {
            None => ClaimOutcome::NotFound,
            Some((status, owner, blocked_by)) => match TaskStatus::parse(&status) {
                Some(TaskStatus::Completed) => ClaimOutcome::TaskCompleted,
                Some(TaskStatus::Deleted) => ClaimOutcome::TaskDeleted,
                None => return Err(StoreError::InvalidInput("invalid task status in row")),
                Some(_) if !owner.is_empty() && owner != agent_name => {
                    ClaimOutcome::OwnedByOther { owner }
                }
                Some(_) => {
                    let blocked_by = parse_id_array(blocked_by.as_deref());
                    if blocked_by.is_empty() {
                        // The guard compares canonical text, the decoder
                        // reads corrupt text as the empty set. When they
                        // disagree the decoder wins: repair the column and
                        // grant the claim in the same transaction.
                        tx.execute(
                            "UPDATE tasks \
                             SET status=?2, owner=?3, \
                                 claimed_at_ms=COALESCE(claimed_at_ms, ?4), \
                                 blocked_by='[]' \
                             WHERE id=?1",
                            params![
                                task_id,
                                TaskStatus::InProgress.as_str(),
                                agent_name,
                                now_ms
                            ],
                        )?;
                        tx.commit()?;
                        return Ok(ClaimOutcome::Claimed);
                    }
                    ClaimOutcome::Blocked { blocked_by }
                }
            },
        };

        Ok(outcome)
    }

    /// Marks a claimed task completed and runs the unblock cascade: this
    /// task's id is removed from every dependent's `blocked_by` set in the
    /// same transaction. The cascade is the only path by which blocked tasks
    /// become claimable.
    pub fn complete_task(&mut self, task_id: &str) -> Result<CompleteOutcome, StoreError> {
        let now_ms = now_ms();
        let conn = self.conn_mut()?;
        let tx = conn.transaction()?;

        let row = tx
            .query_row(
                "SELECT status, blocks FROM tasks WHERE id=?1",
                params![task_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
            )
            .optional()?;

        let Some((status, blocks)) = row else {
            return Ok(CompleteOutcome::NotFound);
        };

        match TaskStatus::parse(&status) {
            Some(TaskStatus::InProgress) => {}
            Some(TaskStatus::Pending) => return Ok(CompleteOutcome::NotYetClaimed),
            Some(TaskStatus::Completed) => return Ok(CompleteOutcome::AlreadyCompleted),
            Some(TaskStatus::Deleted) => return Ok(CompleteOutcome::TaskDeleted),
            None => return Err(StoreError::InvalidInput("invalid task status in row")),
        }

        tx.execute(
            "UPDATE tasks SET status=?2, completed_at_ms=?3 WHERE id=?1",
            params![task_id, TaskStatus::Completed.as_str(), now_ms],
        )?;

        let mut unblocked = Vec::new();
        for dependent_id in parse_id_array(blocks.as_deref()) {
            let blocked_by = tx
                .query_row(
                    "SELECT blocked_by FROM tasks WHERE id=?1",
                    params![dependent_id],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional()?;
            // A dangling dependent (deleted since the edge was added) is
            // skipped; the inverse index is not pruned on delete.
            let Some(blocked_by) = blocked_by else {
                continue;
            };

            let mut remaining = parse_id_array(blocked_by.as_deref());
            let before = remaining.len();
            remaining.retain(|id| id != task_id);
            if remaining.len() == before {
                continue;
            }

            tx.execute(
                "UPDATE tasks SET blocked_by=?2 WHERE id=?1",
                params![dependent_id, encode_id_array(&remaining)],
            )?;
            if remaining.is_empty() {
                unblocked.push(dependent_id);
            }
        }

        tx.commit()?;
        Ok(CompleteOutcome::Completed { unblocked })
    }

    /// Administrative status override. Does not run the completion cascade;
    /// callers that need the cascade must use `complete_task`.
    pub fn update_task_status(
        &mut self,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<bool, StoreError> {
        let conn = self.conn_mut()?;
        let changed = conn.execute(
            "UPDATE tasks SET status=?2 WHERE id=?1",
            params![task_id, status.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Removes the task row outright. Edges referencing the deleted id are
    /// left in place: a dependent blocked on it stays blocked until an
    /// operator intervenes, which is the safe reading of a prerequisite that
    /// never finished.
    pub fn delete_task(&mut self, task_id: &str) -> Result<bool, StoreError> {
        let conn = self.conn_mut()?;
        let changed = conn.execute("DELETE FROM tasks WHERE id=?1", params![task_id])?;
        Ok(changed > 0)
    }

    /// Records "`task_id` is blocked by `depends_on_id`". The forward edge
    /// and its inverse are written in one transaction so the pair cannot
    /// diverge. Idempotent when the edge already exists.
    pub fn add_task_dependency(
        &mut self,
        task_id: &str,
        depends_on_id: &str,
    ) -> Result<AddDependencyOutcome, StoreError> {
        let conn = self.conn_mut()?;
        let tx = conn.transaction()?;

        let task_blocked_by = tx
            .query_row(
                "SELECT blocked_by FROM tasks WHERE id=?1",
                params![task_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        let Some(task_blocked_by) = task_blocked_by else {
            return Ok(AddDependencyOutcome::TaskNotFound {
                task_id: task_id.to_string(),
            });
        };

        let depends_on_blocks = tx
            .query_row(
                "SELECT blocks FROM tasks WHERE id=?1",
                params![depends_on_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        let Some(depends_on_blocks) = depends_on_blocks else {
            return Ok(AddDependencyOutcome::TaskNotFound {
                task_id: depends_on_id.to_string(),
            });
        };

        let mut blocked_by = parse_id_array(task_blocked_by.as_deref());
        if blocked_by.iter().any(|id| id == depends_on_id) {
            return Ok(AddDependencyOutcome::AlreadyPresent);
        }
        blocked_by.push(depends_on_id.to_string());
        tx.execute(
            "UPDATE tasks SET blocked_by=?2 WHERE id=?1",
            params![task_id, encode_id_array(&blocked_by)],
        )?;

        let mut blocks = parse_id_array(depends_on_blocks.as_deref());
        if !blocks.iter().any(|id| id == task_id) {
            blocks.push(task_id.to_string());
            tx.execute(
                "UPDATE tasks SET blocks=?2 WHERE id=?1",
                params![depends_on_id, encode_id_array(&blocks)],
            )?;
        }

        tx.commit()?;
        Ok(AddDependencyOutcome::Added)
    }

    /// Scans the whole `blocked_by` graph and returns every distinct cycle.
    /// Intended as a pre-flight validator before accepting new edges.
    pub fn detect_circular_dependencies(&self) -> Result<Vec<Vec<String>>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, blocked_by FROM tasks")?;
        let mut rows = stmt.query([])?;

        let mut deps = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            let blocked_by: Option<String> = row.get(1)?;
            deps.insert(id, parse_id_array(blocked_by.as_deref()));
        }

        Ok(tl_core::graph::find_cycles(&deps))
    }
}

struct RawTaskRow {
    id: String,
    subject: String,
    description: String,
    active_form: Option<String>,
    status: String,
    owner: String,
    blocked_by: Option<String>,
    blocks: Option<String>,
    metadata: Option<String>,
    created_at_ms: i64,
    claimed_at_ms: Option<i64>,
    completed_at_ms: Option<i64>,
}

fn read_raw_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTaskRow> {
    Ok(RawTaskRow {
        id: row.get(0)?,
        subject: row.get(1)?,
        description: row.get(2)?,
        active_form: row.get(3)?,
        status: row.get(4)?,
        owner: row.get(5)?,
        blocked_by: row.get(6)?,
        blocks: row.get(7)?,
        metadata: row.get(8)?,
        created_at_ms: row.get(9)?,
        claimed_at_ms: row.get(10)?,
        completed_at_ms: row.get(11)?,
    })
}

fn decode_task(raw: RawTaskRow) -> Result<TaskRecord, StoreError> {
    let status = TaskStatus::parse(&raw.status)
        .ok_or(StoreError::InvalidInput("invalid task status in row"))?;
    Ok(TaskRecord {
        id: raw.id,
        subject: raw.subject,
        description: raw.description,
        active_form: raw.active_form,
        status,
        owner: raw.owner,
        blocked_by: parse_id_array(raw.blocked_by.as_deref()),
        blocks: parse_id_array(raw.blocks.as_deref()),
        metadata: parse_metadata(raw.metadata.as_deref()),
        created_at_ms: raw.created_at_ms,
        claimed_at_ms: raw.claimed_at_ms,
        completed_at_ms: raw.completed_at_ms,
    })
}
