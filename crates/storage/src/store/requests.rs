#![forbid(unsafe_code)]

use crate::config::TeamConfig;
use tl_core::model::{MemberRole, MemberStatus, TaskStatus};

#[derive(Clone, Debug, PartialEq)]
pub struct CreateTaskRequest {
    pub subject: String,
    pub description: String,
    pub active_form: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberUpsertRequest {
    /// Identity key: two agents registering under the same name collide on
    /// purpose, there is no hidden generated id behind it.
    pub name: String,
    pub agent_id: String,
    pub agent_type: Option<String>,
    pub role: MemberRole,
    pub status: MemberStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendMessageRequest {
    pub sender: String,
    /// Empty string addresses the broadcast inbox; broadcasts are visible
    /// only to callers retrieving with the empty recipient key.
    pub recipient: String,
    pub kind: String,
    pub content: String,
    pub summary: Option<String>,
    pub request_id: Option<String>,
    pub approve: Option<bool>,
}

/// Why a claim was granted or refused. Refusals are ordinary outcomes under
/// multi-agent contention, not errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed,
    NotFound,
    TaskCompleted,
    TaskDeleted,
    OwnedByOther { owner: String },
    Blocked { blocked_by: Vec<String> },
}

impl ClaimOutcome {
    pub fn is_claimed(&self) -> bool {
        matches!(self, Self::Claimed)
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::Claimed => None,
            Self::NotFound => Some("task not found"),
            Self::TaskCompleted => Some("task is completed"),
            Self::TaskDeleted => Some("task is deleted"),
            Self::OwnedByOther { .. } => Some("task already claimed by another agent"),
            Self::Blocked { .. } => Some("task has unmet dependencies"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompleteOutcome {
    /// Task marked completed; `unblocked` lists the dependents whose last
    /// blocker this was.
    Completed { unblocked: Vec<String> },
    NotFound,
    /// Still pending: a task must be claimed before it can be completed.
    NotYetClaimed,
    AlreadyCompleted,
    TaskDeleted,
}

impl CompleteOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddDependencyOutcome {
    Added,
    AlreadyPresent,
    TaskNotFound { task_id: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct TaskRecord {
    pub id: String,
    pub subject: String,
    pub description: String,
    pub active_form: Option<String>,
    pub status: TaskStatus,
    /// Claiming member, empty while unclaimed.
    pub owner: String,
    /// Ids that must complete before this task is claimable.
    pub blocked_by: Vec<String>,
    /// Inverse index: ids listing this task in their `blocked_by`.
    pub blocks: Vec<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at_ms: i64,
    pub claimed_at_ms: Option<i64>,
    pub completed_at_ms: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberRecord {
    pub session_key: String,
    pub agent_id: String,
    pub name: String,
    pub role: MemberRole,
    pub agent_type: Option<String>,
    pub status: MemberStatus,
    pub current_task: Option<String>,
    pub joined_at_ms: i64,
    pub last_active_at_ms: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: String,
    pub sender: String,
    pub recipient: String,
    pub kind: String,
    pub content: String,
    pub summary: Option<String>,
    pub request_id: Option<String>,
    pub approve: Option<bool>,
    pub created_at_ms: i64,
    pub delivered: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerStatus {
    Active,
    Shutdown,
}

impl LedgerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LedgerStatus::Active => "active",
            LedgerStatus::Shutdown => "shutdown",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TeamState {
    pub team_name: String,
    pub config: TeamConfig,
    pub members: Vec<MemberRecord>,
    pub tasks: Vec<TaskRecord>,
    /// The broadcast inbox (empty-recipient messages).
    pub messages: Vec<MessageRecord>,
    pub status: LedgerStatus,
}
