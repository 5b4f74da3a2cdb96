#![forbid(unsafe_code)]

pub mod graph;

pub mod ids {
    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct TeamId(String);

    impl TeamId {
        pub fn as_str(&self) -> &str {
            &self.0
        }

        pub fn try_new(value: impl Into<String>) -> Result<Self, TeamIdError> {
            let value = value.into();
            validate_team_id(&value)?;
            Ok(Self(value))
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum TeamIdError {
        Empty,
        TooLong,
        InvalidFirstChar,
        InvalidChar { ch: char, index: usize },
    }

    fn validate_team_id(value: &str) -> Result<(), TeamIdError> {
        if value.is_empty() {
            return Err(TeamIdError::Empty);
        }
        if value.len() > 128 {
            return Err(TeamIdError::TooLong);
        }
        let mut chars = value.chars();
        let Some(first) = chars.next() else {
            return Err(TeamIdError::Empty);
        };
        if !first.is_ascii_alphanumeric() {
            return Err(TeamIdError::InvalidFirstChar);
        }
        for (index, ch) in value.chars().enumerate() {
            if index == 0 {
                continue;
            }
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                continue;
            }
            return Err(TeamIdError::InvalidChar { ch, index });
        }
        Ok(())
    }

}

pub mod model {
    /// Task lifecycle: `pending -> in_progress -> completed`, with `deleted`
    /// reachable as an explicit terminal override. No transition leaves a
    /// terminal state.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum TaskStatus {
        Pending,
        InProgress,
        Completed,
        Deleted,
    }

    impl TaskStatus {
        pub fn as_str(self) -> &'static str {
            match self {
                TaskStatus::Pending => "pending",
                TaskStatus::InProgress => "in_progress",
                TaskStatus::Completed => "completed",
                TaskStatus::Deleted => "deleted",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            match value {
                "pending" => Some(TaskStatus::Pending),
                "in_progress" => Some(TaskStatus::InProgress),
                "completed" => Some(TaskStatus::Completed),
                "deleted" => Some(TaskStatus::Deleted),
                _ => None,
            }
        }

        pub fn is_terminal(self) -> bool {
            matches!(self, TaskStatus::Completed | TaskStatus::Deleted)
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum MemberRole {
        Lead,
        Member,
    }

    impl MemberRole {
        pub fn as_str(self) -> &'static str {
            match self {
                MemberRole::Lead => "lead",
                MemberRole::Member => "member",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            match value {
                "lead" => Some(MemberRole::Lead),
                "member" => Some(MemberRole::Member),
                _ => None,
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum MemberStatus {
        Idle,
        Working,
        Blocked,
    }

    impl MemberStatus {
        pub fn as_str(self) -> &'static str {
            match self {
                MemberStatus::Idle => "idle",
                MemberStatus::Working => "working",
                MemberStatus::Blocked => "blocked",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            match value {
                "idle" => Some(MemberStatus::Idle),
                "working" => Some(MemberStatus::Working),
                "blocked" => Some(MemberStatus::Blocked),
                _ => None,
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn task_status_round_trip() {
            for status in [
                TaskStatus::Pending,
                TaskStatus::InProgress,
                TaskStatus::Completed,
                TaskStatus::Deleted,
            ] {
                assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
            }
            assert_eq!(TaskStatus::parse("done"), None);
        }

        #[test]
        fn terminal_states() {
            assert!(TaskStatus::Completed.is_terminal());
            assert!(TaskStatus::Deleted.is_terminal());
            assert!(!TaskStatus::Pending.is_terminal());
            assert!(!TaskStatus::InProgress.is_terminal());
        }

        #[test]
        fn member_enums_round_trip() {
            assert_eq!(MemberRole::parse("lead"), Some(MemberRole::Lead));
            assert_eq!(MemberRole::parse("boss"), None);
            assert_eq!(MemberStatus::parse("working"), Some(MemberStatus::Working));
            assert_eq!(MemberStatus::parse("away"), None);
        }
    }
}
