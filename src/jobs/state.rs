use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Job state as shown to pollers, tagged by `status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobState {
    Starting,
    Downloading {
        percent: String,
        speed: String,
        eta: String,
    },
    Processing {
        percent: String,
    },
    Completed {
        filename: String,
        filepath: String,
    },
    Error {
        error: String,
    },
    /// Answer for identifiers that were never created; never stored
    NotFound,
}

impl JobState {
    pub fn processing() -> Self {
        JobState::Processing {
            percent: "100%".to_string(),
        }
    }

    pub fn phase(&self) -> JobPhase {
        match self {
            JobState::Starting => JobPhase::Starting,
            JobState::Downloading { .. } => JobPhase::Downloading,
            JobState::Processing { .. } => JobPhase::Processing,
            JobState::Completed { .. } => JobPhase::Completed,
            JobState::Error { .. } => JobPhase::Error,
            JobState::NotFound => JobPhase::NotFound,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Starting,
    Downloading,
    Processing,
    Completed,
    Error,
    NotFound,
}

impl JobPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobPhase::Starting => "starting",
            JobPhase::Downloading => "downloading",
            JobPhase::Processing => "processing",
            JobPhase::Completed => "completed",
            JobPhase::Error => "error",
            JobPhase::NotFound => "not_found",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Completed | JobPhase::Error)
    }

    fn rank(&self) -> Option<u8> {
        match self {
            JobPhase::Starting => Some(0),
            JobPhase::Downloading => Some(1),
            JobPhase::Processing => Some(2),
            JobPhase::Completed | JobPhase::Error => Some(3),
            JobPhase::NotFound => None,
        }
    }

    /// Forward-only rule. Progress phases may repeat; terminal phases are final.
    pub fn can_advance_to(&self, next: JobPhase) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (Some(current), Some(target)) => {
                target > current
                    || (current == target
                        && matches!(next, JobPhase::Downloading | JobPhase::Processing))
            }
            _ => false,
        }
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of one job, serialized flat:
/// `{"status": "downloading", "percent": "42%", ..., "updated_at": 1700000000}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    #[serde(flatten)]
    pub state: JobState,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl JobSnapshot {
    pub fn not_found() -> Self {
        Self {
            state: JobState::NotFound,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn phase(&self) -> JobPhase {
        self.state.phase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_forward_only_rules() {
        use JobPhase::*;

        assert!(Starting.can_advance_to(Downloading));
        assert!(Starting.can_advance_to(Error));
        assert!(Downloading.can_advance_to(Downloading));
        assert!(Downloading.can_advance_to(Processing));
        assert!(Processing.can_advance_to(Completed));
        assert!(Processing.can_advance_to(Processing));

        assert!(!Starting.can_advance_to(Starting));
        assert!(!Processing.can_advance_to(Downloading));
        assert!(!Completed.can_advance_to(Error));
        assert!(!Error.can_advance_to(Completed));
        assert!(!Downloading.can_advance_to(NotFound));
        assert!(!NotFound.can_advance_to(Downloading));
    }

    #[test]
    fn test_state_serializes_with_status_tag() {
        let state = JobState::Downloading {
            percent: "42.0%".into(),
            speed: "1.2MiB/s".into(),
            eta: "00:10".into(),
        };
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({"status": "downloading", "percent": "42.0%", "speed": "1.2MiB/s", "eta": "00:10"})
        );
        assert_eq!(
            serde_json::to_value(JobState::processing()).unwrap(),
            json!({"status": "processing", "percent": "100%"})
        );
    }

    #[test]
    fn test_not_found_snapshot_is_bare() {
        assert_eq!(
            serde_json::to_value(JobSnapshot::not_found()).unwrap(),
            json!({"status": "not_found"})
        );
    }

    #[test]
    fn test_snapshot_flattens_timestamps() {
        let at = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let snapshot = JobSnapshot {
            state: JobState::Completed {
                filename: "Clip.mkv".into(),
                filepath: "downloads/id/Clip.mkv".into(),
            },
            created_at: Some(at),
            updated_at: Some(at),
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["filename"], "Clip.mkv");
        assert_eq!(value["created_at"], 1_700_000_000);

        let back: JobSnapshot = serde_json::from_value(value).unwrap();
        assert_eq!(back, snapshot);
    }
}
