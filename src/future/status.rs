//! Status document written by the remote unit

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallOutcome {
    Success,
    Error { message: String },
    Cancelled,
}

/// Contents of a call's status key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStatus {
    pub callset_id: String,
    pub call_id: String,
    #[serde(flatten)]
    pub outcome: CallOutcome,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl CallStatus {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, CallOutcome::Success)
    }
}
