//! Canonical lifecycle vocabulary for `service_request.status`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Requested,
    Accepted,
    InProgress,
    Completed,
    Closed,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 5] = [
        RequestStatus::Requested,
        RequestStatus::Accepted,
        RequestStatus::InProgress,
        RequestStatus::Completed,
        RequestStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Requested => "requested",
            RequestStatus::Accepted => "accepted",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Completed => "completed",
            RequestStatus::Closed => "closed",
        }
    }

    /// Stored values that read back as this status, legacy spellings included.
    pub fn stored_aliases(&self) -> &'static [&'static str] {
        match self {
            RequestStatus::Requested => &["requested", "pending", "rejected"],
            RequestStatus::Accepted => &["accepted", "assigned"],
            RequestStatus::InProgress => &["in_progress"],
            RequestStatus::Completed => &["completed"],
            RequestStatus::Closed => &["closed"],
        }
    }

    pub fn is_terminal(&self) -> bool { matches!(self, RequestStatus::Closed) }

    /// Work is finished; reviews may be attached.
    pub fn is_finished(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Closed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for RequestStatus {
    type Err = ModelError;

    /// Accepts canonical values plus the legacy `assigned`, `rejected` and `pending`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "requested" | "pending" | "rejected" => Ok(RequestStatus::Requested),
            "accepted" | "assigned" => Ok(RequestStatus::Accepted),
            "in_progress" => Ok(RequestStatus::InProgress),
            "completed" => Ok(RequestStatus::Completed),
            "closed" => Ok(RequestStatus::Closed),
            other => Err(ModelError::Validation(format!("unknown request status: {other}"))),
        }
    }
}
