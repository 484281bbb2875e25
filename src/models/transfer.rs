//! Transfer listing models.
//!
//! Only the fields callers commonly need are typed; everything else the
//! service returns is kept in `extra` so no data is lost.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::enums::{TaskStatus, TaskType};
use super::primitives::{EndpointId, TaskId};

/// A Transfer endpoint or collection, as returned by endpoint search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    /// Endpoint ID
    pub id: EndpointId,
    /// Display name chosen by the owner
    #[serde(default)]
    pub display_name: Option<String>,
    /// Owner identity, rendered as a username
    #[serde(default)]
    pub owner_string: Option<String>,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Organization name
    #[serde(default)]
    pub organization: Option<String>,
    /// Whether the endpoint is visible to all users
    #[serde(default)]
    pub public: bool,
    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A Transfer or Delete task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Task ID
    pub task_id: TaskId,
    /// Kind of task
    #[serde(rename = "type", default = "unknown_task_type")]
    pub task_type: TaskType,
    /// Current status
    pub status: TaskStatus,
    /// User-supplied label
    #[serde(default)]
    pub label: Option<String>,
    /// Source endpoint
    #[serde(default)]
    pub source_endpoint_id: Option<EndpointId>,
    /// Destination endpoint (absent for deletes)
    #[serde(default)]
    pub destination_endpoint_id: Option<EndpointId>,
    /// When the task was submitted
    #[serde(default)]
    pub request_time: Option<DateTime<Utc>>,
    /// When the task finished
    #[serde(default)]
    pub completion_time: Option<DateTime<Utc>>,
    /// Number of files moved so far
    #[serde(default)]
    pub files_transferred: u64,
    /// Bytes moved so far
    #[serde(default)]
    pub bytes_transferred: u64,
    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn unknown_task_type() -> TaskType {
    TaskType::Unknown
}

/// One file successfully moved by a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessfulTransfer {
    /// Path on the source endpoint
    pub source_path: String,
    /// Path on the destination endpoint
    #[serde(default)]
    pub destination_path: Option<String>,
    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Transfer's `result` document, returned by write operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult {
    /// Outcome code, e.g. `Canceled` or `Updated`
    pub code: String,
    /// Human-readable message
    #[serde(default)]
    pub message: Option<String>,
    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
