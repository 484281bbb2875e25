//! Enumeration types for the Globus APIs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// A Globus service with its own base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    /// Globus Auth (token grants, identities)
    Auth,
    /// Globus Transfer
    Transfer,
    /// Globus Search
    Search,
    /// Globus Groups
    Groups,
    /// Globus Compute
    Compute,
}

impl Service {
    /// All services, in a stable order.
    pub const ALL: [Service; 5] = [
        Service::Auth,
        Service::Transfer,
        Service::Search,
        Service::Groups,
        Service::Compute,
    ];

    /// Lowercase service name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Auth => "auth",
            Service::Transfer => "transfer",
            Service::Search => "search",
            Service::Groups => "groups",
            Service::Compute => "compute",
        }
    }

    /// Leading hostname labels, e.g. `transfer.api`.
    pub(crate) fn host_prefix(&self) -> &'static str {
        match self {
            Service::Auth => "auth",
            Service::Transfer => "transfer.api",
            Service::Search => "search.api",
            Service::Groups => "groups.api",
            Service::Compute => "compute.api",
        }
    }

    /// Versioned path prefix shared by every route of the service.
    pub(crate) fn path_prefix(&self) -> &'static str {
        match self {
            Service::Transfer => "v0.10/",
            _ => "",
        }
    }
}

impl FromStr for Service {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Service::ALL
            .into_iter()
            .find(|service| service.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Config(format!("unknown Globus service {s:?}")))
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a Transfer task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Task is queued or running
    Active,
    /// Task is paused or waiting on an error condition
    Inactive,
    /// Task completed successfully
    Succeeded,
    /// Task failed or was cancelled
    Failed,
    /// Status not known to this client
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    /// Returns `true` if the task will not change state again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }
}

/// Kind of Transfer task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    /// File transfer
    Transfer,
    /// File deletion
    Delete,
    /// Type not known to this client
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_parse() {
        assert_eq!("TRANSFER".parse::<Service>().unwrap(), Service::Transfer);
        assert_eq!("compute".parse::<Service>().unwrap(), Service::Compute);
        assert!("timers".parse::<Service>().is_err());
    }

    #[test]
    fn test_task_status_deserialize() {
        let status: TaskStatus = serde_json::from_str("\"SUCCEEDED\"").unwrap();
        assert_eq!(status, TaskStatus::Succeeded);
        assert!(status.is_terminal());

        let unknown: TaskStatus = serde_json::from_str("\"ARCHIVED\"").unwrap();
        assert_eq!(unknown, TaskStatus::Unknown);
    }
}
