//! Primitive types and newtypes for type-safe API interactions.
//!
//! This module provides strongly-typed wrappers around string identifiers
//! to prevent mixing up different types of IDs at compile time, and the
//! [`Environment`] that decides which Globus deployment a client talks to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use url::Url;

use super::enums::Service;
use crate::{Error, Result};

/// A strongly-typed Transfer endpoint (collection) ID.
///
/// # Example
///
/// ```
/// use globus_sdk::EndpointId;
///
/// let endpoint = EndpointId::new("ddb59aef-6d04-11e5-ba46-22000b92c6ec");
/// println!("Endpoint: {}", endpoint);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(String);

impl EndpointId {
    /// Create a new endpoint ID from a string.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the endpoint ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EndpointId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for EndpointId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EndpointId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A strongly-typed Transfer task ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Create a new task ID.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the task ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Globus deployment to talk to.
///
/// Everything other than production is a Globus-internal or pre-release
/// deployment; they differ only in the hostnames of each service.
///
/// # Example
///
/// ```
/// use globus_sdk::{Environment, models::Service};
///
/// let env: Environment = "preview".parse().unwrap();
/// println!("Auth URL: {}", env.service_url(Service::Auth).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    /// The public Globus deployment.
    #[default]
    Production,
    /// Sandbox deployment.
    Sandbox,
    /// Preview deployment, hosted under `preview.globus.org`.
    Preview,
    /// Test deployment.
    Test,
    /// Staging deployment.
    Staging,
    /// Integration deployment.
    Integration,
}

impl Environment {
    /// Name used in hostnames and in `GLOBUS_SDK_ENVIRONMENT`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Sandbox => "sandbox",
            Environment::Preview => "preview",
            Environment::Test => "test",
            Environment::Staging => "staging",
            Environment::Integration => "integration",
        }
    }

    /// Get the base URL of a service in this environment.
    ///
    /// The returned URL always ends with `/` so that relative paths can be
    /// joined onto it.
    pub fn service_url(&self, service: Service) -> Result<Url> {
        let host = match self {
            Environment::Production => format!("{}.globus.org", service.host_prefix()),
            Environment::Preview => format!("{}.preview.globus.org", service.host_prefix()),
            other => format!("{}.{}.globuscs.info", service.host_prefix(), other.as_str()),
        };
        Ok(Url::parse(&format!("https://{}/{}", host, service.path_prefix()))?)
    }

    /// Returns `true` if this is the production environment.
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" | "default" => Ok(Environment::Production),
            "sandbox" => Ok(Environment::Sandbox),
            "preview" => Ok(Environment::Preview),
            "test" => Ok(Environment::Test),
            "staging" => Ok(Environment::Staging),
            "integration" => Ok(Environment::Integration),
            other => Err(Error::Config(format!("unknown Globus environment {other:?}"))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
