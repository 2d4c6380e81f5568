//! Resource client seam and request/response shapes.

use crate::context::SessionContext;
use crate::error::InvocationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Which downstream surface a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Rest,
    Proxy,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Rest => f.write_str("rest"),
            ResourceKind::Proxy => f.write_str("proxy"),
        }
    }
}

/// A downstream request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceRequest {
    /// Fetch a single contact by id.
    Contact { id: i32 },
}

impl ResourceRequest {
    pub fn contact(id: i32) -> Self {
        ResourceRequest::Contact { id }
    }
}

/// Contact entity returned by the proxy agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContactEntity {
    pub contact_id: i32,
    pub name: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub org_nr: Option<String>,
}

/// A downstream response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceResponse {
    /// Raw JSON body from the REST API.
    Json(Value),
    /// Typed entity from the proxy layer.
    Contact(ContactEntity),
}

impl ResourceResponse {
    /// Display name of the returned record, when it has one.
    pub fn display_name(&self) -> Option<&str> {
        match self {
            ResourceResponse::Json(body) => body.get("Name").and_then(Value::as_str),
            ResourceResponse::Contact(contact) => Some(contact.name.as_str()),
        }
    }
}

/// Per-call view of the active session handed to a resource client.
#[derive(Debug, Clone, Copy)]
pub struct CallContext<'a> {
    pub context: &'a SessionContext,
    pub access_token: &'a str,
}

/// A downstream REST or RPC client.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    fn kind(&self) -> ResourceKind;

    /// Perform one request under the given session.
    async fn invoke(
        &self,
        call: CallContext<'_>,
        request: &ResourceRequest,
    ) -> Result<ResourceResponse, InvocationError>;
}
