//! REST contact client

use super::client::{log_exchange, truncate_chars};
use async_trait::async_trait;
use crmlink_session::{
    CallContext, InvocationError, ResourceClient, ResourceKind, ResourceRequest, ResourceResponse,
};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;

/// Build `{webapi_url}/v1/Contact/{id}`.
pub fn contact_url(webapi_url: &str, contact_id: i32) -> String {
    format!("{}/v1/Contact/{contact_id}", webapi_url.trim_end_matches('/'))
}

/// Fetches contacts from the tenant's REST web API with a bearer token.
#[derive(Debug, Clone)]
pub struct RestContactClient {
    http: Client,
}

impl RestContactClient {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ResourceClient for RestContactClient {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Rest
    }

    async fn invoke(
        &self,
        call: CallContext<'_>,
        request: &ResourceRequest,
    ) -> Result<ResourceResponse, InvocationError> {
        let ResourceRequest::Contact { id } = request;
        let url = contact_url(call.context.webapi_url(), *id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(call.access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| InvocationError::transport(format!("GET {url} failed"), e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| InvocationError::transport(format!("Reading response from {url} failed"), e))?;
        log_exchange("GET", &url, status, &body);

        if !status.is_success() {
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("no response body").to_string()
            } else {
                truncate_chars(body.trim(), 200)
            };
            return Err(InvocationError::HttpStatus {
                status: status.as_u16(),
                message,
            });
        }

        let json: Value = serde_json::from_str(&body).map_err(|e| {
            InvocationError::transport(format!("Response from {url} is not JSON"), e)
        })?;
        Ok(ResourceResponse::Json(json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_url_joins_base() {
        assert_eq!(
            contact_url("https://sod.superoffice.com/Cust1/api/", 5),
            "https://sod.superoffice.com/Cust1/api/v1/Contact/5"
        );
        assert_eq!(
            contact_url("https://sod.superoffice.com/Cust1/api", 42),
            "https://sod.superoffice.com/Cust1/api/v1/Contact/42"
        );
    }
}
