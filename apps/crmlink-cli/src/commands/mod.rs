//! CLI command implementations

pub mod claims;
pub mod interactive;
pub mod system_user;

use crate::api::build_http_client;
use crate::config::{RuntimeSettings, Settings};
use crate::error::CliResult;
use crmlink_session::{CredentialAcquirer, SessionOrchestrator};
use reqwest::Client;
use tokio_util::sync::CancellationToken;

/// State shared by every command
#[derive(Debug)]
pub struct CommandContext {
    pub settings: Settings,
    pub cancel: CancellationToken,
}

impl CommandContext {
    pub fn new(settings: Settings, cancel: CancellationToken) -> Self {
        Self { settings, cancel }
    }

    /// Runtime settings and the HTTP client built from them.
    pub fn runtime(&self) -> CliResult<(RuntimeSettings, Client)> {
        let runtime = self.settings.runtime()?;
        let http = build_http_client(runtime.timeout_secs)?;
        Ok((runtime, http))
    }

    /// Orchestrator wired to this context's policy and cancellation token.
    pub fn orchestrator<A: CredentialAcquirer>(
        &self,
        acquirer: A,
        runtime: &RuntimeSettings,
    ) -> SessionOrchestrator<A> {
        SessionOrchestrator::new(acquirer)
            .with_policy(runtime.refresh_policy)
            .with_cancellation(self.cancel.clone())
    }
}
