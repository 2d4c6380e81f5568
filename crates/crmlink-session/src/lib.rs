//! Session orchestration for crmlink.
//!
//! The [`SessionOrchestrator`] drives one logical session:
//!
//! ```text
//! Unauthenticated -> Authenticating -> Authenticated -> (Invoking | Refreshing)
//!                                            ^                   |
//!                                            +-------------------+
//! ```
//!
//! Identity providers plug in through [`CredentialAcquirer`]; REST and RPC
//! proxy endpoints plug in through [`ResourceClient`].

mod acquirer;
mod context;
mod error;
mod orchestrator;
mod resource;
mod state;

pub use acquirer::CredentialAcquirer;
pub use context::{derive_context, SessionContext, PRINCIPAL_CLAIM};
pub use error::{root_cause, BoxError, InvocationError, SessionError};
pub use orchestrator::SessionOrchestrator;
pub use resource::{
    CallContext, ContactEntity, ResourceClient, ResourceKind, ResourceRequest, ResourceResponse,
};
pub use state::{RefreshPolicy, SessionState};
