//! Interactive OIDC sign-in
//!
//! Discovery, PKCE, the loopback redirect receiver and the
//! [`OidcAcquirer`] that ties them to the session orchestrator.

mod acquirer;
mod browser;
mod discovery;
mod loopback;
mod pkce;

pub use acquirer::{
    authorization_url, OidcAcquirer, OidcOptions, DEFAULT_LOGIN_TIMEOUT_SECS, DEFAULT_SCOPE,
};
pub use browser::{display_authorization_url, BrowserLauncher, NoBrowser, SystemBrowser};
pub use discovery::{discover, well_known_url, ProviderMetadata};
pub use loopback::{CallbackParams, LoopbackListener};
pub use pkce::{generate_state, PkceChallenge};
