//! PKCE verifier / challenge pairs and the CSRF state value

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random bytes behind a verifier (43 base64url characters).
const PKCE_VERIFIER_LENGTH: usize = 32;

/// Random bytes behind a state value.
const STATE_LENGTH: usize = 16;

/// PKCE challenge and verifier pair.
#[derive(Clone)]
pub struct PkceChallenge {
    /// Code verifier, kept until the code exchange.
    pub verifier: String,
    /// S256 code challenge, sent with the authorization request.
    pub challenge: String,
}

impl PkceChallenge {
    /// Generate a new random pair.
    #[must_use]
    pub fn generate() -> Self {
        let mut verifier_bytes = [0u8; PKCE_VERIFIER_LENGTH];
        rand::rngs::OsRng.fill_bytes(&mut verifier_bytes);
        Self::from_verifier(URL_SAFE_NO_PAD.encode(verifier_bytes))
    }

    /// Build the pair for a known verifier.
    #[must_use]
    pub fn from_verifier(verifier: impl Into<String>) -> Self {
        let verifier = verifier.into();
        let challenge = s256_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }

    /// Method name sent as `code_challenge_method`.
    pub fn method(&self) -> &'static str {
        "S256"
    }
}

impl std::fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("verifier", &"[REDACTED]")
            .field("challenge", &self.challenge)
            .finish()
    }
}

fn s256_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Random state value echoed back on the redirect.
#[must_use]
pub fn generate_state() -> String {
    let mut bytes = [0u8; STATE_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
