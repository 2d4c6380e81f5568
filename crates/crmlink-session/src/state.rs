//! Session lifecycle state and refresh policy.

use std::fmt;
use std::str::FromStr;

/// Lifecycle of the single logical session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
    Invoking,
    Refreshing,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Authenticating => "authenticating",
            SessionState::Authenticated => "authenticated",
            SessionState::Invoking => "invoking",
            SessionState::Refreshing => "refreshing",
        };
        f.write_str(name)
    }
}

/// What happens to the session when a refresh fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Keep the current session while its access token is unexpired.
    #[default]
    KeepUntilExpiry,
    /// Drop the session on any refresh failure.
    Reauthenticate,
}

impl RefreshPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            RefreshPolicy::KeepUntilExpiry => "keep-until-expiry",
            RefreshPolicy::Reauthenticate => "reauthenticate",
        }
    }
}

impl fmt::Display for RefreshPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefreshPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep-until-expiry" | "keepuntilexpiry" => Ok(RefreshPolicy::KeepUntilExpiry),
            "reauthenticate" => Ok(RefreshPolicy::Reauthenticate),
            other => Err(format!(
                "unknown refresh policy '{other}' (expected keep-until-expiry or reauthenticate)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_and_policy() {
        assert_eq!(SessionState::default(), SessionState::Unauthenticated);
        assert_eq!(RefreshPolicy::default(), RefreshPolicy::KeepUntilExpiry);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            "keep-until-expiry".parse::<RefreshPolicy>().unwrap(),
            RefreshPolicy::KeepUntilExpiry
        );
        assert_eq!(
            " Reauthenticate ".parse::<RefreshPolicy>().unwrap(),
            RefreshPolicy::Reauthenticate
        );
        assert!("sometimes".parse::<RefreshPolicy>().is_err());
    }

    #[test]
    fn test_policy_display_round_trips() {
        for policy in [RefreshPolicy::KeepUntilExpiry, RefreshPolicy::Reauthenticate] {
            assert_eq!(policy.to_string().parse::<RefreshPolicy>().unwrap(), policy);
        }
    }
}
