//! Sensitive data redaction for logged HTTP traffic
//!
//! Bodies and headers exchanged with the identity provider and the CRM
//! tenant carry bearer tokens, tickets, application tokens and signed
//! system-user tokens. Everything logged at debug level passes through
//! [`Redactor`] first.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// The replacement string used for redacted values
pub const REDACTED: &str = "[REDACTED]";

/// JSON keys whose string values are always secret
const SECRET_JSON_KEYS: &[&str] = &[
    "access_token",
    "refresh_token",
    "id_token",
    "client_secret",
    "code_verifier",
    "Token",
    "SignedSystemToken",
    "ApplicationToken",
    "SystemUserToken",
    "Ticket",
];

/// Form fields whose values are always secret
const SECRET_FORM_FIELDS: &[&str] = &[
    "code",
    "code_verifier",
    "refresh_token",
    "client_secret",
];

static REDACTION_PATTERNS: LazyLock<Vec<RedactionPattern>> = LazyLock::new(|| {
    let mut patterns = vec![
        // Authorization header, bearer token or SOTicket
        RedactionPattern::new(r"(?i)(Authorization:\s*(?:Bearer|SOTicket)\s+)\S+"),
        // Application token header
        RedactionPattern::new(r"(?i)(SO-AppToken:\s*)\S+"),
        // Credentials in URLs (user:password@host)
        RedactionPattern::new(r"(://[^:/\s]+:)[^@\s]+(@)"),
    ];

    for key in SECRET_JSON_KEYS {
        patterns.push(RedactionPattern::new(&format!(
            r#"("{}"\s*:\s*")[^"]*(")"#,
            regex::escape(key)
        )));
    }
    for field in SECRET_FORM_FIELDS {
        patterns.push(RedactionPattern::new(&format!(
            r"((?:^|[?&\s]){}=)[^&\s]+",
            regex::escape(field)
        )));
    }
    patterns
});

/// A pattern whose first capture group is kept and whose match is masked.
/// An optional second group is kept after the mask.
struct RedactionPattern {
    regex: Regex,
}

impl RedactionPattern {
    fn new(pattern: &str) -> Self {
        Self {
            regex: Regex::new(pattern).expect("Invalid redaction pattern"),
        }
    }

    fn apply<'a>(&self, input: &'a str) -> Cow<'a, str> {
        self.regex.replace_all(input, |caps: &regex::Captures| {
            let suffix = caps.get(2).map_or("", |m| m.as_str());
            format!("{}{REDACTED}{suffix}", &caps[1])
        })
    }
}

impl std::fmt::Debug for RedactionPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedactionPattern")
            .field("regex", &self.regex.as_str())
            .finish()
    }
}

/// Redactor for sensitive data in strings
#[derive(Debug, Default, Clone, Copy)]
pub struct Redactor;

impl Redactor {
    pub fn new() -> Self {
        Self
    }

    /// Mask tokens, tickets and secrets in the input.
    ///
    /// Returns the input unchanged (borrowed) when nothing matched.
    pub fn redact<'a>(&self, input: &'a str) -> Cow<'a, str> {
        let mut result: Cow<'a, str> = Cow::Borrowed(input);

        for pattern in REDACTION_PATTERNS.iter() {
            let redacted = match pattern.apply(&result) {
                Cow::Owned(owned) => Some(owned),
                Cow::Borrowed(_) => None,
            };
            if let Some(owned) = redacted {
                result = Cow::Owned(owned);
            }
        }

        result
    }

    /// Redact and return an owned String
    pub fn redact_string(&self, input: &str) -> String {
        self.redact(input).into_owned()
    }

    /// Mask a bare secret for display, keeping a short prefix.
    pub fn mask_token(&self, token: &str) -> String {
        let prefix: String = token.chars().take(6).collect();
        if token.chars().count() <= 12 {
            REDACTED.to_string()
        } else {
            format!("{prefix}...{REDACTED}")
        }
    }
}
