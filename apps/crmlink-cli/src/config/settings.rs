//! Settings model
//!
//! The settings file is JSON with two sections. `ApplicationSettings`
//! drives the interactive sign-in, `Configuration` drives the system-user
//! exchange. Key lookup is case-insensitive.
//!
//! ```json
//! {
//!   "ApplicationSettings": {
//!     "ClientId": "...", "ClientSecret": "...", "Environment": "sod"
//!   },
//!   "Configuration": {
//!     "ClientSecret": "...", "ContextIdentifier": "Cust12345",
//!     "SubDomain": "sod", "SystemUserToken": "...", "PrivateKey": "keys/private.pem"
//!   },
//!   "ContactId": 5,
//!   "RefreshPolicy": "keep-until-expiry"
//! }
//! ```

use super::paths::SettingsPaths;
use crate::error::{CliError, CliResult};
use crmlink_session::RefreshPolicy;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::debug;

/// Contact fetched when the settings do not name one.
pub const DEFAULT_CONTACT_ID: i32 = 5;

/// HTTP timeout when the settings do not name one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const APPLICATION_SECTION: &str = "ApplicationSettings";
const SYSTEM_USER_SECTION: &str = "Configuration";

/// Settings for the interactive OIDC sign-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractiveSettings {
    pub client_id: String,
    /// Identity provider base URL, without trailing slash
    pub authority: String,
    /// Application token, sent to the NetServer proxy
    pub client_secret: String,
}

/// Settings for the system-user exchange
#[derive(Clone, PartialEq, Eq)]
pub struct SystemUserSettings {
    /// Application token
    pub client_secret: String,
    pub context_identifier: String,
    pub sub_domain: String,
    pub system_user_token: String,
    /// RSA private key in PEM form
    pub private_key_pem: String,
}

impl std::fmt::Debug for SystemUserSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemUserSettings")
            .field("client_secret", &"[REDACTED]")
            .field("context_identifier", &self.context_identifier)
            .field("sub_domain", &self.sub_domain)
            .field("system_user_token", &"[REDACTED]")
            .field("private_key_pem", &"[REDACTED]")
            .finish()
    }
}

/// Settings shared by both flows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub contact_id: i32,
    pub timeout_secs: u64,
    pub refresh_policy: RefreshPolicy,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            contact_id: DEFAULT_CONTACT_ID,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            refresh_policy: RefreshPolicy::default(),
        }
    }
}

/// The settings file as written, with keys folded to lower case.
#[derive(Clone, Default, Deserialize)]
struct SettingsFile {
    #[serde(default, rename = "applicationsettings")]
    application: Option<ApplicationSection>,
    #[serde(default, rename = "configuration")]
    system_user: Option<SystemUserSection>,
    #[serde(default, rename = "contactid")]
    contact_id: Option<Value>,
    #[serde(default, rename = "timeoutsecs")]
    timeout_secs: Option<Value>,
    #[serde(default, rename = "refreshpolicy", deserialize_with = "text")]
    refresh_policy: Option<String>,
}

#[derive(Clone, Default, Deserialize)]
struct ApplicationSection {
    #[serde(default, rename = "clientid", deserialize_with = "text")]
    client_id: Option<String>,
    #[serde(default, rename = "clientsecret", deserialize_with = "text")]
    client_secret: Option<String>,
    #[serde(default, deserialize_with = "text")]
    environment: Option<String>,
    #[serde(default, deserialize_with = "text")]
    authority: Option<String>,
}

#[derive(Clone, Default, Deserialize)]
struct SystemUserSection {
    #[serde(default, rename = "clientsecret", deserialize_with = "text")]
    client_secret: Option<String>,
    #[serde(default, rename = "contextidentifier", deserialize_with = "text")]
    context_identifier: Option<String>,
    #[serde(default, rename = "subdomain", deserialize_with = "text")]
    sub_domain: Option<String>,
    #[serde(default, rename = "systemusertoken", deserialize_with = "text")]
    system_user_token: Option<String>,
    #[serde(default, rename = "privatekey", deserialize_with = "text")]
    private_key: Option<String>,
}

/// Parsed settings file
#[derive(Clone)]
pub struct Settings {
    file: SettingsFile,
    paths: SettingsPaths,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("application_settings", &self.file.application.is_some())
            .field("configuration", &self.file.system_user.is_some())
            .field("paths", &self.paths)
            .finish()
    }
}

impl Settings {
    /// Load and parse the settings file
    pub fn load(paths: &SettingsPaths) -> CliResult<Self> {
        let text = paths.read()?;
        debug!(path = %paths.settings_file.display(), "Loaded settings file");
        Self::from_json(&text, paths.clone())
    }

    /// Parse settings from JSON text
    pub fn from_json(text: &str, paths: SettingsPaths) -> CliResult<Self> {
        let invalid = |e: serde_json::Error| {
            CliError::Config(format!(
                "Invalid settings file {}: {e}",
                paths.settings_file.display()
            ))
        };

        let root = match serde_json::from_str::<Value>(text).map_err(invalid)? {
            Value::Object(root) => root,
            _ => {
                return Err(CliError::Config(
                    "Settings file must contain a JSON object".to_string(),
                ))
            }
        };
        let file = serde_json::from_value(fold_keys(root)).map_err(invalid)?;

        Ok(Self { file, paths })
    }

    /// Settings for the interactive sign-in
    pub fn interactive(&self) -> CliResult<InteractiveSettings> {
        let section = self.file.application.clone().unwrap_or_default();
        let client_id = required(APPLICATION_SECTION, "ClientId", section.client_id)?;
        let client_secret = required(APPLICATION_SECTION, "ClientSecret", section.client_secret)?;

        let authority = match section.authority {
            Some(authority) => authority,
            None => {
                let environment =
                    required(APPLICATION_SECTION, "Environment", section.environment)?;
                format!("https://{environment}.superoffice.com")
            }
        };
        url::Url::parse(&authority).map_err(|e| {
            CliError::Config(format!("Invalid authority URL '{authority}': {e}"))
        })?;

        Ok(InteractiveSettings {
            client_id,
            authority: authority.trim_end_matches('/').to_string(),
            client_secret,
        })
    }

    /// Settings for the system-user exchange
    pub fn system_user(&self) -> CliResult<SystemUserSettings> {
        let section = self.file.system_user.clone().unwrap_or_default();
        let private_key = required(SYSTEM_USER_SECTION, "PrivateKey", section.private_key)?;

        Ok(SystemUserSettings {
            client_secret: required(SYSTEM_USER_SECTION, "ClientSecret", section.client_secret)?,
            context_identifier: required(
                SYSTEM_USER_SECTION,
                "ContextIdentifier",
                section.context_identifier,
            )?,
            sub_domain: required(SYSTEM_USER_SECTION, "SubDomain", section.sub_domain)?,
            system_user_token: required(
                SYSTEM_USER_SECTION,
                "SystemUserToken",
                section.system_user_token,
            )?,
            private_key_pem: self.resolve_private_key(&private_key)?,
        })
    }

    /// Optional top-level settings
    pub fn runtime(&self) -> CliResult<RuntimeSettings> {
        let mut runtime = RuntimeSettings::default();

        if let Some(value) = &self.file.contact_id {
            runtime.contact_id = as_integer(value)
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| CliError::Config(format!("ContactId must be an integer, got {value}")))?;
        }
        if let Some(value) = &self.file.timeout_secs {
            runtime.timeout_secs = as_integer(value)
                .and_then(|n| u64::try_from(n).ok())
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    CliError::Config(format!("TimeoutSecs must be a positive integer, got {value}"))
                })?;
        }
        if let Some(policy) = &self.file.refresh_policy {
            runtime.refresh_policy = policy.parse().map_err(CliError::Config)?;
        }

        Ok(runtime)
    }

    /// Inline PEM, or a path to a PEM file relative to the settings file.
    fn resolve_private_key(&self, value: &str) -> CliResult<String> {
        let trimmed = value.trim();
        if trimmed.starts_with("-----BEGIN") {
            return Ok(trimmed.replace("\\n", "\n"));
        }
        if trimmed.starts_with("<RSAKeyValue>") {
            return Err(CliError::Config(
                "PrivateKey is an XML RSA key; convert it to PEM".to_string(),
            ));
        }

        let path = self.paths.resolve_relative(trimmed);
        let pem = std::fs::read_to_string(&path).map_err(|e| {
            CliError::Config(format!("Cannot read PrivateKey file {}: {e}", path.display()))
        })?;
        if !pem.contains("-----BEGIN") {
            return Err(CliError::Config(format!(
                "PrivateKey file {} is not PEM encoded",
                path.display()
            )));
        }
        Ok(pem)
    }
}

/// Lower-case every object key so lookups ignore case.
fn fold_keys(map: Map<String, Value>) -> Value {
    Value::Object(
        map.into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::Object(inner) => fold_keys(inner),
                    other => other,
                };
                (key.to_ascii_lowercase(), value)
            })
            .collect(),
    )
}

/// A setting given as a string or a number. Blank strings count as absent.
fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn required(section_name: &str, key: &str, value: Option<String>) -> CliResult<String> {
    value.ok_or_else(|| CliError::Config(format!("Missing required setting {section_name}:{key}")))
}
