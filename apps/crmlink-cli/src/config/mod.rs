//! Settings file loading for the crmlink CLI

mod paths;
mod settings;

pub use paths::{SettingsPaths, DEFAULT_SETTINGS_FILE, SETTINGS_ENV_VAR};
pub use settings::{
    InteractiveSettings, RuntimeSettings, Settings, SystemUserSettings, DEFAULT_CONTACT_ID,
    DEFAULT_TIMEOUT_SECS,
};
