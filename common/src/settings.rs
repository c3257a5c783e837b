// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Account permission settings
//!
//! [`AccountSettings`] is the raw configuration as served by the settings
//! store, keyed by the server's setting ids. [`PermissionSettings`] is the
//! read-only snapshot derived from it which the form validates against.

use std::fmt;

use displaydoc::Display;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_NAMES_VALIDATION: &str = "[0-9a-zA-Z-_.]+";

#[derive(Debug, Error, Display)]
pub enum SettingsError {
    /// Invalid names validation pattern {pattern:?}
    InvalidNamesPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    /// Failed to parse account settings
    Parse(#[from] serde_json::Error),
}

/// Raw account configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountSettings {
    #[serde(rename = "Accounts_AllowRealNameChange")]
    pub allow_real_name_change: bool,
    #[serde(rename = "Accounts_AllowUserStatusMessageChange")]
    pub allow_user_status_message_change: bool,
    #[serde(rename = "Accounts_AllowUsernameChange")]
    pub allow_username_change: bool,
    #[serde(rename = "Accounts_AllowEmailChange")]
    pub allow_email_change: bool,
    #[serde(rename = "Accounts_AllowPasswordChange")]
    pub allow_password_change: bool,
    #[serde(rename = "Accounts_AllowUserAvatarChange")]
    pub allow_user_avatar_change: bool,
    #[serde(rename = "Accounts_AllowDeleteOwnAccount")]
    pub allow_delete_own_account: bool,
    #[serde(rename = "LDAP_Enable")]
    pub ldap_enabled: bool,
    #[serde(rename = "Accounts_RequireNameForSignUp")]
    pub require_name: bool,
    #[serde(rename = "UTF8_Names_Validation")]
    pub names_validation: String,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            allow_real_name_change: true,
            allow_user_status_message_change: true,
            allow_username_change: true,
            allow_email_change: true,
            allow_password_change: true,
            allow_user_avatar_change: true,
            allow_delete_own_account: false,
            ldap_enabled: false,
            require_name: true,
            names_validation: DEFAULT_NAMES_VALIDATION.to_owned(),
        }
    }
}

impl AccountSettings {
    /// Parses settings from a JSON object; absent keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Compiled name/username legality pattern
///
/// The configured pattern must match the whole value.
#[derive(Clone)]
pub struct NamesPattern {
    source: String,
    regex: Regex,
}

impl NamesPattern {
    /// Compiles the configured pattern.
    ///
    /// The setting is written for JavaScript's `RegExp`. Lookaround and
    /// backreferences are not supported here; such a pattern is reported as
    /// [`SettingsError::InvalidNamesPattern`] and the administrator has to
    /// rewrite it.
    pub fn new(source: impl Into<String>) -> Result<Self, SettingsError> {
        let source = source.into();
        let regex = Regex::new(&format!("^(?:{source})$")).map_err(|error| {
            SettingsError::InvalidNamesPattern {
                pattern: source.clone(),
                source: error,
            }
        })?;
        Ok(Self { source, regex })
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    /// The configured pattern, without anchors.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for NamesPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for NamesPattern {}

impl fmt::Debug for NamesPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NamesPattern").field(&self.source).finish()
    }
}

/// Read-only permission snapshot the form is validated against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSettings {
    pub allow_real_name_change: bool,
    pub allow_email_change: bool,
    pub allow_password_change: bool,
    pub allow_user_avatar_change: bool,
    pub allow_user_status_message_change: bool,
    pub allow_delete_own_account: bool,
    pub can_change_username: bool,
    pub require_name: bool,
    pub names_regex: NamesPattern,
}

impl PermissionSettings {
    pub fn new(settings: &AccountSettings) -> Result<Self, SettingsError> {
        let names_regex = NamesPattern::new(settings.names_validation.as_str())?;
        Ok(Self::with_pattern(settings, names_regex))
    }

    /// Derives a new snapshot from changed settings.
    ///
    /// The names pattern is only recompiled when its source changed.
    pub fn refresh(&self, settings: &AccountSettings) -> Result<Self, SettingsError> {
        let names_regex = if self.names_regex.as_str() == settings.names_validation {
            self.names_regex.clone()
        } else {
            debug!(pattern = %settings.names_validation, "Recompiling names pattern");
            NamesPattern::new(settings.names_validation.as_str())?
        };
        Ok(Self::with_pattern(settings, names_regex))
    }

    fn with_pattern(settings: &AccountSettings, names_regex: NamesPattern) -> Self {
        Self {
            allow_real_name_change: settings.allow_real_name_change,
            allow_email_change: settings.allow_email_change,
            allow_password_change: settings.allow_password_change,
            allow_user_avatar_change: settings.allow_user_avatar_change,
            allow_user_status_message_change: settings.allow_user_status_message_change,
            allow_delete_own_account: settings.allow_delete_own_account,
            can_change_username: settings.allow_username_change && !settings.ldap_enabled,
            require_name: settings.require_name,
            names_regex,
        }
    }
}
