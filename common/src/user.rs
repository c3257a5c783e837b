// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::{Deserialize, Serialize};

/// Previously persisted profile of the logged-in user
///
/// Used as the baseline for detecting unchanged fields and as the source of
/// the initial form values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub emails: Vec<UserEmail>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub status_text: Option<String>,
    /// Presence status (online, away, busy, ...)
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEmail {
    pub address: String,
    #[serde(default)]
    pub verified: bool,
}

impl UserRecord {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or_default()
    }

    /// Primary email address, i.e. the first one.
    pub fn email(&self) -> &str {
        self.emails
            .first()
            .map(|email| email.address.as_str())
            .unwrap_or_default()
    }

    pub fn email_verified(&self) -> bool {
        self.emails.first().is_some_and(|email| email.verified)
    }
}
