// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{settings::PermissionSettings, user::UserRecord};

/// Editable fields of the profile form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProfileField {
    Realname,
    Username,
    Email,
    Password,
    ConfirmationPassword,
    StatusText,
    Bio,
    Avatar,
}

impl ProfileField {
    pub const ALL: [ProfileField; 8] = [
        Self::Realname,
        Self::Username,
        Self::Email,
        Self::Password,
        Self::ConfirmationPassword,
        Self::StatusText,
        Self::Bio,
        Self::Avatar,
    ];
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Realname => "realname",
            Self::Username => "username",
            Self::Email => "email",
            Self::Password => "password",
            Self::ConfirmationPassword => "confirmationPassword",
            Self::StatusText => "statusText",
            Self::Bio => "bio",
            Self::Avatar => "avatar",
        };
        f.write_str(name)
    }
}

/// Pending avatar change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AvatarChange {
    #[default]
    Unchanged,
    Upload {
        content_type: String,
        data: Vec<u8>,
    },
    Url(Url),
    /// Fall back to the generated initials avatar.
    Reset,
}

impl AvatarChange {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }
}

/// Current values of the profile form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFieldValues {
    pub realname: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub confirmation_password: String,
    pub avatar: AvatarChange,
    pub avatar_url: String,
    pub status_text: String,
    pub status_type: String,
    pub bio: String,
}

impl ProfileFieldValues {
    /// Initial values for editing the profile of `user`
    pub fn from_user(user: &UserRecord) -> Self {
        Self {
            realname: user.name().to_owned(),
            email: user.email().to_owned(),
            username: user.username().to_owned(),
            password: String::new(),
            confirmation_password: String::new(),
            avatar: AvatarChange::Unchanged,
            avatar_url: user.avatar_url.clone().unwrap_or_default(),
            status_text: user.status_text.clone().unwrap_or_default(),
            status_type: user.status.clone().unwrap_or_default(),
            bio: user.bio.clone().unwrap_or_default(),
        }
    }

    /// Text value of `field`; `None` for the avatar.
    pub fn text(&self, field: ProfileField) -> Option<&str> {
        let value = match field {
            ProfileField::Realname => &self.realname,
            ProfileField::Username => &self.username,
            ProfileField::Email => &self.email,
            ProfileField::Password => &self.password,
            ProfileField::ConfirmationPassword => &self.confirmation_password,
            ProfileField::StatusText => &self.status_text,
            ProfileField::Bio => &self.bio,
            ProfileField::Avatar => return None,
        };
        Some(value)
    }

    /// Fields whose value differs from `initial`
    pub fn changed_fields(&self, initial: &Self) -> Vec<ProfileField> {
        ProfileField::ALL
            .into_iter()
            .filter(|&field| match field {
                ProfileField::Avatar => self.avatar != initial.avatar,
                _ => self.text(field) != initial.text(field),
            })
            .collect()
    }
}

/// Profile commit payload
///
/// Only carries the fields that changed and that the settings allow to change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip)]
    pub avatar: AvatarChange,
}

impl ProfileUpdate {
    pub fn from_changes(
        initial: &ProfileFieldValues,
        current: &ProfileFieldValues,
        settings: &PermissionSettings,
    ) -> Self {
        fn changed(allowed: bool, initial: &str, current: &str) -> Option<String> {
            (allowed && initial != current).then(|| current.to_owned())
        }

        Self {
            realname: changed(
                settings.allow_real_name_change,
                &initial.realname,
                &current.realname,
            ),
            email: changed(settings.allow_email_change, &initial.email, &current.email),
            username: changed(
                settings.can_change_username,
                &initial.username,
                &current.username,
            ),
            new_password: (settings.allow_password_change && !current.password.is_empty())
                .then(|| current.password.clone()),
            status_text: changed(
                settings.allow_user_status_message_change,
                &initial.status_text,
                &current.status_text,
            ),
            bio: changed(true, &initial.bio, &current.bio),
            avatar: if settings.allow_user_avatar_change {
                current.avatar.clone()
            } else {
                AvatarChange::Unchanged
            },
        }
    }

    /// Returns true if there are no basic info changes (avatar excluded).
    pub fn is_basic_info_empty(&self) -> bool {
        self.realname.is_none()
            && self.email.is_none()
            && self.username.is_none()
            && self.new_password.is_none()
            && self.status_text.is_none()
            && self.bio.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.is_basic_info_empty() && self.avatar.is_unchanged()
    }
}

#[cfg(test)]
mod tests {
    use crate::{settings::AccountSettings, user::UserEmail};

    use super::*;

    fn alice() -> UserRecord {
        UserRecord {
            id: "u1".to_owned(),
            name: Some("Alice".to_owned()),
            username: Some("alice".to_owned()),
            emails: vec![UserEmail {
                address: "alice@example.com".to_owned(),
                verified: false,
            }],
            status: Some("online".to_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn initial_values_default_absent_fields() {
        let values = ProfileFieldValues::from_user(&alice());
        assert_eq!(values.realname, "Alice");
        assert_eq!(values.username, "alice");
        assert_eq!(values.email, "alice@example.com");
        assert_eq!(values.status_type, "online");
        assert_eq!(values.status_text, "");
        assert_eq!(values.bio, "");
        assert_eq!(values.avatar_url, "");
        assert!(values.password.is_empty());
        assert!(values.avatar.is_unchanged());
    }

    #[test]
    fn changed_fields() {
        let initial = ProfileFieldValues::from_user(&alice());
        let mut current = initial.clone();
        assert!(current.changed_fields(&initial).is_empty());

        current.bio = "Hello".to_owned();
        current.avatar = AvatarChange::Reset;
        assert_eq!(
            current.changed_fields(&initial),
            [ProfileField::Bio, ProfileField::Avatar]
        );
    }

    #[test]
    fn update_contains_only_permitted_changes() {
        let initial = ProfileFieldValues::from_user(&alice());
        let mut current = initial.clone();
        current.realname = "Alice Liddell".to_owned();
        current.email = "alice@wonderland.org".to_owned();
        current.password = "s3cret".to_owned();
        current.avatar = AvatarChange::Reset;

        let settings = PermissionSettings::new(&AccountSettings {
            allow_email_change: false,
            allow_user_avatar_change: false,
            ..Default::default()
        })
        .unwrap();

        let update = ProfileUpdate::from_changes(&initial, &current, &settings);
        assert_eq!(update.realname.as_deref(), Some("Alice Liddell"));
        assert_eq!(update.email, None);
        assert_eq!(update.username, None);
        assert_eq!(update.new_password.as_deref(), Some("s3cret"));
        assert!(update.avatar.is_unchanged());
        assert!(!update.is_empty());

        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "realname": "Alice Liddell", "newPassword": "s3cret" })
        );
    }
}
