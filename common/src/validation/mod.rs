// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Field-level validation of the profile form
//!
//! All rules are pure functions of the field values, the permission settings
//! and the baseline user record. The username availability check is the only
//! rule that needs the server; here we only decide whether it is needed.

use std::{collections::BTreeMap, fmt};

use crate::{
    profile::{ProfileField, ProfileFieldValues},
    settings::PermissionSettings,
    user::UserRecord,
};

pub use email::is_email;

mod email;

pub const MAX_STATUS_TEXT_LENGTH: usize = 120;

/// Validation error of a single field
///
/// Errors are rendered inline next to their field, none of them is fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// Value fails the configured names pattern
    PatternMismatch(ProfileField),
    /// Name is required but empty
    RequiredFieldMissing,
    /// Confirmation differs from the password
    PasswordMismatch,
    /// Not a valid email address
    InvalidFormat,
    /// Value is longer than `max` characters
    TooLong { max: usize },
    /// Username is already taken
    Unavailable,
    /// Server rejected the value when committing the profile
    Rejected { code: String },
}

impl FieldError {
    /// Localization token of the error message
    pub fn token(&self) -> &str {
        match self {
            Self::PatternMismatch(ProfileField::Username) => "error-invalid-username",
            Self::PatternMismatch(_) => "error-invalid-name",
            Self::RequiredFieldMissing => "Field_required",
            Self::PasswordMismatch => "Passwords_do_not_match",
            Self::InvalidFormat => "error",
            Self::TooLong { .. } => "Max_length_is",
            Self::Unavailable => "Username_already_exist",
            Self::Rejected { code } => code,
        }
    }

    /// Interpolation arguments of the localized message
    pub fn token_args(&self) -> Vec<String> {
        match self {
            Self::TooLong { max } => vec![max.to_string()],
            _ => Vec::new(),
        }
    }

    /// Maps a server error code of a rejected profile commit to the field it
    /// concerns.
    pub fn from_server_code(code: &str) -> Option<(ProfileField, FieldError)> {
        let mapped = match code {
            "error-field-unavailable" => (ProfileField::Username, Self::Unavailable),
            "error-invalid-username" => (
                ProfileField::Username,
                Self::PatternMismatch(ProfileField::Username),
            ),
            "error-invalid-email" => (ProfileField::Email, Self::InvalidFormat),
            "error-invalid-name" => (
                ProfileField::Realname,
                Self::PatternMismatch(ProfileField::Realname),
            ),
            "error-status-text-too-long" => (
                ProfileField::StatusText,
                Self::TooLong {
                    max: MAX_STATUS_TEXT_LENGTH,
                },
            ),
            code if code.starts_with("error-password-policy-not-met")
                || code == "error-password-same-as-current" =>
            {
                (
                    ProfileField::Password,
                    Self::Rejected {
                        code: code.to_owned(),
                    },
                )
            }
            _ => return None,
        };
        Some(mapped)
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Per-field validation outcome
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationState {
    fields: BTreeMap<ProfileField, Option<FieldError>>,
}

impl ValidationState {
    pub fn get(&self, field: ProfileField) -> Option<&FieldError> {
        self.fields.get(&field).and_then(Option::as_ref)
    }

    pub fn set(&mut self, field: ProfileField, error: Option<FieldError>) {
        self.fields.insert(field, error);
    }

    /// Returns true if any field has an error.
    pub fn has_errors(&self) -> bool {
        self.fields.values().any(Option::is_some)
    }

    pub fn errors(&self) -> impl Iterator<Item = (ProfileField, &FieldError)> {
        self.fields
            .iter()
            .filter_map(|(field, error)| Some((*field, error.as_ref()?)))
    }
}

/// Outcome of the local part of the username check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsernamePrecheck {
    /// Same as the current username, any error is cleared
    Unchanged,
    Invalid(FieldError),
    /// Availability must be checked with the server
    CheckAvailability,
}

pub fn password_error(password: &str, confirmation: &str) -> Option<FieldError> {
    if password.is_empty() || confirmation.is_empty() || password == confirmation {
        None
    } else {
        Some(FieldError::PasswordMismatch)
    }
}

pub fn email_error(email: &str) -> Option<FieldError> {
    (!is_email(email)).then_some(FieldError::InvalidFormat)
}

pub fn realname_error(
    realname: &str,
    user: &UserRecord,
    settings: &PermissionSettings,
) -> Option<FieldError> {
    if user.name() == realname {
        return None;
    }
    if !settings.names_regex.is_match(realname) {
        return Some(FieldError::PatternMismatch(ProfileField::Realname));
    }
    if realname.is_empty() && settings.require_name {
        return Some(FieldError::RequiredFieldMissing);
    }
    None
}

pub fn status_text_error(status_text: &str) -> Option<FieldError> {
    (status_text.chars().count() > MAX_STATUS_TEXT_LENGTH).then_some(FieldError::TooLong {
        max: MAX_STATUS_TEXT_LENGTH,
    })
}

pub fn username_precheck(
    username: &str,
    user: &UserRecord,
    settings: &PermissionSettings,
) -> UsernamePrecheck {
    if user.username() == username {
        UsernamePrecheck::Unchanged
    } else if !settings.names_regex.is_match(username) {
        UsernamePrecheck::Invalid(FieldError::PatternMismatch(ProfileField::Username))
    } else {
        UsernamePrecheck::CheckAvailability
    }
}

/// Validates all fields which do not need the server.
///
/// The username is not part of the result; its error comes from the
/// availability check.
pub fn validate(
    values: &ProfileFieldValues,
    settings: &PermissionSettings,
    user: &UserRecord,
) -> ValidationState {
    let mut state = ValidationState::default();
    state.set(
        ProfileField::ConfirmationPassword,
        password_error(&values.password, &values.confirmation_password),
    );
    state.set(ProfileField::Email, email_error(&values.email));
    state.set(
        ProfileField::Realname,
        realname_error(&values.realname, user, settings),
    );
    state.set(
        ProfileField::StatusText,
        status_text_error(&values.status_text),
    );
    state
}
