// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Account profile data model and validation rules shared by the client crates.

pub mod profile;
pub mod settings;
pub mod user;
pub mod validation;

pub use profile::{AvatarChange, ProfileField, ProfileFieldValues, ProfileUpdate};
pub use settings::{AccountSettings, NamesPattern, PermissionSettings, SettingsError};
pub use user::{UserEmail, UserRecord};
pub use validation::{FieldError, ValidationState};
