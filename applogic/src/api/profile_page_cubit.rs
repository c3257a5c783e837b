// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Account profile page
//!
//! Owns the field values and the permission settings, feeds them to the
//! [`ProfileFormCubit`] and enables saving when there are unsaved changes
//! and no blocking errors.

use std::sync::Arc;

use anyhow::bail;
use displaydoc::Display;
use parleyapiclient::{ProfileApi, SaveProfileError};
use parleycommon::{
    AccountSettings, AvatarChange, PermissionSettings, ProfileField, ProfileFieldValues,
    ProfileUpdate, SettingsError, UserEmail, UserRecord, ValidationState,
};
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::util::{Cubit, CubitCore};

use super::profile_form_cubit::{ProfileFormCubit, ProfileFormState, UsernameCheck};

#[derive(Debug, Clone, Copy, Error, Display, PartialEq, Eq)]
pub enum ProfileEditError {
    /// Changing the {0} is not allowed
    Locked(ProfileField),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePageState {
    /// Baseline profile as last persisted
    pub user: UserRecord,
    pub settings: PermissionSettings,
    pub initial_values: ProfileFieldValues,
    pub values: ProfileFieldValues,
    pub errors: ValidationState,
    pub username_check: UsernameCheck,
    pub has_unsaved_changes: bool,
    /// No field has an error
    pub can_save: bool,
    /// The save action is enabled
    pub save_enabled: bool,
    pub saving: bool,
}

impl ProfilePageState {
    fn new(user: UserRecord, settings: PermissionSettings) -> Self {
        let initial_values = ProfileFieldValues::from_user(&user);
        Self {
            user,
            settings,
            values: initial_values.clone(),
            initial_values,
            errors: Default::default(),
            username_check: Default::default(),
            has_unsaved_changes: false,
            can_save: true,
            save_enabled: false,
            saving: false,
        }
    }

    pub fn email_verified(&self) -> bool {
        self.user.email_verified()
    }

    pub fn is_editable(&self, field: ProfileField) -> bool {
        let settings = &self.settings;
        match field {
            ProfileField::Realname => settings.allow_real_name_change,
            ProfileField::Username => settings.can_change_username,
            ProfileField::Email => settings.allow_email_change,
            ProfileField::Password | ProfileField::ConfirmationPassword => {
                settings.allow_password_change
            }
            ProfileField::StatusText => settings.allow_user_status_message_change,
            ProfileField::Avatar => settings.allow_user_avatar_change,
            ProfileField::Bio => true,
        }
    }

    fn apply_form_state(&mut self, form: &ProfileFormState) {
        self.errors = form.errors.clone();
        self.username_check = form.username_check;
        self.can_save = form.can_save;
        self.refresh_derived();
    }

    fn refresh_derived(&mut self) {
        self.has_unsaved_changes = self.values != self.initial_values;
        self.save_enabled = self.has_unsaved_changes
            && self.can_save
            && !self.username_check.is_busy()
            && !self.saving;
    }

    /// Rebases the baseline onto the saved values.
    ///
    /// Without `avatar_saved` the avatar change stays pending.
    fn commit(&mut self, saved: &ProfileFieldValues, avatar_saved: bool) {
        let user = &mut self.user;
        user.name = Some(saved.realname.clone());
        user.username = Some(saved.username.clone());
        if user.email() != saved.email {
            user.emails = vec![UserEmail {
                address: saved.email.clone(),
                verified: false,
            }];
        }
        user.status_text = Some(saved.status_text.clone());
        user.bio = Some(saved.bio.clone());
        if avatar_saved {
            match &saved.avatar {
                AvatarChange::Url(url) => user.avatar_url = Some(url.to_string()),
                AvatarChange::Reset => user.avatar_url = None,
                AvatarChange::Unchanged | AvatarChange::Upload { .. } => {}
            }
        }

        let edited_while_saving = self.values != *saved;
        self.initial_values = ProfileFieldValues::from_user(&self.user);
        if !edited_while_saving {
            let avatar = if avatar_saved {
                AvatarChange::Unchanged
            } else {
                std::mem::take(&mut self.values.avatar)
            };
            self.values = ProfileFieldValues {
                avatar,
                ..self.initial_values.clone()
            };
        }
    }
}

/// Controller of the account profile page
pub struct ProfilePageCubit<A: ProfileApi> {
    core: CubitCore<ProfilePageState>,
    form: ProfileFormCubit<A>,
    api: Arc<A>,
}

impl<A: ProfileApi> ProfilePageCubit<A> {
    /// Creates the page for editing the profile of `user`.
    ///
    /// Fails if the names pattern cannot be compiled, see
    /// [`parleycommon::NamesPattern::new`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        user: UserRecord,
        settings: &AccountSettings,
        api: Arc<A>,
    ) -> Result<Self, SettingsError> {
        let settings = PermissionSettings::new(settings)?;
        let core = CubitCore::with_initial_state(ProfilePageState::new(user, settings));
        let form = ProfileFormCubit::new(api.clone());

        spawn_form_listener(
            form.subscribe(),
            core.state_tx().clone(),
            core.cancellation_token().clone(),
        );

        let page = Self { core, form, api };
        page.update(|_| {});
        Ok(page)
    }

    // Cubit interface

    pub fn close(&mut self) {
        self.form.close();
        self.core.close();
    }

    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    pub fn state(&self) -> ProfilePageState {
        self.core.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProfilePageState> {
        self.core.subscribe()
    }

    pub fn form(&self) -> &ProfileFormCubit<A> {
        &self.form
    }

    // Cubit methods

    pub fn set_realname(&self, value: impl Into<String>) -> Result<(), ProfileEditError> {
        let value = value.into();
        self.edit(ProfileField::Realname, |values| values.realname = value)
    }

    pub fn set_email(&self, value: impl Into<String>) -> Result<(), ProfileEditError> {
        let value = value.into();
        self.edit(ProfileField::Email, |values| values.email = value)
    }

    pub fn set_username(&self, value: impl Into<String>) -> Result<(), ProfileEditError> {
        let value = value.into();
        self.edit(ProfileField::Username, |values| values.username = value)
    }

    /// Sets the new password; clearing it also clears the confirmation.
    pub fn set_password(&self, value: impl Into<String>) -> Result<(), ProfileEditError> {
        let value = value.into();
        self.edit(ProfileField::Password, |values| {
            if value.is_empty() {
                values.confirmation_password.clear();
            }
            values.password = value;
        })
    }

    pub fn set_confirmation_password(
        &self,
        value: impl Into<String>,
    ) -> Result<(), ProfileEditError> {
        let value = value.into();
        self.edit(ProfileField::ConfirmationPassword, |values| {
            values.confirmation_password = value
        })
    }

    pub fn set_status_text(&self, value: impl Into<String>) -> Result<(), ProfileEditError> {
        let value = value.into();
        self.edit(ProfileField::StatusText, |values| values.status_text = value)
    }

    pub fn set_bio(&self, value: impl Into<String>) -> Result<(), ProfileEditError> {
        let value = value.into();
        self.edit(ProfileField::Bio, |values| values.bio = value)
    }

    pub fn set_avatar(&self, avatar: AvatarChange) -> Result<(), ProfileEditError> {
        self.edit(ProfileField::Avatar, |values| values.avatar = avatar)
    }

    /// Discards all unsaved changes.
    pub fn reset(&self) {
        self.update(|state| state.values = state.initial_values.clone());
    }

    /// Re-derives the permission snapshot from changed settings.
    pub fn update_settings(&self, settings: &AccountSettings) -> Result<(), SettingsError> {
        let settings = self.core.borrow_state().settings.refresh(settings)?;
        self.update(|state| state.settings = settings);
        Ok(())
    }

    /// Asks the server again after a failed username availability check.
    pub fn retry_username_check(&self) {
        self.form.invalidate_username_check();
        self.update(|_| {});
    }

    /// Commits the changed fields.
    ///
    /// Errors the server reports for a field are shown at that field. If only
    /// the avatar change failed, everything else is committed and the avatar
    /// change stays pending.
    pub async fn save(&self) -> anyhow::Result<()> {
        let mut prepared = None;
        self.core.state_tx().send_if_modified(|state| {
            if !state.save_enabled {
                return false;
            }
            let changed = state.values.changed_fields(&state.initial_values);
            debug!(?changed, "Saving profile");
            let update =
                ProfileUpdate::from_changes(&state.initial_values, &state.values, &state.settings);
            prepared = Some((update, state.values.clone()));
            state.saving = true;
            state.refresh_derived();
            true
        });
        let Some((update, saved)) = prepared else {
            bail!("Profile cannot be saved in its current state");
        };

        match self.api.save_profile(&update).await {
            Ok(()) => {
                info!("Profile saved");
                self.update(|state| {
                    state.saving = false;
                    state.commit(&saved, true);
                });
                Ok(())
            }
            Err(save_error @ SaveProfileError::AvatarFailed { .. }) => {
                error!(%save_error, "Failed to save avatar");
                self.update(|state| {
                    state.saving = false;
                    state.commit(&saved, false);
                });
                Err(save_error.into())
            }
            Err(save_error) => {
                error!(%save_error, "Failed to save profile");
                if let Some((field, field_error)) = save_error.field_error() {
                    self.form.report_server_error(field, field_error, &saved);
                }
                self.update(|state| state.saving = false);
                Err(save_error.into())
            }
        }
    }

    fn edit(
        &self,
        field: ProfileField,
        f: impl FnOnce(&mut ProfileFieldValues),
    ) -> Result<(), ProfileEditError> {
        if !self.core.borrow_state().is_editable(field) {
            return Err(ProfileEditError::Locked(field));
        }
        self.update(|state| f(&mut state.values));
        Ok(())
    }

    /// Applies `f`, revalidates and publishes the state.
    fn update(&self, f: impl FnOnce(&mut ProfilePageState)) {
        let form = &self.form;
        self.core.state_tx().send_if_modified(|state| {
            let before = state.clone();
            f(state);
            form.evaluate(&state.values, &state.settings, &state.user);
            state.apply_form_state(&form.state());
            *state != before
        });
    }
}

/// Mirrors the asynchronous outcome of the form validation into the page.
fn spawn_form_listener(
    mut form_rx: watch::Receiver<ProfileFormState>,
    state_tx: Arc<watch::Sender<ProfilePageState>>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = form_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    state_tx.send_if_modified(|state| {
                        let before = state.clone();
                        let form_state = form_rx.borrow_and_update().clone();
                        state.apply_form_state(&form_state);
                        *state != before
                    });
                }
                _ = cancel.cancelled() => return,
            }
        }
    });
}
