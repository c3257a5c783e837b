// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Validation of the profile form
//!
//! Computes the error of every field and the aggregate save-eligibility from
//! the current field values, the permission settings and the baseline user.
//! All rules except the username availability are evaluated synchronously.
//! The username is checked with the server after a quiet period of
//! [`USERNAME_CHECK_DEBOUNCE`]; only the most recently scheduled check may
//! update the state.

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use parleyapiclient::ProfileApi;
use parleycommon::{
    FieldError, PermissionSettings, ProfileField, ProfileFieldValues, UserRecord,
    ValidationState,
    validation::{self, UsernamePrecheck},
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::util::{Cubit, CubitCore, DebounceTicket, Debouncer};

pub const USERNAME_CHECK_DEBOUNCE: Duration = Duration::from_millis(400);
pub const USERNAME_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Progress of the username availability check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UsernameCheck {
    #[default]
    Idle,
    /// Waiting for the quiet period to pass
    Pending,
    /// Waiting for the server
    InFlight,
    /// The server could not be asked; the previous outcome is kept.
    Failed,
}

impl UsernameCheck {
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Pending | Self::InFlight)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFormState {
    pub errors: ValidationState,
    pub username_check: UsernameCheck,
    /// No field has an error
    pub can_save: bool,
}

impl Default for ProfileFormState {
    fn default() -> Self {
        Self {
            errors: Default::default(),
            username_check: Default::default(),
            can_save: true,
        }
    }
}

impl ProfileFormState {
    pub fn error(&self, field: ProfileField) -> Option<&FieldError> {
        self.errors.get(field)
    }
}

/// Inputs the last username check was scheduled for
#[derive(Debug, Clone, PartialEq, Eq)]
struct UsernameCheckKey {
    username: String,
    current_username: String,
    names_pattern: String,
}

impl UsernameCheckKey {
    fn new(values: &ProfileFieldValues, settings: &PermissionSettings, user: &UserRecord) -> Self {
        Self {
            username: values.username.clone(),
            current_username: user.username().to_owned(),
            names_pattern: settings.names_regex.as_str().to_owned(),
        }
    }
}

/// Error reported by the server for a field value
#[derive(Debug)]
struct ServerFieldError {
    field: ProfileField,
    value: String,
    error: FieldError,
}

#[derive(Debug, Default)]
struct FormMemory {
    username_key: Option<UsernameCheckKey>,
    username_error: Option<FieldError>,
    server_errors: Vec<ServerFieldError>,
}

struct FormShared<A> {
    api: Arc<A>,
    memory: Mutex<FormMemory>,
    state_tx: Arc<watch::Sender<ProfileFormState>>,
    can_save_tx: watch::Sender<bool>,
}

impl<A> FormShared<A> {
    /// Applies `f` to the state and publishes it if it changed.
    ///
    /// The aggregate is derived from the errors after `f` ran.
    fn publish(&self, f: impl FnOnce(&mut ProfileFormState)) {
        let mut can_save = true;
        self.state_tx.send_if_modified(|state| {
            let before = state.clone();
            f(state);
            state.can_save = !state.errors.has_errors();
            can_save = state.can_save;
            *state != before
        });
        self.can_save_tx.send_if_modified(|current| {
            let changed = *current != can_save;
            *current = can_save;
            changed
        });
    }
}

impl<A: ProfileApi> FormShared<A> {
    async fn check_username(
        &self,
        ticket: DebounceTicket,
        username: String,
        user: UserRecord,
        settings: PermissionSettings,
    ) {
        let outcome = match validation::username_precheck(&username, &user, &settings) {
            UsernamePrecheck::Unchanged => Some(None),
            UsernamePrecheck::Invalid(error) => Some(Some(error)),
            UsernamePrecheck::CheckAvailability => {
                self.publish_if_current(&ticket, |_, state| {
                    state.username_check = UsernameCheck::InFlight;
                });
                let check = self.api.check_username_availability(&username);
                match tokio::time::timeout(USERNAME_CHECK_TIMEOUT, check).await {
                    Ok(Ok(available)) => {
                        info!(%username, available, "Username availability checked");
                        Some((!available).then_some(FieldError::Unavailable))
                    }
                    Ok(Err(error)) => {
                        warn!(%error, %username, "Username availability check failed");
                        None
                    }
                    Err(_) => {
                        warn!(
                            %username,
                            timeout =? USERNAME_CHECK_TIMEOUT,
                            "Username availability check timed out"
                        );
                        None
                    }
                }
            }
        };

        self.publish_if_current(&ticket, |memory, state| match outcome {
            Some(error) => {
                memory.username_error = error.clone();
                state.errors.set(ProfileField::Username, error);
                state.username_check = UsernameCheck::Idle;
            }
            None => {
                state.username_check = UsernameCheck::Failed;
            }
        });
    }

    fn publish_if_current(
        &self,
        ticket: &DebounceTicket,
        f: impl FnOnce(&mut FormMemory, &mut ProfileFormState),
    ) {
        let mut memory = self.memory.lock();
        if !ticket.is_current() {
            debug!(number = ticket.number(), "Discarding stale username check");
            return;
        }
        self.publish(|state| f(&mut memory, state));
    }
}

/// Validator of the profile form
pub struct ProfileFormCubit<A> {
    core: CubitCore<ProfileFormState>,
    shared: Arc<FormShared<A>>,
    username_checks: Debouncer,
}

impl<A: ProfileApi> ProfileFormCubit<A> {
    pub fn new(api: Arc<A>) -> Self {
        let core = CubitCore::with_initial_state(ProfileFormState::default());
        let (can_save_tx, _) = watch::channel(true);
        let shared = Arc::new(FormShared {
            api,
            memory: Default::default(),
            state_tx: core.state_tx().clone(),
            can_save_tx,
        });
        Self {
            core,
            shared,
            username_checks: Debouncer::new(USERNAME_CHECK_DEBOUNCE),
        }
    }

    // Cubit interface

    pub fn close(&mut self) {
        self.username_checks.cancel();
        self.core.close();
    }

    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    pub fn state(&self) -> ProfileFormState {
        self.core.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProfileFormState> {
        self.core.subscribe()
    }

    /// Notifies whenever the aggregate save-eligibility changes.
    pub fn subscribe_can_save(&self) -> watch::Receiver<bool> {
        self.shared.can_save_tx.subscribe()
    }

    // Cubit methods

    /// Revalidates the form.
    ///
    /// Schedules a username check if the username, the current username or
    /// the names pattern changed since the last check was scheduled.
    ///
    /// Must be called from within a tokio runtime.
    pub fn evaluate(
        &self,
        values: &ProfileFieldValues,
        settings: &PermissionSettings,
        user: &UserRecord,
    ) {
        if self.is_closed() {
            return;
        }

        let mut errors = validation::validate(values, settings, user);
        let key = UsernameCheckKey::new(values, settings, user);

        let mut memory = self.shared.memory.lock();

        memory
            .server_errors
            .retain(|error| values.text(error.field) == Some(error.value.as_str()));
        for server_error in &memory.server_errors {
            errors.set(server_error.field, Some(server_error.error.clone()));
        }

        let check_username = memory.username_key.as_ref() != Some(&key);
        if check_username {
            debug!(username = %key.username, "Scheduling username check");
            memory.username_key = Some(key);
            let shared = self.shared.clone();
            let username = values.username.clone();
            let user = user.clone();
            let settings = settings.clone();
            self.username_checks.schedule(move |ticket| async move {
                shared.check_username(ticket, username, user, settings).await;
            });
        }
        errors.set(ProfileField::Username, memory.username_error.clone());

        self.shared.publish(|state| {
            state.errors = errors;
            if check_username {
                state.username_check = UsernameCheck::Pending;
            }
        });
    }

    /// Forces a new username check on the next evaluation.
    pub fn invalidate_username_check(&self) {
        self.shared.memory.lock().username_key = None;
    }

    /// Records an error the server reported for the value of `field` in
    /// `values`.
    ///
    /// The error stays until the value of the field changes. A username error
    /// replaces the outcome of the availability check and cancels a pending
    /// check. Call [`Self::evaluate`] afterwards to publish the error.
    pub fn report_server_error(
        &self,
        field: ProfileField,
        error: FieldError,
        values: &ProfileFieldValues,
    ) {
        let mut memory = self.shared.memory.lock();
        if field == ProfileField::Username {
            self.username_checks.cancel();
            memory.username_error = Some(error);
            self.shared.publish(|state| {
                if state.username_check.is_busy() {
                    state.username_check = UsernameCheck::Idle;
                }
            });
        } else {
            let value = values.text(field).unwrap_or_default().to_owned();
            memory.server_errors.push(ServerFieldError {
                field,
                value,
                error,
            });
        }
    }
}
