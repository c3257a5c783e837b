// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    collections::{HashMap, HashSet},
    time::Duration,
};

use parking_lot::Mutex;
use parleyapiclient::{ApiError, ProfileApi, SaveProfileError};
use parleycommon::{ProfileUpdate, UserEmail, UserRecord};

use super::profile_form_cubit::USERNAME_CHECK_DEBOUNCE;

/// Lets the quiet period and an immediate server response pass.
pub(crate) async fn settle() {
    tokio::time::sleep(USERNAME_CHECK_DEBOUNCE + Duration::from_millis(100)).await;
    tokio::task::yield_now().await;
}

pub(crate) fn alice() -> UserRecord {
    UserRecord {
        id: "u1".to_owned(),
        name: Some("Alice".to_owned()),
        username: Some("alice".to_owned()),
        emails: vec![UserEmail {
            address: "alice@example.com".to_owned(),
            verified: true,
        }],
        status: Some("online".to_owned()),
        ..Default::default()
    }
}

#[derive(Default)]
pub(crate) struct MockProfileApi {
    inner: Mutex<MockInner>,
}

#[derive(Default)]
struct MockInner {
    taken: HashSet<String>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    checks: Vec<String>,
    saves: Vec<ProfileUpdate>,
    rejection: Option<String>,
    fail_avatar: bool,
    save_delay: Option<Duration>,
}

impl MockProfileApi {
    pub(crate) fn with_taken<'a>(usernames: impl IntoIterator<Item = &'a str>) -> Self {
        let api = Self::default();
        api.inner
            .lock()
            .taken
            .extend(usernames.into_iter().map(ToOwned::to_owned));
        api
    }

    pub(crate) fn set_delay(&self, username: &str, delay: Duration) {
        self.inner.lock().delays.insert(username.to_owned(), delay);
    }

    pub(crate) fn set_failing(&self, username: &str, failing: bool) {
        let mut inner = self.inner.lock();
        if failing {
            inner.failing.insert(username.to_owned());
        } else {
            inner.failing.remove(username);
        }
    }

    /// Rejects the next save with the given server error code.
    pub(crate) fn reject_next_save(&self, code: &str) {
        self.inner.lock().rejection = Some(code.to_owned());
    }

    /// Fails the avatar step of every save; the basic info is still saved.
    pub(crate) fn set_failing_avatar(&self, failing: bool) {
        self.inner.lock().fail_avatar = failing;
    }

    pub(crate) fn set_save_delay(&self, delay: Duration) {
        self.inner.lock().save_delay = Some(delay);
    }

    pub(crate) fn checks(&self) -> Vec<String> {
        self.inner.lock().checks.clone()
    }

    pub(crate) fn saves(&self) -> Vec<ProfileUpdate> {
        self.inner.lock().saves.clone()
    }
}

impl ProfileApi for MockProfileApi {
    async fn check_username_availability(&self, username: &str) -> Result<bool, ApiError> {
        let (delay, failing, taken) = {
            let mut inner = self.inner.lock();
            inner.checks.push(username.to_owned());
            (
                inner.delays.get(username).copied(),
                inner.failing.contains(username),
                inner.taken.contains(username),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(ApiError::Server("service unavailable".to_owned()));
        }
        Ok(!taken)
    }

    async fn save_profile(&self, update: &ProfileUpdate) -> Result<(), SaveProfileError> {
        let (delay, rejection, fail_avatar) = {
            let mut inner = self.inner.lock();
            inner.saves.push(update.clone());
            (inner.save_delay, inner.rejection.take(), inner.fail_avatar)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(code) = rejection {
            return Err(SaveProfileError::Rejected {
                code,
                message: None,
            });
        }
        if fail_avatar && !update.avatar.is_unchanged() {
            let error = SaveProfileError::Api(ApiError::Server("avatar upload failed".to_owned()));
            if update.is_basic_info_empty() {
                return Err(error);
            }
            return Err(SaveProfileError::AvatarFailed {
                source: Box::new(error),
            });
        }
        Ok(())
    }
}
