// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! API client for the account profile endpoints.

use parleycommon::{AvatarChange, FieldError, ProfileField, ProfileUpdate};
use reqwest::{
    Response, StatusCode,
    multipart::{Form, Part},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ApiClient;


pub const ENDPOINT_CHECK_USERNAME_AVAILABILITY: &str = "/api/v1/users.checkUsernameAvailability";
pub const ENDPOINT_UPDATE_OWN_BASIC_INFO: &str = "/api/v1/users.updateOwnBasicInfo";
pub const ENDPOINT_SET_AVATAR: &str = "/api/v1/users.setAvatar";
pub const ENDPOINT_RESET_AVATAR: &str = "/api/v1/users.resetAvatar";

const UNKNOWN_ERROR_CODE: &str = "error-unknown";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error("Invalid endpoint URL")]
    Url(#[from] url::ParseError),
    #[error("Server returned an error: {0}")]
    Server(String),
    #[error("Unexpected response status {0}")]
    UnexpectedStatus(StatusCode),
}

#[derive(Error, Debug)]
pub enum SaveProfileError {
    /// The server refused the update, e.g. because the username is taken.
    #[error("Server rejected the profile update: {code}")]
    Rejected {
        code: String,
        message: Option<String>,
    },
    /// The basic info was saved but the avatar change failed.
    #[error("Profile saved except for the avatar")]
    AvatarFailed {
        #[source]
        source: Box<SaveProfileError>,
    },
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SaveProfileError {
    /// The form field this error concerns, if any
    pub fn field_error(&self) -> Option<(ProfileField, FieldError)> {
        match self {
            Self::Rejected { code, .. } => FieldError::from_server_code(code),
            Self::AvatarFailed { .. } | Self::Api(_) => None,
        }
    }
}

/// Remote operations used by the profile form
pub trait ProfileApi: Send + Sync + 'static {
    /// Returns true if nobody else uses `username`.
    fn check_username_availability(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<bool, ApiError>> + Send;

    /// Commits the changed profile fields and the avatar change.
    ///
    /// The basic info is saved first. If the avatar change fails afterwards,
    /// [`SaveProfileError::AvatarFailed`] is returned.
    fn save_profile(
        &self,
        update: &ProfileUpdate,
    ) -> impl Future<Output = Result<(), SaveProfileError>> + Send;
}

#[derive(Debug, Deserialize)]
struct CheckUsernameResponse {
    result: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpdateOwnBasicInfoParams<'a> {
    data: &'a ProfileUpdate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetAvatarParams<'a> {
    avatar_url: &'a str,
}

impl ProfileApi for ApiClient {
    async fn check_username_availability(&self, username: &str) -> Result<bool, ApiError> {
        let url = self.build_url(ENDPOINT_CHECK_USERNAME_AVAILABILITY)?;
        let res = self
            .authorized(self.client.get(url).query(&[("username", username)]))
            .send()
            .await?;
        let status = res.status();
        if status.is_success() {
            let CheckUsernameResponse { result } = res.json().await?;
            debug!(username, available = result, "Checked username availability");
            Ok(result)
        } else {
            let error: ErrorResponse = res.json().await.unwrap_or_default();
            warn!(%status, ?error, "Username availability check failed");
            Err(match error.error {
                Some(message) => ApiError::Server(message),
                None => ApiError::UnexpectedStatus(status),
            })
        }
    }

    async fn save_profile(&self, update: &ProfileUpdate) -> Result<(), SaveProfileError> {
        let basic_info_saved = !update.is_basic_info_empty();
        if basic_info_saved {
            let url = self
                .build_url(ENDPOINT_UPDATE_OWN_BASIC_INFO)
                .map_err(ApiError::from)?;
            let res = self
                .authorized(
                    self.client
                        .post(url)
                        .json(&UpdateOwnBasicInfoParams { data: update }),
                )
                .send()
                .await
                .map_err(ApiError::from)?;
            check_save_response(res).await?;
        }

        match self.save_avatar(&update.avatar).await {
            Ok(()) => {}
            Err(error) if basic_info_saved => {
                warn!(%error, "Basic info saved but avatar change failed");
                return Err(SaveProfileError::AvatarFailed {
                    source: Box::new(error),
                });
            }
            Err(error) => return Err(error),
        }

        info!("Saved profile");
        Ok(())
    }
}

impl ApiClient {
    async fn save_avatar(&self, avatar: &AvatarChange) -> Result<(), SaveProfileError> {
        let request = match avatar {
            AvatarChange::Unchanged => return Ok(()),
            AvatarChange::Url(avatar_url) => {
                let url = self.build_url(ENDPOINT_SET_AVATAR).map_err(ApiError::from)?;
                let params = SetAvatarParams {
                    avatar_url: avatar_url.as_str(),
                };
                self.client.post(url).json(&params)
            }
            AvatarChange::Upload { content_type, data } => {
                let url = self.build_url(ENDPOINT_SET_AVATAR).map_err(ApiError::from)?;
                let part = Part::bytes(data.clone())
                    .file_name("avatar")
                    .mime_str(content_type)
                    .map_err(ApiError::from)?;
                self.client.post(url).multipart(Form::new().part("image", part))
            }
            AvatarChange::Reset => {
                let url = self
                    .build_url(ENDPOINT_RESET_AVATAR)
                    .map_err(ApiError::from)?;
                self.client.post(url).json(&serde_json::json!({}))
            }
        };
        let res = self
            .authorized(request)
            .send()
            .await
            .map_err(ApiError::from)?;
        check_save_response(res).await
    }
}

async fn check_save_response(res: Response) -> Result<(), SaveProfileError> {
    let status = res.status();
    if status.is_success() {
        return Ok(());
    }
    if status.is_client_error() {
        let ErrorResponse { error, error_type } = res.json().await.unwrap_or_default();
        let code = error_type.unwrap_or_else(|| UNKNOWN_ERROR_CODE.to_owned());
        info!(%status, %code, "Profile update rejected");
        return Err(SaveProfileError::Rejected {
            code,
            message: error,
        });
    }
    Err(ApiError::UnexpectedStatus(status).into())
}
