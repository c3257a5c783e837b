// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! HTTP client for the account profile endpoints of the chat server

use std::{fmt, time::Duration};

use reqwest::{Client, ClientBuilder, RequestBuilder};
use thiserror::Error;
use tracing::info;
use url::{ParseError, Url};

pub mod profile_api;

pub use profile_api::{ApiError, ProfileApi, SaveProfileError};

const HTTPS_BY_DEFAULT: bool = true;

/// Upper bound for a single request, including reading the response body.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const USER_ID_HEADER: &str = "X-User-Id";
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

#[derive(Error, Debug)]
pub enum ApiClientInitError {
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),
    #[error("Failed to parse URL {0}")]
    UrlParsingError(String),
    #[error("Could not find hostname in URL {0}")]
    NoHostname(String),
}

/// Session credentials of the logged-in user
#[derive(Clone)]
pub struct Credentials {
    pub user_id: String,
    pub auth_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

pub type HttpClient = reqwest::Client;

// ApiClient is a wrapper around a reqwest client.
// It exposes a single function for each API endpoint.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: HttpClient,
    url: Url,
    credentials: Option<Credentials>,
}

impl ApiClient {
    /// Creates a new HTTP client.
    pub fn new_http_client() -> reqwest::Result<Client> {
        ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(4))
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .user_agent("ParleyClient/0.1")
            .build()
    }

    pub fn with_default_http_client(domain: impl AsRef<str>) -> Result<Self, ApiClientInitError> {
        let client = Self::new_http_client()?;
        Self::initialize(client, domain)
    }

    /// Creates a new API client that connects to the given base URL.
    ///
    /// # Arguments
    /// domain - The base URL or hostname of the server. If only a hostname is
    /// given, `https` is used.
    pub fn initialize(
        client: HttpClient,
        domain: impl AsRef<str>,
    ) -> Result<Self, ApiClientInitError> {
        let domain = domain.as_ref();
        let url = match Url::parse(domain) {
            Ok(url) => url,
            Err(ParseError::RelativeUrlWithoutBase) => {
                let protocol = if HTTPS_BY_DEFAULT { "https" } else { "http" };
                let domain = format!("{protocol}://{domain}");
                Url::parse(&domain).map_err(|_| ApiClientInitError::UrlParsingError(domain))?
            }
            Err(_) => return Err(ApiClientInitError::UrlParsingError(domain.to_owned())),
        };
        if url.host_str().is_none() {
            return Err(ApiClientInitError::NoHostname(domain.to_owned()));
        }
        info!(%url, "Initialized API client");

        Ok(Self {
            client,
            url,
            credentials: None,
        })
    }

    /// Authenticates all subsequent requests with the given credentials.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.url
    }

    /// Builds a URL for a given endpoint.
    fn build_url(&self, endpoint: &str) -> Result<Url, ParseError> {
        self.url.join(endpoint)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(credentials) => request
                .header(USER_ID_HEADER, &credentials.user_id)
                .header(AUTH_TOKEN_HEADER, &credentials.auth_token),
            None => request,
        }
    }
}
