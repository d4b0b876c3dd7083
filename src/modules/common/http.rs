// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::{
    mailsync_version,
    modules::{
        error::{code::ErrorCode, MailSyncError, MailSyncResult},
        settings::cli::SETTINGS,
    },
    raise_error,
};

/// API code returned when the event cursor is no longer known to the server.
pub const API_CODE_INVALID_EVENT_ID: u32 = 18001;

const UID_HEADER: &str = "x-pm-uid";

/// Error body returned by the mail API next to a non-success status.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub error: String,
}

/// Thin JSON client bound to one mail API base URL and session.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    uid: Option<String>,
    access_token: Option<String>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        uid: Option<String>,
        access_token: Option<String>,
        timeout: Duration,
    ) -> MailSyncResult<Self> {
        let client = reqwest::ClientBuilder::new()
            .user_agent(format!("mailsync/{}", mailsync_version!()))
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                raise_error!(
                    format!("Failed to build HTTP client: {:#?}", e),
                    ErrorCode::InternalError
                )
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            uid,
            access_token,
        })
    }

    pub fn from_settings() -> MailSyncResult<Self> {
        Self::new(
            SETTINGS.mailsync_api_url.clone(),
            SETTINGS.mailsync_api_uid.clone(),
            SETTINGS.mailsync_access_token.clone(),
            SETTINGS.http_timeout(),
        )
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> MailSyncResult<T> {
        let url = self.url(path);
        debug!("GET {}", url);
        let response = self.authorize(self.client.get(&url)).send().await?;
        Self::decode(response).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> MailSyncResult<T> {
        let url = self.url(path);
        debug!("PUT {}", url);
        let response = self
            .authorize(self.client.put(&url))
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    fn authorize(&self, mut builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(uid) = &self.uid {
            builder = builder.header(UID_HEADER, uid);
        }
        if let Some(token) = &self.access_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> MailSyncResult<T> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(error_from_response(status, &body));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Classifies a failed API call from its status and error body.
pub fn error_from_response(status: StatusCode, body: &str) -> MailSyncError {
    let parsed = serde_json::from_str::<ApiErrorBody>(body).ok();
    match parsed {
        Some(ApiErrorBody { code, error }) if code == API_CODE_INVALID_EVENT_ID => raise_error!(
            format!("Event cursor rejected by server: {}", error),
            ErrorCode::InvalidEventCursor
        ),
        Some(ApiErrorBody { code, error }) if code != 0 => raise_error!(
            format!("Mail API returned {} (code {}): {}", status, code, error),
            ErrorCode::from_status(status)
        ),
        _ => raise_error!(
            format!("Mail API returned {}: {}", status, body),
            ErrorCode::from_status(status)
        ),
    }
}
