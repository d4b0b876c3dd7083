// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use code::ErrorCode;
use snafu::{Location, Snafu};

pub mod code;

#[derive(Debug, Clone, Snafu)]
#[snafu(visibility(pub))]
pub enum MailSyncError {
    #[snafu(display("{message}"))]
    Generic {
        message: String,
        #[snafu(implicit)]
        location: Location,
        code: ErrorCode,
    },
}

pub type MailSyncResult<T, E = MailSyncError> = std::result::Result<T, E>;

impl MailSyncError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MailSyncError::Generic { code, .. } => *code,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            MailSyncError::Generic { message, .. } => message,
        }
    }
}

impl From<reqwest::Error> for MailSyncError {
    fn from(e: reqwest::Error) -> Self {
        let code = if e.is_timeout() {
            ErrorCode::ConnectionTimeout
        } else if e.is_connect() || e.is_request() {
            ErrorCode::NetworkUnreachable
        } else if e.is_decode() {
            ErrorCode::InternalError
        } else if let Some(status) = e.status() {
            ErrorCode::from_status(status)
        } else {
            ErrorCode::HttpResponseError
        };
        crate::raise_error!(format!("{:#?}", e), code)
    }
}

impl From<serde_json::Error> for MailSyncError {
    fn from(e: serde_json::Error) -> Self {
        crate::raise_error!(
            format!(
                "Failed to deserialize mail API response: {:#?}. Possible model mismatch or API change.",
                e
            ),
            ErrorCode::InternalError
        )
    }
}
