// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use http::StatusCode;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    // Client-side errors (10000–10999)
    InvalidParameter = 10000,

    // Authentication and authorization errors (20000–20999)
    PermissionDenied = 20000,

    // Resource errors (30000–30999)
    ResourceNotFound = 30000,
    TooManyRequest = 30020,

    // Network connection errors (40000–40999)
    NetworkUnreachable = 40000,
    ConnectionTimeout = 40010,
    HttpResponseError = 40030,

    // Event log and mutation errors (50000–50999)
    InvalidEventCursor = 50080,
    MutationRejected = 50100,

    // Internal system errors (70000–70999)
    InternalError = 70000,
}

impl ErrorCode {
    /// Maps a non-success status returned by the mail API.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ErrorCode::InvalidParameter
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorCode::PermissionDenied,
            StatusCode::NOT_FOUND => ErrorCode::ResourceNotFound,
            StatusCode::TOO_MANY_REQUESTS => ErrorCode::TooManyRequest,
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                ErrorCode::ConnectionTimeout
            }
            _ => ErrorCode::HttpResponseError,
        }
    }

    /// Failures of this class mean the API could not be reached at all.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            ErrorCode::NetworkUnreachable | ErrorCode::ConnectionTimeout
        )
    }
}
