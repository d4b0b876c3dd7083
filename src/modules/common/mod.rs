// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

pub mod http;
pub mod paginated;
pub mod signal;

use crate::modules::error::MailSyncResult;

/// Process-wide services started once from `main` before the sync loop runs.
pub trait Initialize {
    async fn initialize() -> MailSyncResult<()>;
}
