// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

pub mod backoff;
pub mod client;
pub mod dispatcher;
pub mod payload;
pub mod scheduler;
