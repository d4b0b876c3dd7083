// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

pub mod actions;
pub mod cache;
pub mod common;
pub mod error;
pub mod events;
pub mod logger;
pub mod mailbox;
pub mod notify;
pub mod settings;
pub mod utils;
