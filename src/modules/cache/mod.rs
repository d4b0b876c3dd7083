// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

pub mod counters;
pub mod event;
pub mod pending;
pub mod store;
#[cfg(test)]
mod tests;
