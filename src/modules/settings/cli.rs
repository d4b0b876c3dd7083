// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use clap::{builder::ValueParser, Parser};
use std::{path::PathBuf, sync::LazyLock, time::Duration};
use url::Url;

use crate::modules::mailbox::model::{ViewMode, INBOX};

#[cfg(not(test))]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::parse);

#[cfg(test)]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::new_for_test);

#[derive(Debug, Parser)]
#[clap(
    name = "mailsync",
    about = "Keeps a local mailbox cache in sync with a remote mail server event log,
    applying user actions optimistically and reconciling them with server deltas.",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Settings {
    /// mailsync log level (default: "info")
    #[clap(
        long,
        default_value = "info",
        env,
        help = "Set the log level for mailsync"
    )]
    pub mailsync_log_level: String,

    /// Enable ANSI logs (default: true)
    #[clap(long, default_value = "true", env, help = "Enable ANSI formatted logs")]
    pub mailsync_ansi_logs: bool,

    /// If false, logs will be printed to stdout
    #[clap(
        long,
        default_value = "false",
        env,
        help = "Enable log file output (otherwise logs go to stdout)"
    )]
    pub mailsync_log_to_file: bool,

    #[clap(
        long,
        default_value = "./logs",
        env,
        help = "Directory that receives the daily rolling log files"
    )]
    pub mailsync_log_dir: PathBuf,

    /// Maximum number of log files (default: 5)
    #[clap(
        long,
        default_value = "5",
        env,
        help = "Set the maximum number of log files kept on disk"
    )]
    pub mailsync_max_log_files: usize,

    #[clap(
        long,
        default_value = "https://mail.example.com/api",
        env,
        help = "Base URL of the mail API (event log and mutation endpoints)",
        value_parser = ValueParser::new(|s: &str| {
            Url::parse(s)
                .map(|_| s.trim_end_matches('/').to_string())
                .map_err(|e| format!("Invalid API base URL '{}': {}", s, e))
        })
    )]
    pub mailsync_api_url: String,

    #[clap(long, env, help = "Session UID sent with every API request")]
    pub mailsync_api_uid: Option<String>,

    #[clap(long, env, help = "Bearer access token for the mail API")]
    pub mailsync_access_token: Option<String>,

    #[clap(
        long,
        default_value = "30",
        env,
        help = "Timeout in seconds for a single API request"
    )]
    pub mailsync_http_timeout_secs: u64,

    #[clap(
        long,
        default_value = "30000",
        env,
        help = "Base interval in milliseconds between two event log polls",
        value_parser = clap::value_parser!(u64).range(100..)
    )]
    pub mailsync_event_interval_ms: u64,

    #[clap(
        long,
        default_value = "1000",
        env,
        help = "Window in milliseconds during which a non-forced call joins the pending poll"
    )]
    pub mailsync_loop_debounce_ms: u64,

    #[clap(
        long,
        default_value = "true",
        env,
        help = "Apply user actions to the local cache before the server confirms them"
    )]
    pub mailsync_cache_context: bool,

    #[clap(
        long,
        default_value = "true",
        env,
        help = "Offer an undo affordance after move actions"
    )]
    pub mailsync_undo_enabled: bool,

    #[clap(
        long,
        value_enum,
        default_value = "conversation",
        env,
        help = "Whether actions target conversations or individual messages"
    )]
    pub mailsync_view_mode: ViewMode,

    #[clap(
        long,
        default_value = INBOX,
        env,
        help = "Label ID of the mailbox location currently displayed"
    )]
    pub mailsync_location: String,
}

impl Settings {
    pub fn event_interval(&self) -> Duration {
        Duration::from_millis(self.mailsync_event_interval_ms)
    }

    pub fn loop_debounce(&self) -> Duration {
        Duration::from_millis(self.mailsync_loop_debounce_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.mailsync_http_timeout_secs)
    }

    #[cfg(test)]
    fn new_for_test() -> Self {
        Self {
            mailsync_log_level: "info".to_string(),
            mailsync_ansi_logs: false,
            mailsync_log_to_file: false,
            mailsync_log_dir: PathBuf::from("./logs"),
            mailsync_max_log_files: 5,
            mailsync_api_url: "http://localhost:15630/api".to_string(),
            mailsync_api_uid: None,
            mailsync_access_token: None,
            mailsync_http_timeout_secs: 10,
            mailsync_event_interval_ms: 30_000,
            mailsync_loop_debounce_ms: 1_000,
            mailsync_cache_context: true,
            mailsync_undo_enabled: true,
            mailsync_view_mode: ViewMode::Conversation,
            mailsync_location: INBOX.to_string(),
        }
    }
}
