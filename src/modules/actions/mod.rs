// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, info, warn};

use crate::{
    modules::{
        actions::{
            api::MutationApi,
            plan::{ActionPlan, LabelSelection, Planner},
        },
        cache::store::LocalCache,
        error::{code::ErrorCode, MailSyncResult},
        events::scheduler::EventLoop,
        mailbox::{
            labels::LabelsModel,
            model::{LabelId, ViewMode},
        },
        notify::Notifier,
        settings::cli::SETTINGS,
    },
    raise_error,
};

pub mod api;
pub mod conversation;
pub mod message;
pub mod plan;


/// Inverse of a completed action, offered next to its success notice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Undo {
    Move {
        mode: ViewMode,
        ids: Vec<String>,
        to: LabelId,
    },
}

/// Learns from the senders of mail the user flags as spam.
pub trait SpamReporter: Send + Sync {
    fn report(&self, addresses: Vec<String>);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSpamReporter;

impl SpamReporter for TracingSpamReporter {
    fn report(&self, addresses: Vec<String>) {
        info!("Reporting {} spam senders: {:?}", addresses.len(), addresses);
    }
}

/// UI state the engine consults on every action.
pub trait ActionContext: Send + Sync {
    /// Apply locally before the server confirms.
    fn cache_context(&self) -> bool;

    fn current_location(&self) -> LabelId;

    fn view_mode(&self) -> ViewMode;

    fn can_undo(&self) -> bool;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticContext {
    pub cache_context: bool,
    pub location: LabelId,
    pub view_mode: ViewMode,
    pub can_undo: bool,
}

impl StaticContext {
    pub fn from_settings() -> Self {
        Self {
            cache_context: SETTINGS.mailsync_cache_context,
            location: SETTINGS.mailsync_location.clone(),
            view_mode: SETTINGS.mailsync_view_mode,
            can_undo: SETTINGS.mailsync_undo_enabled,
        }
    }
}

impl ActionContext for StaticContext {
    fn cache_context(&self) -> bool {
        self.cache_context
    }

    fn current_location(&self) -> LabelId {
        self.location.clone()
    }

    fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    fn can_undo(&self) -> bool {
        self.can_undo
    }
}

/// Asks the event loop for an out-of-band poll.
pub trait LoopTrigger: Send + Sync {
    fn trigger(&self);
}

impl LoopTrigger for EventLoop {
    fn trigger(&self) {
        let _ = self.call();
    }
}

/// Turns user actions into local mutation events and remote calls.
///
/// With the cache context on, events are applied before the request leaves;
/// a rejection is reported and repaired by polling the event log rather than
/// by rolling back. With it off, the cache only changes once the server has
/// accepted every request.
#[derive(Clone)]
pub struct ActionEngine {
    cache: Arc<LocalCache>,
    labels: Arc<LabelsModel>,
    api: Arc<dyn MutationApi>,
    notifier: Arc<dyn Notifier>,
    spam: Arc<dyn SpamReporter>,
    context: Arc<dyn ActionContext>,
    resync: Arc<dyn LoopTrigger>,
}

impl ActionEngine {
    pub fn new(
        cache: Arc<LocalCache>,
        labels: Arc<LabelsModel>,
        api: Arc<dyn MutationApi>,
        notifier: Arc<dyn Notifier>,
        spam: Arc<dyn SpamReporter>,
        context: Arc<dyn ActionContext>,
        resync: Arc<dyn LoopTrigger>,
    ) -> Self {
        Self {
            cache,
            labels,
            api,
            notifier,
            spam,
            context,
            resync,
        }
    }

    fn planner(&self) -> Planner<'_> {
        Planner {
            cache: &self.cache,
            labels: &self.labels,
            location: self.context.current_location(),
            can_undo: self.context.can_undo(),
        }
    }

    pub async fn move_to(&self, ids: &[String], to: &str) -> MailSyncResult<()> {
        self.move_in(self.context.view_mode(), ids, to, true).await
    }

    /// Reverts a move without offering another undo.
    pub async fn undo(&self, undo: Undo) -> MailSyncResult<()> {
        match undo {
            Undo::Move { mode, ids, to } => self.move_in(mode, &ids, &to, false).await,
        }
    }

    async fn move_in(&self, mode: ViewMode, ids: &[String], to: &str, undo: bool) -> MailSyncResult<()> {
        let plan = {
            let planner = self.planner();
            match mode {
                ViewMode::Conversation => conversation::move_to(&planner, ids, to, undo),
                ViewMode::Message => message::move_to(&planner, ids, to, undo),
            }
        };
        self.execute(plan).await
    }

    pub async fn label(
        &self,
        ids: &[String],
        selections: &[LabelSelection],
        also_archive: bool,
    ) -> MailSyncResult<()> {
        let plan = {
            let planner = self.planner();
            match self.context.view_mode() {
                ViewMode::Conversation => {
                    conversation::label(&planner, ids, selections, also_archive)
                }
                ViewMode::Message => message::label(&planner, ids, selections, also_archive),
            }
        };
        self.execute(plan).await
    }

    pub async fn unlabel(&self, ids: &[String], label_id: &str) -> MailSyncResult<()> {
        let mut plan = {
            let planner = self.planner();
            let selections = [LabelSelection::remove(label_id)];
            match self.context.view_mode() {
                ViewMode::Conversation => conversation::label(&planner, ids, &selections, false),
                ViewMode::Message => message::label(&planner, ids, &selections, false),
            }
        };
        plan.action = "unlabel";
        self.execute(plan).await
    }

    pub async fn star(&self, ids: &[String]) -> MailSyncResult<()> {
        let plan = self.plan_with(ids, conversation::star, message::star);
        self.execute(plan).await
    }

    pub async fn unstar(&self, ids: &[String]) -> MailSyncResult<()> {
        let plan = self.plan_with(ids, conversation::unstar, message::unstar);
        self.execute(plan).await
    }

    pub async fn read(&self, ids: &[String]) -> MailSyncResult<()> {
        let plan = self.plan_with(ids, conversation::read, message::read);
        self.execute(plan).await
    }

    pub async fn unread(&self, ids: &[String]) -> MailSyncResult<()> {
        let plan = self.plan_with(ids, conversation::unread, message::unread);
        self.execute(plan).await
    }

    pub async fn delete(&self, ids: &[String]) -> MailSyncResult<()> {
        let plan = self.plan_with(ids, conversation::delete, message::delete);
        self.execute(plan).await
    }

    fn plan_with(
        &self,
        ids: &[String],
        for_conversations: fn(&Planner<'_>, &[String]) -> ActionPlan,
        for_messages: fn(&Planner<'_>, &[String]) -> ActionPlan,
    ) -> ActionPlan {
        let planner = self.planner();
        match self.context.view_mode() {
            ViewMode::Conversation => for_conversations(&planner, ids),
            ViewMode::Message => for_messages(&planner, ids),
        }
    }

    /// Runs `plan` in the mode the context selects. The requests run on
    /// their own task, so dropping the returned future does not cancel them.
    pub async fn execute(&self, plan: ActionPlan) -> MailSyncResult<()> {
        if plan.is_empty() {
            debug!("Nothing to do for '{}'", plan.action);
            return Ok(());
        }
        let optimistic = self.context.cache_context();
        if !plan.spam.is_empty() {
            self.spam.report(plan.spam.clone());
        }
        if optimistic {
            self.cache.apply(plan.events.clone(), false);
            self.notify_success(&plan);
        }

        let api = self.api.clone();
        let requests = plan.requests.clone();
        let sent = self.cache.add_pending_request(async move {
            try_join_all(requests.into_iter().map(|r| api.send(r))).await
        });

        let this = self.clone();
        let task = tokio::spawn(async move {
            match sent.await {
                Ok(_) => {
                    if !optimistic {
                        this.cache.apply(plan.events.clone(), false);
                        this.notify_success(&plan);
                        this.resync.trigger();
                    } else if plan.resync {
                        this.resync.trigger();
                    }
                    Ok(())
                }
                Err(e) => {
                    warn!("Action '{}' rejected: {:#?}", plan.action, e);
                    this.notifier
                        .error(&format!("Failed to {}: {}", plan.action, e.message()));
                    if optimistic {
                        this.resync.trigger();
                    }
                    if e.code().is_network() {
                        return Err(e);
                    }
                    Err(raise_error!(
                        format!("Action '{}' rejected: {}", plan.action, e.message()),
                        ErrorCode::MutationRejected
                    ))
                }
            }
        });

        task.await.map_err(|e| {
            raise_error!(
                format!("Action task failed: {:#?}", e),
                ErrorCode::InternalError
            )
        })?
    }

    /// Resolves once every request sent by this engine has settled.
    pub async fn settled(&self) {
        self.cache.pending_settled().await
    }

    fn notify_success(&self, plan: &ActionPlan) {
        if let Some(message) = &plan.success {
            self.notifier.success(message, plan.undo.clone());
        }
    }
}
