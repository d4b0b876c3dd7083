// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};
use parking_lot::Mutex;
use tokio::{task::JoinHandle, time::Instant};
use tracing::{debug, error, info, warn};

use crate::modules::{
    error::{code::ErrorCode, MailSyncError, MailSyncResult},
    events::{backoff::RetryState, client::EventLogClient, payload::EventPayload},
    notify::{Notifier, RetryNow},
    settings::cli::SETTINGS,
};

/// One poll of the event log, shareable between every caller that joins it.
pub type LoopFuture = Shared<BoxFuture<'static, MailSyncResult<()>>>;

const RETRY_NOTICE: &str = "Unable to reach the mail server. Trying again shortly.";

/// Receives every successfully fetched payload, in cursor order.
pub trait PayloadHandler: Send + Sync {
    fn handle(&self, payload: EventPayload) -> BoxFuture<'static, MailSyncResult<()>>;

    /// Drops whatever state the handler derived from the current session.
    fn reset(&self) {}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LoopConfig {
    pub base_interval: Duration,
    pub debounce: Duration,
}

impl LoopConfig {
    pub fn from_settings() -> Self {
        Self {
            base_interval: SETTINGS.event_interval(),
            debounce: SETTINGS.loop_debounce(),
        }
    }
}

struct ScheduledLoop {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct LoopState {
    cursor: Option<String>,
    retry: RetryState,
    timer: Option<ScheduledLoop>,
    timer_generation: u64,
    in_flight: Option<(u64, LoopFuture)>,
    loop_id: u64,
    loop_started_at: Option<Instant>,
    retry_notice: bool,
    /// Bumped on logout so fetches started before it are discarded.
    epoch: u64,
}

impl LoopState {
    fn finish(&mut self, loop_id: u64) {
        if matches!(&self.in_flight, Some((id, _)) if *id == loop_id) {
            self.in_flight = None;
            self.loop_started_at = None;
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
        }
    }
}

struct Inner {
    client: Arc<dyn EventLogClient>,
    handler: Arc<dyn PayloadHandler>,
    notifier: Arc<dyn Notifier>,
    config: LoopConfig,
    state: Mutex<LoopState>,
}

/// Polls the server event log on a Fibonacci backoff and hands each payload
/// to a [`PayloadHandler`].
///
/// At most one fetch is in flight. A scheduled poll can be cancelled with
/// [`EventLoop::stop`], but a fetch that already started always runs to
/// completion.
#[derive(Clone)]
pub struct EventLoop {
    inner: Arc<Inner>,
}

impl EventLoop {
    pub fn new(
        client: Arc<dyn EventLogClient>,
        handler: Arc<dyn PayloadHandler>,
        notifier: Arc<dyn Notifier>,
        config: LoopConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                handler,
                notifier,
                config,
                state: Mutex::new(LoopState::default()),
            }),
        }
    }

    fn from_weak(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub fn cursor(&self) -> Option<String> {
        self.inner.state.lock().cursor.clone()
    }

    pub fn retry_index(&self) -> usize {
        self.inner.state.lock().retry.index()
    }

    pub fn is_scheduled(&self) -> bool {
        self.inner.state.lock().timer.is_some()
    }

    /// Keeps a held cursor, otherwise adopts `cursor` or the server's latest,
    /// then makes sure a poll is scheduled.
    pub async fn initialize(&self, cursor: Option<String>) -> MailSyncResult<()> {
        if self.cursor().is_some() {
            self.start();
            return Ok(());
        }
        if let Some(cursor) = cursor {
            self.inner.state.lock().cursor = Some(cursor);
            self.start();
            return Ok(());
        }
        let epoch = self.inner.state.lock().epoch;
        let latest = self.inner.client.latest_event_id().await;
        let result = match latest {
            Ok(id) => {
                let mut state = self.inner.state.lock();
                if state.epoch == epoch && state.cursor.is_none() {
                    state.cursor = Some(id);
                }
                Ok(())
            }
            Err(e) => {
                warn!("Failed to fetch the latest event cursor: {:#?}", e);
                Err(e)
            }
        };
        self.start();
        result
    }

    /// Schedules the next poll unless one is already scheduled.
    pub fn start(&self) {
        let mut state = self.inner.state.lock();
        self.schedule(&mut state);
    }

    /// Cancels the scheduled poll, if any.
    pub fn stop(&self) {
        self.inner.state.lock().cancel_timer();
    }

    /// Polls now, joining a poll started less than the debounce window ago.
    pub fn call(&self) -> LoopFuture {
        self.run_loop(false)
    }

    pub fn run_loop(&self, force: bool) -> LoopFuture {
        let mut state = self.inner.state.lock();
        if !force {
            if let (Some((_, pending)), Some(started)) = (&state.in_flight, state.loop_started_at) {
                if started.elapsed() < self.inner.config.debounce {
                    return pending.clone();
                }
            }
        }
        state.cancel_timer();
        state.loop_id += 1;
        let loop_id = state.loop_id;
        let epoch = state.epoch;
        let cursor = state.cursor.clone();
        state.loop_started_at = Some(Instant::now());

        let this = self.clone();
        let shared = async move { this.execute(loop_id, epoch, cursor).await }
            .boxed()
            .shared();
        state.in_flight = Some((loop_id, shared.clone()));
        drop(state);

        tokio::spawn(shared.clone());
        shared
    }

    /// Forgets the session: cursor, backoff, schedule and handler state.
    pub fn logout(&self) {
        let had_notice = {
            let mut state = self.inner.state.lock();
            state.cancel_timer();
            state.cursor = None;
            state.retry.reset();
            state.in_flight = None;
            state.loop_started_at = None;
            state.epoch += 1;
            std::mem::take(&mut state.retry_notice)
        };
        if had_notice {
            self.inner.notifier.close_warning();
        }
        self.inner.handler.reset();
        info!("Event loop reset after logout");
    }

    fn schedule(&self, state: &mut LoopState) {
        if state.timer.is_some() {
            return;
        }
        let delay = state.retry.delay(self.inner.config.base_interval);
        state.timer_generation += 1;
        let generation = state.timer_generation;
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(event_loop) = EventLoop::from_weak(&weak) else {
                return;
            };
            {
                let mut state = event_loop.inner.state.lock();
                match &state.timer {
                    Some(timer) if timer.generation == generation => state.timer = None,
                    _ => return,
                }
            }
            let _ = event_loop.run_loop(false);
        });
        state.timer = Some(ScheduledLoop { generation, handle });
        debug!("Next event poll in {:?}", delay);
    }

    async fn execute(
        &self,
        loop_id: u64,
        epoch: u64,
        cursor: Option<String>,
    ) -> MailSyncResult<()> {
        let payload = match self.fetch(epoch, cursor).await {
            Ok(payload) => payload,
            Err(e) => {
                self.on_failure(loop_id, epoch, &e);
                return Err(e);
            }
        };

        let had_notice = {
            let mut state = self.inner.state.lock();
            if state.epoch != epoch {
                debug!("Discarding events fetched before logout");
                return Ok(());
            }
            state.finish(loop_id);
            state.cancel_timer();
            state.retry.reset();
            self.schedule(&mut state);
            if !payload.event_id.is_empty() {
                state.cursor = Some(payload.event_id.clone());
            }
            std::mem::take(&mut state.retry_notice)
        };
        if had_notice {
            self.inner.notifier.close_warning();
        }

        let more = payload.has_more();
        if let Err(e) = self.inner.handler.handle(payload).await {
            error!("Failed to apply fetched events: {:#?}", e);
            self.on_failure(loop_id, epoch, &e);
            return Err(e);
        }
        if more {
            debug!("Event log has more pending events, polling again");
            return self.run_loop(true).await;
        }
        Ok(())
    }

    async fn fetch(&self, epoch: u64, cursor: Option<String>) -> MailSyncResult<EventPayload> {
        let cursor = match cursor {
            Some(cursor) => cursor,
            None => {
                let latest = self.inner.client.latest_event_id().await?;
                let mut state = self.inner.state.lock();
                if state.epoch == epoch {
                    state.cursor = Some(latest.clone());
                }
                info!("Bootstrapped event cursor {}", latest);
                latest
            }
        };
        self.inner.client.fetch_events(&cursor).await
    }

    fn on_failure(&self, loop_id: u64, epoch: u64, e: &MailSyncError) {
        let show_notice = {
            let mut state = self.inner.state.lock();
            if state.epoch != epoch {
                return;
            }
            state.finish(loop_id);
            state.cancel_timer();

            if e.code() == ErrorCode::InvalidEventCursor {
                warn!("Event cursor {:?} is no longer valid, resetting", state.cursor);
                state.cursor = None;
                self.schedule(&mut state);
                return;
            }

            let show_notice = e.code().is_network() && !state.retry_notice;
            if e.code().is_network() {
                state.retry_notice = true;
            }
            state.retry.increment();
            warn!(
                "Event poll failed ({:?}), backing off to index {}: {}",
                e.code(),
                state.retry.index(),
                e.message()
            );
            self.schedule(&mut state);
            show_notice
        };

        if show_notice {
            let weak = Arc::downgrade(&self.inner);
            let retry = RetryNow::new(move || {
                if let Some(event_loop) = EventLoop::from_weak(&weak) {
                    let had_notice =
                        std::mem::take(&mut event_loop.inner.state.lock().retry_notice);
                    if had_notice {
                        event_loop.inner.notifier.close_warning();
                    }
                    let _ = event_loop.run_loop(false);
                }
            });
            self.inner.notifier.warn(RETRY_NOTICE, retry);
        }
    }
}
