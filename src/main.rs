use std::{sync::Arc, time::Duration};

use mailsync::{
    mailsync_version,
    modules::{
        actions::{api::HttpMutationApi, ActionEngine, StaticContext, TracingSpamReporter},
        cache::store::{CacheChange, LocalCache},
        common::{
            http::ApiClient,
            signal::{SignalManager, SIGNAL_MANAGER},
            Initialize,
        },
        error::MailSyncResult,
        events::{
            client::HttpEventLog,
            dispatcher::{EventDispatcher, TracingSink},
            scheduler::{EventLoop, LoopConfig},
        },
        logger,
        mailbox::{labels::LabelsModel, model::ViewMode},
        notify::{Notifier, TracingNotifier},
        settings::cli::SETTINGS,
    },
};
use mimalloc::MiMalloc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const LISTING_PAGE_SIZE: u64 = 50;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Everything one signed-in session keeps alive.
struct Session {
    cache: Arc<LocalCache>,
    labels: Arc<LabelsModel>,
    dispatcher: Arc<EventDispatcher>,
    event_loop: EventLoop,
    engine: ActionEngine,
}

#[tokio::main]
async fn main() -> MailSyncResult<()> {
    logger::initialize_logging();
    info!("Starting mailsync");
    info!("Version:  {}", mailsync_version!());
    info!("Git:      [{}]", env!("GIT_HASH"));
    info!("API:      {}", SETTINGS.mailsync_api_url);

    if let Err(error) = SignalManager::initialize().await {
        eprintln!("{:?}", error);
        return Err(error);
    }

    let session = build_session()?;
    run(session).await;
    Ok(())
}

fn build_session() -> MailSyncResult<Session> {
    let api = ApiClient::from_settings()?;
    let event_log = Arc::new(HttpEventLog::new(api.clone()));
    let cache = Arc::new(LocalCache::new());
    let labels = Arc::new(LabelsModel::new());
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);

    let dispatcher = Arc::new(EventDispatcher::new(
        cache.clone(),
        labels.clone(),
        event_log.clone(),
        notifier.clone(),
        Arc::new(TracingSink),
    ));
    let event_loop = EventLoop::new(
        event_log,
        dispatcher.clone(),
        notifier.clone(),
        LoopConfig::from_settings(),
    );
    let engine = ActionEngine::new(
        cache.clone(),
        labels.clone(),
        Arc::new(HttpMutationApi::new(api)),
        notifier,
        Arc::new(TracingSpamReporter),
        Arc::new(StaticContext::from_settings()),
        Arc::new(event_loop.clone()),
    );

    Ok(Session {
        cache,
        labels,
        dispatcher,
        event_loop,
        engine,
    })
}

/// Logs what the current location would list after each change.
fn log_location(cache: &LocalCache, labels: &LabelsModel) {
    let location = &SETTINGS.mailsync_location;
    let name = labels.display_name(location);
    let listed = match SETTINGS.mailsync_view_mode {
        ViewMode::Conversation => cache
            .conversations_in_label(location, Some(1), Some(LISTING_PAGE_SIZE))
            .map(|page| (page.items.len(), page.total_items)),
        ViewMode::Message => cache
            .messages_in_label(location, Some(1), Some(LISTING_PAGE_SIZE))
            .map(|page| (page.items.len(), page.total_items)),
    };
    match listed {
        Ok((shown, cached)) => {
            let count = match SETTINGS.mailsync_view_mode {
                ViewMode::Conversation => cache.conversation_count(location),
                ViewMode::Message => cache.message_count(location),
            };
            debug!(
                "{}: showing {} of {} cached, {} unread of {} on server",
                name, shown, cached, count.unread, count.total
            );
        }
        Err(e) => warn!("Failed to list {}: {:#?}", name, e),
    }
}

async fn run(session: Session) {
    let mut changes = session.cache.subscribe();
    let watched = session.cache.clone();
    let labels = session.labels.clone();
    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(CacheChange::Applied {
                    origin,
                    messages,
                    conversations,
                }) => {
                    debug!(
                        "Cache updated from {:?}: {} messages, {} conversations",
                        origin,
                        messages.len(),
                        conversations.len()
                    );
                    log_location(&watched, &labels);
                }
                Ok(CacheChange::Counters) => log_location(&watched, &labels),
                Ok(CacheChange::Reset) => debug!("Cache reset"),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Cache change watcher lagged by {} notifications", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    if let Err(e) = session.dispatcher.refresh_mail().await {
        warn!("Initial mailbox load failed, relying on the event loop: {:#?}", e);
    }
    if let Err(e) = session.event_loop.initialize(None).await {
        warn!("Event loop started without a cursor: {:#?}", e);
    }
    info!("Event loop running");

    let mut shutdown = SIGNAL_MANAGER.subscribe();
    let _ = shutdown.recv().await;

    if session.event_loop.is_scheduled() {
        session.event_loop.stop();
    }
    info!(
        "Event loop stopped at cursor {:?} (retry index {})",
        session.event_loop.cursor(),
        session.event_loop.retry_index()
    );
    if tokio::time::timeout(SHUTDOWN_GRACE, session.engine.settled())
        .await
        .is_err()
    {
        warn!("Exiting with mutation requests still in flight");
    }
    session.event_loop.logout();
    info!("mailsync stopped");
}
