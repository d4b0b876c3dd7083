// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::{future::Future, sync::Arc};

use tokio::sync::watch;

/// Counts remote writes that are still in flight so a full refresh can wait
/// for them before it discards the cache.
#[derive(Clone, Debug)]
pub struct PendingWrites {
    in_flight: Arc<watch::Sender<usize>>,
}

pub struct PendingGuard {
    in_flight: Arc<watch::Sender<usize>>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.in_flight.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl Default for PendingWrites {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingWrites {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(0usize);
        Self {
            in_flight: Arc::new(sender),
        }
    }

    pub fn enter(&self) -> PendingGuard {
        self.in_flight.send_modify(|n| *n += 1);
        PendingGuard {
            in_flight: self.in_flight.clone(),
        }
    }

    /// Registers `fut` as an outstanding write for as long as it runs.
    pub fn track<F>(&self, fut: F) -> impl Future<Output = F::Output> + Send + 'static
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let guard = self.enter();
        async move {
            let output = fut.await;
            drop(guard);
            output
        }
    }

    pub fn count(&self) -> usize {
        *self.in_flight.borrow()
    }

    /// Resolves once no write is outstanding.
    pub async fn settled(&self) {
        let mut receiver = self.in_flight.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = receiver.wait_for(|n| *n == 0).await;
    }
}
