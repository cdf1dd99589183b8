//! Outbox dispatcher.
//!
//! Polls the store outbox and delivers each pending event to every
//! registered handler through [`ProcessedEventStore::run_once`]. An event is
//! acknowledged once all handlers have either applied it, skipped it as a
//! duplicate or ignored it. A failing event stays pending and is retried on
//! the next poll until `max_attempts`, then parked.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use solaris_shared::config::DispatcherConfig;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use super::error::ProcessError;
use super::monthly_rollup::MonthlyRollupHandler;
use super::order_completion::OrderCompletionHandler;
use super::processed::{EventHandler, ProcessedEventStore, Processing};
use crate::ledger::calendar::LedgerCalendar;
use crate::metrics::cache::MetricsCache;
use crate::store::{ChangeEvent, LedgerStore, StoreError};

/// Default delay between polls.
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Default number of events fetched per poll.
const DEFAULT_BATCH_SIZE: usize = 100;

/// Default deliveries before an event is parked.
const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Dispatcher tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherSettings {
    pub poll_interval: Duration,
    pub batch_size: usize,
    pub max_attempts: u32,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            batch_size: DEFAULT_BATCH_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl From<&DispatcherConfig> for DispatcherSettings {
    fn from(config: &DispatcherConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            batch_size: usize::try_from(config.batch_size).unwrap_or(DEFAULT_BATCH_SIZE).max(1),
            max_attempts: config.max_attempts.max(1),
        }
    }
}

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Events read from the outbox.
    pub fetched: usize,
    /// Events acknowledged.
    pub delivered: usize,
    /// Handler runs that applied effects.
    pub applied: usize,
    /// Handler runs skipped because the marker already existed.
    pub duplicates: usize,
    /// Events left pending for a retry.
    pub failed: usize,
    /// Events parked after their last attempt.
    pub parked: usize,
}

/// Delivers outbox events to handlers.
pub struct EventDispatcher<S: LedgerStore> {
    store: S,
    processor: ProcessedEventStore<S>,
    handlers: Vec<Arc<dyn EventHandler<S::Tx>>>,
    settings: DispatcherSettings,
    cache: Option<MetricsCache>,
    notify: Arc<Notify>,
}

impl<S: LedgerStore> EventDispatcher<S> {
    /// Creates a dispatcher without handlers.
    pub fn new(store: S, settings: DispatcherSettings) -> Self {
        Self {
            processor: ProcessedEventStore::new(store.clone()),
            store,
            handlers: Vec::new(),
            settings,
            cache: None,
            notify: Arc::new(Notify::new()),
        }
    }

    /// Creates a dispatcher with the order fan-out and monthly rollup handlers.
    pub fn standard(store: S, calendar: LedgerCalendar, settings: DispatcherSettings) -> Self {
        Self::new(store, settings)
            .with_handler(OrderCompletionHandler)
            .with_handler(MonthlyRollupHandler::new(calendar))
    }

    /// Registers a handler. Handlers run in registration order.
    #[must_use]
    pub fn with_handler<H>(mut self, handler: H) -> Self
    where
        H: EventHandler<S::Tx> + 'static,
    {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Invalidates the tenant's snapshot in `cache` after each delivery.
    #[must_use]
    pub fn with_cache(mut self, cache: MetricsCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Handle that wakes the dispatcher before its next poll.
    #[must_use]
    pub fn waker(&self) -> Arc<Notify> {
        Arc::clone(&self.notify)
    }

    /// Wakes the dispatcher before its next poll.
    pub fn wake(&self) {
        self.notify.notify_one();
    }

    #[must_use]
    pub const fn settings(&self) -> DispatcherSettings {
        self.settings
    }

    /// Delivers one batch of pending events.
    ///
    /// # Errors
    ///
    /// Returns a store error if the outbox cannot be read or updated. Handler
    /// failures are recorded on the event and counted in the report instead.
    pub async fn dispatch_pending(&self) -> Result<DispatchReport, StoreError> {
        let events = self.store.pending_events(self.settings.batch_size).await?;
        let mut report = DispatchReport {
            fetched: events.len(),
            ..DispatchReport::default()
        };

        for event in &events {
            match self.deliver(event, &mut report).await {
                Ok(()) => {
                    self.store.ack_event(event.id).await?;
                    if let Some(cache) = &self.cache {
                        cache.invalidate(event.tenant_id);
                    }
                    report.delivered += 1;
                }
                Err(e) => {
                    let attempt = event.attempts + 1;
                    let park = !e.is_retryable() || attempt >= self.settings.max_attempts;
                    error!(
                        event_id = %event.id,
                        tenant_id = %event.tenant_id,
                        attempt,
                        error_code = e.error_code(),
                        error = %e,
                        "Change event handler failed"
                    );
                    self.store.fail_event(event.id, &e.to_string(), park).await?;
                    if park {
                        warn!(event_id = %event.id, attempt, "Change event parked");
                        report.parked += 1;
                    } else {
                        report.failed += 1;
                    }
                }
            }
        }

        if report.fetched > 0 {
            debug!(
                fetched = report.fetched,
                delivered = report.delivered,
                failed = report.failed,
                parked = report.parked,
                "Dispatch pass finished"
            );
        }
        Ok(report)
    }

    /// Runs every handler on `event`, stopping at the first failure.
    ///
    /// Handlers that already ran keep their markers, so a retry only
    /// re-runs the ones that did not commit.
    async fn deliver(&self, event: &ChangeEvent, report: &mut DispatchReport) -> Result<(), ProcessError> {
        for handler in &self.handlers {
            match self.processor.run_once(handler.as_ref(), event).await? {
                Processing::Applied(_) => report.applied += 1,
                Processing::Duplicate => report.duplicates += 1,
                Processing::Ignored => {}
            }
        }
        Ok(())
    }

    /// Dispatches until the outbox is empty or a delivery fails.
    ///
    /// Events written by handlers are picked up by the following passes.
    /// Failed events wait for the next poll.
    ///
    /// # Errors
    ///
    /// Returns the first store error.
    pub async fn drain(&self) -> Result<DispatchReport, StoreError> {
        let mut total = DispatchReport::default();
        loop {
            let report = self.dispatch_pending().await?;
            total.fetched += report.fetched;
            total.delivered += report.delivered;
            total.applied += report.applied;
            total.duplicates += report.duplicates;
            total.failed += report.failed;
            total.parked += report.parked;
            if report.fetched == 0 || report.failed > 0 {
                return Ok(total);
            }
        }
    }

    /// Polls until `shutdown` resolves.
    ///
    /// A store error ends the pass, not the loop; the next poll retries.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        info!(
            handlers = self.handlers.len(),
            poll_interval_ms = u64::try_from(self.settings.poll_interval.as_millis()).unwrap_or(u64::MAX),
            batch_size = self.settings.batch_size,
            "Event dispatcher started"
        );
        tokio::pin!(shutdown);

        loop {
            if let Err(e) = self.drain().await {
                error!(error = %e, "Outbox poll failed");
            }

            tokio::select! {
                () = &mut shutdown => break,
                () = self.notify.notified() => {}
                () = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }

        info!("Event dispatcher stopped");
    }
}

impl<S: LedgerStore> std::fmt::Debug for EventDispatcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handlers.iter().map(|h| h.name()).collect::<Vec<_>>())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
