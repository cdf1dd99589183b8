//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - The callable RPC endpoints (confirm, cancel, reverse)
//! - Entry CRUD, order upsert and rollup reads
//! - Metrics endpoints served from the tenant snapshot cache
//! - Authentication middleware and the API error mapping

pub mod error;
pub mod middleware;
pub mod routes;

use axum::Router;
use std::sync::Arc;
use tokio::sync::Notify;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use solaris_core::ledger::LedgerCalendar;
use solaris_core::metrics::{MetricsCache, MetricsService};
use solaris_core::store::LedgerStore;
use solaris_shared::JwtService;
use solaris_shared::types::TenantId;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState<S> {
    /// Ledger store backend.
    pub store: S,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// Metrics over cached entry snapshots.
    pub metrics: MetricsService<S>,
    /// Wakes the change-event dispatcher after a write, if one is running.
    pub dispatcher: Option<Arc<Notify>>,
}

impl<S: LedgerStore> AppState<S> {
    /// Creates the state. The metrics cache is shared with the dispatcher so
    /// deliveries invalidate what handlers read.
    pub fn new(store: S, jwt_service: Arc<JwtService>, cache: MetricsCache, calendar: LedgerCalendar) -> Self {
        Self {
            metrics: MetricsService::new(store.clone(), cache, calendar),
            store,
            jwt_service,
            dispatcher: None,
        }
    }

    /// Attaches the dispatcher waker.
    #[must_use]
    pub fn with_dispatcher(mut self, waker: Arc<Notify>) -> Self {
        self.dispatcher = Some(waker);
        self
    }

    /// Ledger timezone calendar.
    #[must_use]
    pub fn calendar(&self) -> LedgerCalendar {
        self.metrics.calendar()
    }

    /// Signals that new change events are waiting.
    pub fn wake_dispatcher(&self) {
        if let Some(waker) = &self.dispatcher {
            waker.notify_one();
        }
    }

    /// Drops the tenant's cached snapshot and wakes the dispatcher after a write.
    pub fn touched(&self, tenant_id: TenantId) {
        self.metrics.cache().invalidate(tenant_id);
        self.wake_dispatcher();
    }
}

/// Creates the main application router.
pub fn create_router<S: LedgerStore>(state: AppState<S>) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
