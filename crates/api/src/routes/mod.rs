//! API route definitions.

use axum::{Router, middleware};

use crate::AppState;
use crate::middleware::{auth_middleware, optional_auth_middleware};
use solaris_core::store::LedgerStore;

pub mod entries;
pub mod functions;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod rollups;

/// Creates the API router.
///
/// Health is public. Callable functions resolve the caller themselves so an
/// anonymous call gets the function's own `permission-denied` answer. Tenant
/// routes require a valid token.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes<S: LedgerStore>(state: AppState<S>) -> Router<AppState<S>> {
    let functions = functions::routes::<S>().layer(middleware::from_fn_with_state(
        state.clone(),
        optional_auth_middleware::<S>,
    ));

    let protected_routes = Router::new()
        .merge(entries::routes::<S>())
        .merge(orders::routes::<S>())
        .merge(rollups::routes::<S>())
        .merge(metrics::routes::<S>())
        .layer(middleware::from_fn_with_state(state, auth_middleware::<S>));

    Router::new()
        .merge(health::routes::<S>())
        .merge(functions)
        .merge(protected_routes)
}

#[cfg(test)]
mod tests;
