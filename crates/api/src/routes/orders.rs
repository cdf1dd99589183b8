//! Service order routes.
//!
//! Saving an order is what drives installment generation: completing it
//! emits the change event the fan-out handler reacts to.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::put,
};
use serde_json::{Value, json};

use crate::{ApiError, AppState, middleware::AuthUser};
use solaris_core::orders::{OrderService, ServiceOrder};
use solaris_core::store::LedgerStore;
use solaris_shared::AppError;
use solaris_shared::types::{OrderId, TenantId};

/// Creates the order routes (requires auth middleware to be applied externally).
pub fn routes<S: LedgerStore>() -> Router<AppState<S>> {
    Router::new().route("/empresas/{empresa_id}/os/{os_id}", put(upsert_order::<S>))
}

/// Builds the order document, with the path identifiers taking precedence.
fn order_document(tenant_id: TenantId, order_id: OrderId, mut body: Value) -> Result<ServiceOrder, ApiError> {
    let Value::Object(map) = &mut body else {
        return Err(AppError::InvalidArgument("O corpo da OS precisa ser um objeto.".to_string()).into());
    };
    map.insert("id".to_string(), json!(order_id));
    map.insert("empresaId".to_string(), json!(tenant_id));
    serde_json::from_value(body).map_err(|e| AppError::InvalidArgument(format!("OS inválida: {e}")).into())
}

async fn upsert_order<S: LedgerStore>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    Path((tenant_id, order_id)): Path<(TenantId, OrderId)>,
    Json(body): Json<Value>,
) -> Result<Json<ServiceOrder>, ApiError> {
    caller.authorize(tenant_id)?;
    let order = order_document(tenant_id, order_id, body)?;
    let saved = OrderService::new(state.store.clone())
        .upsert(tenant_id, order_id, order)
        .await?;
    state.wake_dispatcher();
    Ok(Json(saved))
}
