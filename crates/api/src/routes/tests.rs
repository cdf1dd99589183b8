use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::Utc;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use crate::{AppState, create_router};
use solaris_core::events::{DispatcherSettings, EventDispatcher};
use solaris_core::ledger::LedgerCalendar;
use solaris_core::metrics::MetricsCache;
use solaris_core::store::{LedgerStore, MemoryStore};
use solaris_shared::types::TenantId;
use solaris_shared::{JwtConfig, JwtService};

struct TestApp {
    router: Router,
    store: MemoryStore,
    cache: MetricsCache,
    jwt: Arc<JwtService>,
}

impl TestApp {
    fn new() -> Self {
        let store = MemoryStore::new();
        let cache = MetricsCache::new();
        let jwt = Arc::new(JwtService::new(JwtConfig::default()));
        let state = AppState::new(store.clone(), Arc::clone(&jwt), cache.clone(), LedgerCalendar::utc());
        Self {
            router: create_router(state),
            store,
            cache,
            jwt,
        }
    }

    fn token(&self, tenant: TenantId, role: &str) -> String {
        self.jwt
            .generate_access_token(uuid::Uuid::new_v4(), tenant.into_inner(), role)
            .unwrap()
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn drain(&self) {
        let settings = DispatcherSettings {
            poll_interval: Duration::from_millis(10),
            batch_size: 100,
            max_attempts: 5,
        };
        EventDispatcher::standard(self.store.clone(), LedgerCalendar::utc(), settings)
            .with_cache(self.cache.clone())
            .drain()
            .await
            .unwrap();
    }
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).unwrap(),
        other => panic!("not a decimal: {other}"),
    }
}

async fn create_pending(app: &TestApp, tenant: TenantId, token: &str, valor: &str) -> String {
    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/empresas/{tenant}/lancamentos"),
            Some(token),
            Some(json!({
                "tipo": "ENTRADA",
                "valor": valor,
                "data_vencimento": "2026-02-10",
                "categoria": "Lavagem",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

// ========== Health ==========

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["ledgerTimezone"], "UTC");
    assert_eq!(body["dispatcher"], false);
}

// ========== Callable functions ==========

#[tokio::test]
async fn test_confirm_without_caller_is_denied() {
    let app = TestApp::new();
    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/functions/confirmarLancamento",
            None,
            Some(json!({ "empresaId": TenantId::new(), "lancamentoId": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "permission-denied");
    assert_eq!(body["message"], "Operação permitida apenas para usuários autenticados.");
}

#[tokio::test]
async fn test_confirm_by_regular_user_is_denied() {
    let app = TestApp::new();
    let tenant = TenantId::new();
    let token = app.token(tenant, "operador");
    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/functions/confirmarLancamento",
            Some(&token),
            Some(json!({ "empresaId": tenant, "lancamentoId": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Somente o backend está autorizado a executar esta ação.");
}

#[tokio::test]
async fn test_confirm_is_idempotent() {
    let app = TestApp::new();
    let tenant = TenantId::new();
    let token = app.token(tenant, "system");
    let entry_id = create_pending(&app, tenant, &token, "250").await;

    let request = json!({ "empresaId": tenant, "lancamentoId": entry_id, "status": "RECEBIDO" });
    let (status, body) = app
        .call(Method::POST, "/api/v1/functions/confirmarLancamento", Some(&token), Some(request.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "alreadyConfirmed": false }));

    let (_, body) = app
        .call(Method::POST, "/api/v1/functions/confirmarLancamento", Some(&token), Some(request))
        .await;
    assert_eq!(body, json!({ "ok": true, "alreadyConfirmed": true }));
}

#[tokio::test]
async fn test_confirm_missing_ids_is_invalid_argument() {
    let app = TestApp::new();
    let token = app.token(TenantId::new(), "system");
    let (status, body) = app
        .call(Method::POST, "/api/v1/functions/confirmarLancamento", Some(&token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "empresaId e lancamentoId são obrigatórios.");
}

#[tokio::test]
async fn test_cancel_confirmed_entry_fails_precondition() {
    let app = TestApp::new();
    let tenant = TenantId::new();
    let token = app.token(tenant, "system");
    let entry_id = create_pending(&app, tenant, &token, "90").await;

    app.call(
        Method::POST,
        "/api/v1/functions/confirmarLancamento",
        Some(&token),
        Some(json!({ "empresaId": tenant, "lancamentoId": entry_id })),
    )
    .await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/functions/cancelarLancamentoPendente",
            Some(&token),
            Some(json!({ "empresaId": tenant, "lancamentoId": entry_id, "motivo": "engano" })),
        )
        .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(body["error"], "failed-precondition");
}

#[tokio::test]
async fn test_reverse_returns_new_entry_id() {
    let app = TestApp::new();
    let tenant = TenantId::new();
    let token = app.token(tenant, "system");
    let entry_id = create_pending(&app, tenant, &token, "400").await;

    app.call(
        Method::POST,
        "/api/v1/functions/confirmarLancamento",
        Some(&token),
        Some(json!({ "empresaId": tenant, "lancamentoId": entry_id })),
    )
    .await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/functions/estornarLancamento",
            Some(&token),
            Some(json!({ "empresaId": tenant, "lancamentoId": entry_id, "dataEstorno": "2026-02-15" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["alreadyEstornado"], false);
    assert!(body["estornoLancamentoId"].is_string());
}

// ========== Tenant routes ==========

#[tokio::test]
async fn test_tenant_routes_require_token() {
    let app = TestApp::new();
    let (status, body) = app
        .call(Method::GET, &format!("/api/v1/empresas/{}/lancamentos", TenantId::new()), None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_token");
}

#[tokio::test]
async fn test_other_tenant_is_forbidden() {
    let app = TestApp::new();
    let token = app.token(TenantId::new(), "operador");
    let (status, body) = app
        .call(Method::GET, &format!("/api/v1/empresas/{}/lancamentos", TenantId::new()), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "permission-denied");
}

#[tokio::test]
async fn test_entry_crud() {
    let app = TestApp::new();
    let tenant = TenantId::new();
    let token = app.token(tenant, "operador");
    let entry_id = create_pending(&app, tenant, &token, "120.50").await;
    let uri = format!("/api/v1/empresas/{tenant}/lancamentos/{entry_id}");

    let (status, body) = app.call(Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "PENDENTE");
    assert_eq!(decimal(&body["valor"]), dec!(120.50));

    let (status, body) = app
        .call(Method::PATCH, &uri, Some(&token), Some(json!({ "valor": 130 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["valor"]), dec!(130));

    let (status, _) = app.call(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.call(Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Lançamento não encontrado.");
}

#[tokio::test]
async fn test_invalid_entry_is_rejected() {
    let app = TestApp::new();
    let tenant = TenantId::new();
    let token = app.token(tenant, "operador");
    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/empresas/{tenant}/lancamentos"),
            Some(&token),
            Some(json!({ "tipo": "TRANSFERENCIA", "valor": 10 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid-argument");
}

#[tokio::test]
async fn test_receber_requires_backend_and_confirms() {
    let app = TestApp::new();
    let tenant = TenantId::new();
    let operator = app.token(tenant, "operador");
    let entry_id = create_pending(&app, tenant, &operator, "75").await;
    let uri = format!("/api/v1/empresas/{tenant}/lancamentos/{entry_id}/receber");

    let (status, _) = app.call(Method::POST, &uri, Some(&operator), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let system = app.token(tenant, "system");
    let (status, body) = app
        .call(Method::POST, &uri, Some(&system), Some(json!({ "metodoPagamento": "PIX" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alreadyConfirmed"], false);

    let (_, entry) = app
        .call(Method::GET, &format!("/api/v1/empresas/{tenant}/lancamentos/{entry_id}"), Some(&system), None)
        .await;
    assert_eq!(entry["status"], "RECEBIDO");
}

#[tokio::test]
async fn test_contas_a_receber_lists_pending_inflows() {
    let app = TestApp::new();
    let tenant = TenantId::new();
    let token = app.token(tenant, "operador");
    create_pending(&app, tenant, &token, "10").await;
    create_pending(&app, tenant, &token, "20").await;

    let (status, body) = app
        .call(Method::GET, &format!("/api/v1/empresas/{tenant}/contas-a-receber"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

// ========== Orders and rollups ==========

#[tokio::test]
async fn test_completed_order_produces_entries_and_rollups() {
    let app = TestApp::new();
    let tenant = TenantId::new();
    let token = app.token(tenant, "operador");
    let system = app.token(tenant, "system");
    let order_uri = format!("/api/v1/empresas/{tenant}/os/{}", uuid::Uuid::new_v4());
    let order = |status: &str| {
        json!({
            "status": status,
            "cliente_nome": "Marina",
            "financial": {
                "payments": [{
                    "method": "PIX",
                    "installments": 2,
                    "netValue": 600,
                    "dueDate": "2026-02-10",
                }],
            },
        })
    };

    let (status, _) = app.call(Method::PUT, &order_uri, Some(&token), Some(order("IN_PROGRESS"))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.call(Method::PUT, &order_uri, Some(&token), Some(order("CONCLUIDA"))).await;
    assert_eq!(status, StatusCode::OK);
    app.drain().await;

    let (_, entries) = app
        .call(Method::GET, &format!("/api/v1/empresas/{tenant}/contas-a-receber"), Some(&token), None)
        .await;
    let entries = entries.as_array().unwrap().clone();
    assert_eq!(entries.len(), 2);

    let first = entries[0]["id"].as_str().unwrap();
    app.call(
        Method::POST,
        "/api/v1/functions/confirmarLancamento",
        Some(&system),
        Some(json!({ "empresaId": tenant, "lancamentoId": first, "dataPagamento": "2026-02-11" })),
    )
    .await;
    app.drain().await;

    let (status, rollups) = app
        .call(Method::GET, &format!("/api/v1/empresas/{tenant}/financeiro-mensal"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let rollups = rollups.as_array().unwrap();
    // Generated installments accrue in the month the order was completed.
    let completed_month = LedgerCalendar::utc().month_id(Utc::now()).to_string();
    assert_eq!(rollups.len(), 1);
    assert_eq!(rollups[0]["monthKey"], completed_month.as_str());
    assert_eq!(decimal(&rollups[0]["totals"]["entradas"]), dec!(300));
}

#[tokio::test]
async fn test_rollup_lookup_errors() {
    let app = TestApp::new();
    let tenant = TenantId::new();
    let token = app.token(tenant, "operador");

    let (status, _) = app
        .call(Method::GET, &format!("/api/v1/empresas/{tenant}/financeiro-mensal/2026-02"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .call(Method::GET, &format!("/api/v1/empresas/{tenant}/financeiro-mensal/fev-2026"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid-argument");
}

// ========== Metrics ==========

#[tokio::test]
async fn test_dashboard_sees_writes_immediately() {
    let app = TestApp::new();
    let tenant = TenantId::new();
    let token = app.token(tenant, "operador");
    let uri = format!("/api/v1/empresas/{tenant}/financeiro/dashboard");

    let (status, body) = app.call(Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["caixaAtual"]), Decimal::ZERO);

    app.call(
        Method::POST,
        &format!("/api/v1/empresas/{tenant}/lancamentos"),
        Some(&token),
        Some(json!({ "tipo": "ENTRADA", "valor": 500, "status": "RECEBIDO" })),
    )
    .await;

    let (_, body) = app.call(Method::GET, &uri, Some(&token), None).await;
    assert_eq!(decimal(&body["caixaAtual"]), dec!(500));
}

#[tokio::test]
async fn test_inverted_period_is_rejected() {
    let app = TestApp::new();
    let tenant = TenantId::new();
    let token = app.token(tenant, "operador");
    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/empresas/{tenant}/financeiro/periodo?inicio=2026-03-01&fim=2026-02-01"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid-argument");
}

#[tokio::test]
async fn test_grafico_mensal_has_twelve_months() {
    let app = TestApp::new();
    let tenant = TenantId::new();
    let token = app.token(tenant, "operador");
    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/empresas/{tenant}/financeiro/grafico-mensal?ano=2026&meta=1000"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["labels"].as_array().unwrap().len(), 12);
}

#[tokio::test]
async fn test_grafico_mensal_rejects_out_of_range_meta() {
    let app = TestApp::new();
    let tenant = TenantId::new();
    let token = app.token(tenant, "operador");

    for meta in ["-79228162514264337593543950335", "-1", "79228162514264337593543950335"] {
        let (status, body) = app
            .call(
                Method::GET,
                &format!("/api/v1/empresas/{tenant}/financeiro/grafico-mensal?ano=2026&meta={meta}"),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "meta={meta}");
        assert_eq!(body["error"], "invalid-argument");
    }
}

#[tokio::test]
async fn test_dispatcher_rollups_visible_after_cache_invalidation() {
    let app = TestApp::new();
    let tenant = TenantId::new();
    let token = app.token(tenant, "system");
    let entry_id = create_pending(&app, tenant, &token, "640").await;
    app.call(
        Method::POST,
        "/api/v1/functions/confirmarLancamento",
        Some(&token),
        Some(json!({ "empresaId": tenant, "lancamentoId": entry_id })),
    )
    .await;
    app.drain().await;

    assert_eq!(app.store.pending_count().await, 0);
    let rollups = app.store.list_rollups(tenant).await.unwrap();
    assert_eq!(rollups.len(), 1);
}
