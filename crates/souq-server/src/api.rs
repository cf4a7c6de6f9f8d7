use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method},
    routing::{get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use souq_core::{Bot, DeliveryReport, InboundEvent, OutboundPayload, Stats};
use souq_shared::{OrderId, ProductId, TicketId, UserId};
use souq_store::{AdminGrant, LedgerEntry, NewProduct, Order, OrderStatus, Product, Setting, Ticket};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::rate_limit::FloodGuard;

#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<Bot>,
    pub flood_guard: FloodGuard,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(bot_info))
        .route("/events", post(inbound_event))
        .route("/orders", post(place_order))
        .route("/trivia", post(answer_trivia))
        .route("/admin/stats", get(admin_stats))
        .route("/admin/admins", get(admin_list_admins))
        .route("/admin/broadcast", post(admin_broadcast))
        .route("/admin/maintenance", post(admin_toggle_maintenance))
        .route("/admin/settings", get(admin_list_settings))
        .route("/admin/settings/:key", put(admin_update_setting))
        .route("/admin/users/:id/ban", post(admin_ban_user))
        .route("/admin/users/:id/balance", post(admin_adjust_balance))
        .route("/admin/products", post(admin_add_product))
        .route("/admin/products/:id/price", post(admin_update_price))
        .route("/admin/products/:id/restock", post(admin_restock))
        .route("/admin/products/:id/active", post(admin_set_active))
        .route("/admin/orders/:id/status", post(admin_set_order_status))
        .route("/admin/tickets", get(admin_open_tickets))
        .route("/admin/tickets/:id/close", post(admin_close_ticket))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP API listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Public endpoints
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct BotInfoResponse {
    name: String,
    version: String,
    support_channel: String,
}

#[derive(Deserialize)]
struct OrderRequest {
    user_id: UserId,
    product_id: ProductId,
    quantity: i64,
}

#[derive(Deserialize)]
struct TriviaAnswer {
    user_id: UserId,
    question: usize,
    choice: usize,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn bot_info(State(state): State<AppState>) -> Json<BotInfoResponse> {
    let config = state.bot.config();
    Json(BotInfoResponse {
        name: config.bot_name.clone(),
        version: config.bot_version.clone(),
        support_channel: config.support_channel.clone(),
    })
}

async fn flood_check(state: &AppState, user_id: UserId) -> Result<(), ServerError> {
    state.flood_guard.check(user_id).await.map_err(|retry_after| {
        tracing::warn!(user_id = %user_id, ?retry_after, "Flood limit exceeded");
        ServerError::TooManyRequests { retry_after }
    })
}

/// One chat message in, the replies to send back out.
async fn inbound_event(
    State(state): State<AppState>,
    Json(event): Json<InboundEvent>,
) -> Result<Json<Vec<OutboundPayload>>, ServerError> {
    flood_check(&state, event.user_id).await?;
    Ok(Json(state.bot.handle(event).await))
}

async fn place_order(
    State(state): State<AppState>,
    Json(req): Json<OrderRequest>,
) -> Result<Json<Vec<OutboundPayload>>, ServerError> {
    flood_check(&state, req.user_id).await?;
    Ok(Json(
        state
            .bot
            .place_order(req.user_id, req.product_id, req.quantity)
            .await,
    ))
}

async fn answer_trivia(
    State(state): State<AppState>,
    Json(req): Json<TriviaAnswer>,
) -> Result<Json<Vec<OutboundPayload>>, ServerError> {
    flood_check(&state, req.user_id).await?;
    Ok(Json(
        state
            .bot
            .answer_trivia(req.user_id, req.question, req.choice)
            .await,
    ))
}

// ---------------------------------------------------------------------------
// Admin endpoints
// ---------------------------------------------------------------------------

/// Check the bearer token and return the acting admin from `X-Admin-Id`.
/// The core still verifies that this user holds an admin grant.
fn admin_actor(headers: &HeaderMap, config: &ServerConfig) -> Result<UserId, ServerError> {
    let Some(ref expected) = config.admin_token else {
        return Err(ServerError::Forbidden(
            "Admin API is disabled (no ADMIN_TOKEN configured)".into(),
        ));
    };

    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or(auth);

    use subtle::ConstantTimeEq;
    let token_bytes = token.as_bytes();
    let expected_bytes = expected.as_bytes();
    if token_bytes.len() != expected_bytes.len()
        || token_bytes.ct_eq(expected_bytes).unwrap_u8() != 1
    {
        return Err(ServerError::Forbidden("Invalid admin token".into()));
    }

    headers
        .get("x-admin-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServerError::BadRequest("Missing X-Admin-Id header".into()))?
        .parse::<UserId>()
        .map_err(|e| ServerError::BadRequest(e.to_string()))
}

#[derive(Deserialize)]
struct BroadcastRequest {
    body: String,
}

#[derive(Deserialize)]
struct SettingValue {
    value: String,
}

#[derive(Deserialize)]
struct BanRequest {
    banned: bool,
}

#[derive(Deserialize)]
struct BalanceAdjustment {
    amount: Decimal,
    description: String,
}

#[derive(Deserialize)]
struct PriceUpdate {
    price: Decimal,
}

#[derive(Deserialize)]
struct RestockRequest {
    quantity: i64,
}

#[derive(Deserialize)]
struct ActiveFlag {
    active: bool,
}

#[derive(Deserialize)]
struct StatusUpdate {
    status: OrderStatus,
}

async fn admin_stats(headers: HeaderMap, State(state): State<AppState>) -> Result<Json<Stats>, ServerError> {
    let actor = admin_actor(&headers, &state.config)?;
    Ok(Json(state.bot.stats(actor).await?))
}

async fn admin_list_admins(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminGrant>>, ServerError> {
    let actor = admin_actor(&headers, &state.config)?;
    Ok(Json(state.bot.list_admins(actor).await?))
}

async fn admin_broadcast(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<BroadcastRequest>,
) -> Result<Json<DeliveryReport>, ServerError> {
    let actor = admin_actor(&headers, &state.config)?;
    Ok(Json(state.bot.broadcast(actor, &req.body).await?))
}

async fn admin_toggle_maintenance(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let actor = admin_actor(&headers, &state.config)?;
    let enabled = state.bot.toggle_maintenance(actor).await?;
    Ok(Json(serde_json::json!({ "maintenance": enabled })))
}

async fn admin_list_settings(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<Setting>>, ServerError> {
    let actor = admin_actor(&headers, &state.config)?;
    Ok(Json(state.bot.list_settings(actor).await?))
}

async fn admin_update_setting(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SettingValue>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let actor = admin_actor(&headers, &state.config)?;
    state.bot.update_setting(actor, &key, &req.value).await?;
    Ok(Json(serde_json::json!({ "updated": true })))
}

async fn admin_ban_user(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(req): Json<BanRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let actor = admin_actor(&headers, &state.config)?;
    state.bot.ban_user(actor, user_id, req.banned).await?;
    Ok(Json(serde_json::json!({ "banned": req.banned })))
}

async fn admin_adjust_balance(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(req): Json<BalanceAdjustment>,
) -> Result<Json<LedgerEntry>, ServerError> {
    let actor = admin_actor(&headers, &state.config)?;
    let entry = state
        .bot
        .adjust_balance(actor, user_id, req.amount, &req.description)
        .await?;
    Ok(Json(entry))
}

async fn admin_add_product(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(product): Json<NewProduct>,
) -> Result<Json<Product>, ServerError> {
    let actor = admin_actor(&headers, &state.config)?;
    Ok(Json(state.bot.add_product(actor, product).await?))
}

async fn admin_update_price(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
    Json(req): Json<PriceUpdate>,
) -> Result<Json<Product>, ServerError> {
    let actor = admin_actor(&headers, &state.config)?;
    Ok(Json(state.bot.update_price(actor, product_id, req.price).await?))
}

async fn admin_restock(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
    Json(req): Json<RestockRequest>,
) -> Result<Json<Product>, ServerError> {
    let actor = admin_actor(&headers, &state.config)?;
    Ok(Json(state.bot.restock(actor, product_id, req.quantity).await?))
}

async fn admin_set_active(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
    Json(req): Json<ActiveFlag>,
) -> Result<Json<Product>, ServerError> {
    let actor = admin_actor(&headers, &state.config)?;
    Ok(Json(
        state
            .bot
            .set_product_active(actor, product_id, req.active)
            .await?,
    ))
}

async fn admin_set_order_status(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
    Json(req): Json<StatusUpdate>,
) -> Result<Json<Order>, ServerError> {
    let actor = admin_actor(&headers, &state.config)?;
    Ok(Json(state.bot.set_order_status(actor, order_id, req.status).await?))
}

async fn admin_open_tickets(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<Ticket>>, ServerError> {
    let actor = admin_actor(&headers, &state.config)?;
    Ok(Json(state.bot.list_open_tickets(actor).await?))
}

async fn admin_close_ticket(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(ticket_id): Path<TicketId>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let actor = admin_actor(&headers, &state.config)?;
    let closed = state.bot.close_ticket(actor, ticket_id).await?;
    Ok(Json(serde_json::json!({ "closed": closed })))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use souq_core::{BotConfig, RandomOracle};
    use souq_store::Database;

    use super::*;
    use crate::sink::WebhookSink;

    const TOKEN: &str = "s3cret";

    async fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("api.db")).unwrap();
        let bot_config = BotConfig {
            initial_admins: vec![UserId(100)],
            broadcast_pacing: std::time::Duration::ZERO,
            ..BotConfig::default()
        };
        let config = ServerConfig {
            admin_token: Some(TOKEN.into()),
            bot: bot_config.clone(),
            ..ServerConfig::default()
        };
        let sink = Arc::new(WebhookSink::new(None).unwrap());
        let bot = Bot::new(db, sink, Arc::new(RandomOracle), bot_config);
        bot.bootstrap().await.unwrap();

        let state = AppState {
            bot: Arc::new(bot),
            flood_guard: FloodGuard::from_config(&config),
            config: Arc::new(config),
        };
        (state, dir)
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn admin_request(method: &str, uri: &str, actor: i64, body: Option<serde_json::Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {TOKEN}"))
            .header("x-admin-id", actor.to_string());
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (state, _dir) = test_state().await;
        let response = build_router(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn events_return_replies() {
        let (state, _dir) = test_state().await;
        let response = build_router(state)
            .oneshot(json_request(
                "POST",
                "/events",
                serde_json::json!({ "user_id": 1, "display_name": "Amal", "text": "/start" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let payloads = body_json(response).await;
        assert_eq!(payloads[0]["reply"]["kind"], "welcome_bonus");
        assert_eq!(payloads[1]["reply"]["kind"], "welcome");
    }

    #[tokio::test]
    async fn flooding_user_is_throttled() {
        let (mut state, _dir) = test_state().await;
        state.flood_guard = FloodGuard::from_config(&ServerConfig {
            flood_rate: 0.001,
            flood_burst: 1.0,
            ..ServerConfig::default()
        });
        let app = build_router(state);

        let event = serde_json::json!({ "user_id": 1, "text": "/help" });
        let first = app.clone().oneshot(json_request("POST", "/events", event.clone())).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let second = app.oneshot(json_request("POST", "/events", event)).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        // A thousandth of an event per second leaves a wait of about 1000s.
        let retry_after: u64 = second.headers()[axum::http::header::RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((990..=1000).contains(&retry_after), "{retry_after}");
    }

    #[tokio::test]
    async fn admin_requires_token_and_grant() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);

        let no_token = app
            .clone()
            .oneshot(Request::get("/admin/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(no_token.status(), StatusCode::FORBIDDEN);

        let not_admin = app
            .clone()
            .oneshot(admin_request("GET", "/admin/stats", 5, None))
            .await
            .unwrap();
        assert_eq!(not_admin.status(), StatusCode::FORBIDDEN);

        let ok = app
            .oneshot(admin_request("GET", "/admin/stats", 100, None))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(body_json(ok).await["total_users"], 0);
    }

    #[tokio::test]
    async fn product_and_order_flow() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);

        app.clone()
            .oneshot(json_request(
                "POST",
                "/events",
                serde_json::json!({ "user_id": 1, "text": "/start" }),
            ))
            .await
            .unwrap();

        let created = app
            .clone()
            .oneshot(admin_request(
                "POST",
                "/admin/products",
                100,
                Some(serde_json::json!({
                    "name": "Gift card",
                    "price": "25.00",
                    "stock": 1,
                    "category": "digital"
                })),
            ))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::OK);
        let product_id = body_json(created).await["id"].as_i64().unwrap();

        let order = serde_json::json!({ "user_id": 1, "product_id": product_id, "quantity": 1 });
        let placed = app
            .clone()
            .oneshot(json_request("POST", "/orders", order.clone()))
            .await
            .unwrap();
        assert_eq!(body_json(placed).await[0]["reply"]["kind"], "order_placed");

        let sold_out = app.oneshot(json_request("POST", "/orders", order)).await.unwrap();
        assert_eq!(body_json(sold_out).await[0]["reply"]["kind"], "out_of_stock");
    }

    #[tokio::test]
    async fn unknown_user_ban_is_not_found() {
        let (state, _dir) = test_state().await;
        let response = build_router(state)
            .oneshot(admin_request(
                "POST",
                "/admin/users/42/ban",
                100,
                Some(serde_json::json!({ "banned": true })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
