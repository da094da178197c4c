use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use payments_connector::config::AppConfig;
use payments_connector::gateways::GatewayRegistry;
use payments_connector::service::capture_engine::CaptureEngine;
use payments_connector::service::charge_service::ChargeService;
use payments_connector::service::expiry_sweeper::ExpirySweeper;
use payments_connector::service::notification_service::NotificationService;
use payments_connector::service::refund_engine::RefundEngine;
use payments_connector::service::refund_service::RefundService;
use payments_connector::store::postgres::PgStore;
use payments_connector::AppState;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let store = Arc::new(PgStore { pool: pool.clone() });
    let gateways = GatewayRegistry::from_config(&cfg);

    let charge_service = ChargeService {
        store: store.clone(),
        gateways: gateways.clone(),
    };
    let refund_service = RefundService { store: store.clone() };
    let notification_service = NotificationService { store: store.clone() };
    let expiry_sweeper = ExpirySweeper {
        store: store.clone(),
        gateways: gateways.clone(),
        sweep_interval: std::time::Duration::from_millis(cfg.expiry_sweep_interval_ms),
        expiry_window: chrono::Duration::minutes(cfg.charge_expiry_minutes),
        batch_size: cfg.expiry_batch_size,
    };

    let capture_engine = CaptureEngine {
        store: store.clone(),
        gateways: gateways.clone(),
        poll_interval: std::time::Duration::from_millis(cfg.capture_poll_interval_ms),
        batch_size: cfg.capture_batch_size,
        worker_count: cfg.capture_worker_count,
        max_retries: cfg.capture_max_retries,
        retry_delay: chrono::Duration::seconds(cfg.capture_retry_delay_secs),
    };
    tokio::spawn(capture_engine.run());

    let refund_engine = RefundEngine {
        store: store.clone(),
        gateways: gateways.clone(),
        poll_interval: std::time::Duration::from_millis(cfg.refund_poll_interval_ms),
        batch_size: cfg.refund_batch_size,
    };
    tokio::spawn(refund_engine.run());

    tokio::spawn(expiry_sweeper.clone().run());

    let state = AppState {
        charge_service,
        refund_service,
        notification_service,
        expiry_sweeper,
        pool,
    };

    let admin_routes = Router::new()
        .route(
            "/v1/tasks/expire-charges",
            post(payments_connector::http::handlers::ops::expire_charges),
        )
        .layer(from_fn_with_state(
            cfg.internal_api_key.clone(),
            payments_connector::http::middleware::admin_auth::require_internal_api_key,
        ));

    let app = Router::new()
        .route(
            "/v1/api/accounts/:account_id/charges",
            post(payments_connector::http::handlers::charges::create_charge),
        )
        .route(
            "/v1/api/accounts/:account_id/charges/:charge_id",
            get(payments_connector::http::handlers::charges::get_charge),
        )
        .route(
            "/v1/api/accounts/:account_id/charges/:charge_id/events",
            get(payments_connector::http::handlers::charges::get_charge_events),
        )
        .route(
            "/v1/api/accounts/:account_id/charges/:charge_id/cancel",
            post(payments_connector::http::handlers::charges::cancel_charge),
        )
        .route(
            "/v1/api/accounts/:account_id/charges/:charge_id/refunds",
            post(payments_connector::http::handlers::refunds::create_refund)
                .get(payments_connector::http::handlers::refunds::list_refunds),
        )
        .route(
            "/v1/api/accounts/:account_id/charges/:charge_id/refunds/:refund_id",
            get(payments_connector::http::handlers::refunds::get_refund),
        )
        .route(
            "/v1/api/notifications/:provider",
            post(payments_connector::http::handlers::notifications::receive),
        )
        .route(
            "/v1/frontend/charges/:charge_id/status",
            post(payments_connector::http::handlers::charges::start_card_entry),
        )
        .route(
            "/v1/frontend/charges/:charge_id/cards",
            post(payments_connector::http::handlers::charges::authorise),
        )
        .route(
            "/v1/frontend/charges/:charge_id/3ds",
            post(payments_connector::http::handlers::charges::authorise_3ds),
        )
        .route(
            "/v1/frontend/charges/:charge_id/capture",
            post(payments_connector::http::handlers::charges::approve_capture),
        )
        .route(
            "/v1/frontend/charges/:charge_id/cancel",
            post(payments_connector::http::handlers::charges::user_cancel),
        )
        .route("/health", get(payments_connector::http::handlers::ops::liveness))
        .route(
            "/ops/readiness",
            get(payments_connector::http::handlers::ops::readiness),
        )
        .merge(admin_routes)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
