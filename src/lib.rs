pub mod config;
pub mod domain {
    pub mod account;
    pub mod charge;
    pub mod error;
    pub mod event;
    pub mod notification;
    pub mod refund;
}
pub mod gateways;
pub mod http {
    pub mod error;
    pub mod handlers {
        pub mod charges;
        pub mod notifications;
        pub mod ops;
        pub mod refunds;
    }
    pub mod middleware {
        pub mod admin_auth;
    }
}
pub mod service {
    pub mod capture_engine;
    pub mod charge_service;
    pub mod expiry_sweeper;
    pub mod notification_service;
    pub mod reference_matcher;
    pub mod refund_engine;
    pub mod refund_service;
    pub mod transitioner;
}
pub mod store;
pub mod transitions;

#[derive(Clone)]
pub struct AppState {
    pub charge_service: service::charge_service::ChargeService,
    pub refund_service: service::refund_service::RefundService,
    pub notification_service: service::notification_service::NotificationService,
    pub expiry_sweeper: service::expiry_sweeper::ExpirySweeper,
    pub pool: sqlx::PgPool,
}
