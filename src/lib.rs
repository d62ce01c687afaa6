//! Payment channel connector for retrieval deals.
//!
//! Finds or opens a payment channel between a payer and a payee on the
//! ledger, hands out lanes inside it for concurrent deals, and reports channel
//! funds and account balances. Ledger access goes through the capabilities in
//! [`node`]; [`create_connector_router`] exposes the connector over HTTP.

pub mod config;
pub mod connector;
pub mod handlers;
pub mod middleware;
pub mod node;
pub mod state;
pub mod testing;
pub mod types;
pub mod utils;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    handlers::channel::{
        allocate_lane, balance, channel_state, get_or_create_channel, lookup_channel,
    },
    middleware::{auth_middleware, RequestAuth},
};

pub use config::ConnectorConfig;
pub use connector::{ChannelCreator, LedgerApi, PaymentChannelConnector};
pub use types::{ConnectorError, ConnectorResult};

pub fn create_connector_router(connector: PaymentChannelConnector) -> Router {
    let auth = RequestAuth::new(connector.config().request_max_age_secs);

    let signed = Router::new()
        .route("/channels", post(get_or_create_channel))
        .route("/channels/:channel_id/lanes", post(allocate_lane))
        .route_layer(axum::middleware::from_fn(move |req, next| {
            auth_middleware(auth.clone(), req, next)
        }));

    Router::new()
        .route("/channels/:channel_id", get(channel_state))
        .route("/payers/:payer/channels/:payee", get(lookup_channel))
        .route("/balances/:account", get(balance))
        .merge(signed)
        .layer(TraceLayer::new_for_http())
        .with_state(connector)
}

/// Serves the connector API on the configured listen address.
pub async fn serve(connector: PaymentChannelConnector) -> std::io::Result<()> {
    let addr = connector.config().listen_addr;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "payment channel connector listening");
    axum::serve(listener, create_connector_router(connector)).await
}
