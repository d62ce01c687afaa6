use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    connector::PaymentChannelConnector,
    middleware::AuthenticatedAccount,
    types::{ChannelState, ConnectorError, Lane, TokenAmount},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct LookupResponse {
    pub channel_id: Option<Address>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelResponse {
    pub channel_id: Address,
    pub payer: Address,
    pub state: ChannelState,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateChannelRequest {
    pub payee: Address,
    pub amount: TokenAmount,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub account: Address,
    pub balance: TokenAmount,
}

fn reject(error: ConnectorError) -> StatusCode {
    warn!(error = %error, "request failed");
    StatusCode::from(error)
}

pub async fn lookup_channel(
    State(connector): State<PaymentChannelConnector>,
    Path((payer, payee)): Path<(Address, Address)>,
) -> Json<LookupResponse> {
    Json(LookupResponse {
        channel_id: connector.lookup_channel(payer, payee).await,
    })
}

pub async fn channel_state(
    State(connector): State<PaymentChannelConnector>,
    Path(channel_id): Path<Address>,
) -> Result<Json<ChannelResponse>, StatusCode> {
    let (payer, state) = connector.channel_state(channel_id).await.map_err(reject)?;
    Ok(Json(ChannelResponse {
        channel_id,
        payer,
        state,
    }))
}

/// Returns the caller's channel to `payee`, creating it if needed.
pub async fn get_or_create_channel(
    State(connector): State<PaymentChannelConnector>,
    Extension(AuthenticatedAccount(payer)): Extension<AuthenticatedAccount>,
    Json(request): Json<CreateChannelRequest>,
) -> Result<Json<ChannelResponse>, StatusCode> {
    let channel_id = connector
        .get_or_create_channel(payer, request.payee, request.amount)
        .await
        .map_err(reject)?;
    let (payer, state) = connector.channel_state(channel_id).await.map_err(reject)?;
    Ok(Json(ChannelResponse {
        channel_id,
        payer,
        state,
    }))
}

/// Only the channel's payer may open lanes on it.
pub async fn allocate_lane(
    State(connector): State<PaymentChannelConnector>,
    Extension(AuthenticatedAccount(caller)): Extension<AuthenticatedAccount>,
    Path(channel_id): Path<Address>,
) -> Result<Json<Lane>, StatusCode> {
    let (payer, _) = connector.channel_state(channel_id).await.map_err(reject)?;
    if payer != caller {
        return Err(reject(ConnectorError::Unauthorized));
    }
    let lane = connector.allocate_lane(channel_id).await.map_err(reject)?;
    Ok(Json(lane))
}

pub async fn balance(
    State(connector): State<PaymentChannelConnector>,
    Path(account): Path<Address>,
) -> Result<Json<BalanceResponse>, StatusCode> {
    let balance = connector.balance(account).await.map_err(reject)?;
    Ok(Json(BalanceResponse { account, balance }))
}
