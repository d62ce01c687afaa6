use crate::{
    node::wallet::recover_signer,
    types::{Signature, SignatureType},
    utils::crypto::create_request_message,
};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use ethers::types::Address;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::sync::RwLock;
use tracing::debug;

/// The account that signed the current request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthenticatedAccount(pub Address);

/// Freshness window and the last request nonce accepted per account.
#[derive(Clone)]
pub struct RequestAuth {
    max_age_secs: u64,
    nonces: Arc<RwLock<HashMap<Address, u64>>>,
}

impl RequestAuth {
    pub fn new(max_age_secs: u64) -> Self {
        Self {
            max_age_secs,
            nonces: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

/// Authenticates a request by the secp256k1 signature in `X-Signature` over
/// method, path, `X-Timestamp`, `X-Nonce` and body, and exposes the signer as
/// [`AuthenticatedAccount`]. Each account's nonces must strictly increase.
pub async fn auth_middleware(
    auth: RequestAuth,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    // Check timestamp first
    let timestamp = request
        .headers()
        .get("X-Timestamp")
        .and_then(|t| t.to_str().ok())
        .and_then(|t| t.parse::<u64>().ok())
        .ok_or(StatusCode::BAD_REQUEST)?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .as_secs();

    if now.abs_diff(timestamp) > auth.max_age_secs {
        return Err(StatusCode::REQUEST_TIMEOUT);
    }

    let nonce = request
        .headers()
        .get("X-Nonce")
        .ok_or(StatusCode::UNAUTHORIZED)?
        .to_str()
        .ok()
        .and_then(|n| n.parse::<u64>().ok())
        .ok_or(StatusCode::BAD_REQUEST)?;

    let signature = request
        .headers()
        .get("X-Signature")
        .ok_or(StatusCode::UNAUTHORIZED)?
        .to_str()
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    let signature = hex::decode(signature.trim_start_matches("0x"))
        .map_err(|_| StatusCode::BAD_REQUEST)?;
    if signature.len() != 65 {
        return Err(StatusCode::BAD_REQUEST);
    }
    let signature = Signature {
        sig_type: SignatureType::Secp256k1,
        data: signature,
    };

    let (mut parts, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    let path = parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path(), |p| p.as_str());
    let message =
        create_request_message(parts.method.as_str(), path, timestamp, nonce, &body_bytes);
    let account = recover_signer(&signature, &message).map_err(|e| {
        debug!(error = %e, "rejected request signature");
        StatusCode::UNAUTHORIZED
    })?;

    {
        let mut nonces = auth.nonces.write().await;
        if let Some(last) = nonces.get(&account) {
            // Ensure new nonce is greater than existing nonce
            if nonce <= *last {
                debug!(?account, last = *last, nonce, "rejected replayed request");
                return Err(StatusCode::BAD_REQUEST);
            }
        }
        nonces.insert(account, nonce);
    }

    parts.extensions.insert(AuthenticatedAccount(account));
    let request = Request::from_parts(parts, Body::from(body_bytes));
    Ok(next.run(request).await)
}
