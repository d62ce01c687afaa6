use async_trait::async_trait;
use ethers::types::Address;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::NonceSequencer;
use crate::types::{ConnectorError, ConnectorResult};

/// Per-account message sequence numbers.
///
/// Each account has its own counter behind its own lock, so accounts never
/// contend with each other while calls for one account are serialized.
#[derive(Clone, Default)]
pub struct MessageNonces {
    counters: Arc<RwLock<HashMap<Address, Arc<Mutex<u64>>>>>,
}

impl MessageNonces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the next nonce handed out for `account`, e.g. after reading the
    /// actor's sequence number from chain.
    pub async fn reset(&self, account: Address, next: u64) {
        let counter = self.counter(account).await;
        *counter.lock().await = next;
    }

    async fn counter(&self, account: Address) -> Arc<Mutex<u64>> {
        if let Some(counter) = self.counters.read().await.get(&account) {
            return counter.clone();
        }
        self.counters
            .write()
            .await
            .entry(account)
            .or_insert_with(|| Arc::new(Mutex::new(0)))
            .clone()
    }
}

#[async_trait]
impl NonceSequencer for MessageNonces {
    async fn next_nonce(&self, account: Address) -> ConnectorResult<u64> {
        let counter = self.counter(account).await;
        let mut next = counter.lock().await;
        let nonce = *next;
        *next = nonce.checked_add(1).ok_or_else(|| {
            ConnectorError::NonceError(format!("nonce space exhausted for {account:?}"))
        })?;
        debug!(?account, nonce, "issued nonce");
        Ok(nonce)
    }
}
