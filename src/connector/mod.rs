//! The payment channel connector a retrieval client and provider talk to.

pub mod creator;

use ethers::types::{Address, U256};
use std::{collections::HashMap, future::Future, sync::Arc};
use tokio::sync::Mutex;

use crate::{
    config::ConnectorConfig,
    node::{BalanceOracle, ConfirmationWaiter, MessageSubmitter, NonceSequencer, Signer},
    state::{ChannelRegistry, LaneAllocator},
    types::{ChannelEntry, ChannelState, ConnectorError, ConnectorResult, Lane, TokenAmount},
};

pub use creator::ChannelCreator;

/// The node capabilities the connector is built on.
#[derive(Clone)]
pub struct LedgerApi {
    pub signer: Arc<dyn Signer>,
    pub nonces: Arc<dyn NonceSequencer>,
    pub submitter: Arc<dyn MessageSubmitter>,
    pub waiter: Arc<dyn ConfirmationWaiter>,
    pub balances: Arc<dyn BalanceOracle>,
}

#[derive(Clone)]
pub struct PaymentChannelConnector {
    api: LedgerApi,
    registry: ChannelRegistry,
    lanes: LaneAllocator,
    creator: ChannelCreator,
    creation_locks: Arc<Mutex<HashMap<(Address, Address), Arc<Mutex<()>>>>>,
    config: ConnectorConfig,
}

impl PaymentChannelConnector {
    pub fn new(api: LedgerApi, config: ConnectorConfig) -> Self {
        let registry = ChannelRegistry::new();
        let lanes = LaneAllocator::new();
        let creator = ChannelCreator::new(
            api.clone(),
            registry.clone(),
            lanes.clone(),
            config.clone(),
        );
        Self {
            api,
            registry,
            lanes,
            creator,
            creation_locks: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn lanes(&self) -> &LaneAllocator {
        &self.lanes
    }

    pub async fn lookup_channel(&self, payer: Address, payee: Address) -> Option<Address> {
        self.registry.lookup_channel(payer, payee).await
    }

    pub async fn channel_state(
        &self,
        channel_id: Address,
    ) -> ConnectorResult<(Address, ChannelState)> {
        self.registry.channel_state(channel_id).await
    }

    pub async fn allocate_lane(&self, channel_id: Address) -> ConnectorResult<Lane> {
        self.lanes.allocate_lane(channel_id).await
    }

    pub async fn balance(&self, account: Address) -> ConnectorResult<TokenAmount> {
        self.api.balances.balance(account).await
    }

    pub async fn record_redeemed(
        &self,
        channel_id: Address,
        amount: U256,
    ) -> ConnectorResult<ChannelState> {
        self.registry.record_redeemed(channel_id, amount).await
    }

    /// Opens a new channel from `payer` to `payee` funded with `amount`.
    pub async fn create_channel(
        &self,
        payer: Address,
        payee: Address,
        amount: TokenAmount,
    ) -> ConnectorResult<ChannelEntry> {
        self.create_channel_until(payer, payee, amount, std::future::pending())
            .await
    }

    pub async fn create_channel_until<C>(
        &self,
        payer: Address,
        payee: Address,
        amount: TokenAmount,
        cancel: C,
    ) -> ConnectorResult<ChannelEntry>
    where
        C: Future<Output = ()> + Send,
    {
        self.with_creation_lock(payer, payee, amount, false, cancel).await
    }

    /// Returns the channel from `payer` to `payee`, creating it with `amount`
    /// when there is none. Concurrent callers for the same pair share a single
    /// creation.
    pub async fn get_or_create_channel(
        &self,
        payer: Address,
        payee: Address,
        amount: TokenAmount,
    ) -> ConnectorResult<Address> {
        let entry = self
            .with_creation_lock(payer, payee, amount, true, std::future::pending())
            .await?;
        Ok(entry.channel_id)
    }

    async fn with_creation_lock<C>(
        &self,
        payer: Address,
        payee: Address,
        amount: TokenAmount,
        reuse_existing: bool,
        cancel: C,
    ) -> ConnectorResult<ChannelEntry>
    where
        C: Future<Output = ()> + Send,
    {
        let key = (payer, payee);
        let lock = self
            .creation_locks
            .lock()
            .await
            .entry(key)
            .or_default()
            .clone();

        let result = self
            .create_locked(&lock, payer, payee, amount, reuse_existing, cancel)
            .await;

        let mut locks = self.creation_locks.lock().await;
        // Only the map and `lock` remain when no other caller is queued on this pair.
        if Arc::strong_count(&lock) == 2
            && locks.get(&key).is_some_and(|held| Arc::ptr_eq(held, &lock))
        {
            locks.remove(&key);
        }
        result
    }

    async fn create_locked<C>(
        &self,
        lock: &Mutex<()>,
        payer: Address,
        payee: Address,
        amount: TokenAmount,
        reuse_existing: bool,
        cancel: C,
    ) -> ConnectorResult<ChannelEntry>
    where
        C: Future<Output = ()> + Send,
    {
        tokio::pin!(cancel);
        let _guard = tokio::select! {
            guard = lock.lock() => guard,
            _ = &mut cancel => return Err(ConnectorError::Cancelled),
        };

        if let Some(channel_id) = self.registry.lookup_channel(payer, payee).await {
            if reuse_existing {
                return self.registry.entry(channel_id).await;
            }
            return Err(ConnectorError::ChannelExists { payer, payee });
        }
        self.creator
            .create_channel_until(payer, payee, amount, cancel)
            .await
    }

    #[cfg(test)]
    async fn creation_lock_count(&self) -> usize {
        self.creation_locks.lock().await.len()
    }
}
