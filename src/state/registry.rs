use ethers::types::{Address, U256};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::info;

use crate::types::{ChannelEntry, ChannelState, ConnectorError, ConnectorResult};

type ChannelKey = (Address, Address);

#[derive(Default)]
struct Channels {
    by_pair: HashMap<ChannelKey, ChannelEntry>,
    by_id: HashMap<Address, ChannelKey>,
}

/// Payment channels this node has opened, keyed by `(payer, payee)` and
/// indexed by channel address.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    channels: Arc<RwLock<Channels>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absence is a normal answer, not an error.
    pub async fn lookup_channel(&self, payer: Address, payee: Address) -> Option<Address> {
        self.channels
            .read()
            .await
            .by_pair
            .get(&(payer, payee))
            .map(|entry| entry.channel_id)
    }

    pub async fn channel_state(
        &self,
        channel_id: Address,
    ) -> ConnectorResult<(Address, ChannelState)> {
        let channels = self.channels.read().await;
        channels
            .by_id
            .get(&channel_id)
            .and_then(|key| channels.by_pair.get(key))
            .map(|entry| (entry.payer, entry.state()))
            .ok_or(ConnectorError::ChannelNotFound(channel_id))
    }

    pub async fn entry(&self, channel_id: Address) -> ConnectorResult<ChannelEntry> {
        let channels = self.channels.read().await;
        channels
            .by_id
            .get(&channel_id)
            .and_then(|key| channels.by_pair.get(key))
            .cloned()
            .ok_or(ConnectorError::ChannelNotFound(channel_id))
    }

    pub async fn register(&self, entry: ChannelEntry) -> ConnectorResult<()> {
        let key = (entry.payer, entry.payee);
        let mut channels = self.channels.write().await;

        if channels.by_pair.contains_key(&key) || channels.by_id.contains_key(&entry.channel_id) {
            return Err(ConnectorError::ChannelExists {
                payer: entry.payer,
                payee: entry.payee,
            });
        }

        info!(
            payer = ?entry.payer,
            payee = ?entry.payee,
            channel = ?entry.channel_id,
            funds = %entry.funds_available,
            "registered payment channel"
        );
        channels.by_id.insert(entry.channel_id, key);
        channels.by_pair.insert(key, entry);
        Ok(())
    }

    /// Adds `amount` to what has been redeemed from the channel, refusing to
    /// redeem more than the channel holds.
    pub async fn record_redeemed(
        &self,
        channel_id: Address,
        amount: U256,
    ) -> ConnectorResult<ChannelState> {
        let mut channels = self.channels.write().await;
        let key = *channels
            .by_id
            .get(&channel_id)
            .ok_or(ConnectorError::ChannelNotFound(channel_id))?;
        let entry = channels
            .by_pair
            .get_mut(&key)
            .ok_or(ConnectorError::ChannelNotFound(channel_id))?;

        let redeemed = entry
            .redeemed
            .checked_add(amount)
            .filter(|total| *total <= entry.funds_available)
            .ok_or_else(|| ConnectorError::InsufficientFunds {
                available: (entry.funds_available - entry.redeemed).to_string(),
                requested: amount.to_string(),
            })?;

        entry.redeemed = redeemed;
        Ok(entry.state())
    }
}
