use ethers::types::Address;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::types::{ConnectorError, ConnectorResult, Lane};

/// Hands out lane indices per channel, starting at zero without gaps.
#[derive(Clone, Default)]
pub struct LaneAllocator {
    next_lanes: Arc<RwLock<HashMap<Address, Arc<Mutex<u64>>>>>,
}

impl LaneAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking lanes for a channel. Re-opening a known channel keeps
    /// its counter. Returns `true` when the channel was not tracked before.
    pub async fn open_channel(&self, channel_id: Address) -> bool {
        let mut next_lanes = self.next_lanes.write().await;
        if next_lanes.contains_key(&channel_id) {
            return false;
        }
        next_lanes.insert(channel_id, Arc::new(Mutex::new(0)));
        true
    }

    /// Stops tracking lanes for `channel_id`.
    pub async fn close_channel(&self, channel_id: Address) {
        self.next_lanes.write().await.remove(&channel_id);
    }

    pub async fn allocate_lane(&self, channel_id: Address) -> ConnectorResult<Lane> {
        let counter = self
            .next_lanes
            .read()
            .await
            .get(&channel_id)
            .cloned()
            .ok_or(ConnectorError::UnknownChannel(channel_id))?;

        let mut next = counter.lock().await;
        let index = *next;
        *next += 1;

        debug!(channel = ?channel_id, lane = index, "allocated lane");
        Ok(Lane { channel_id, index })
    }

    /// Number of lanes handed out so far for `channel_id`.
    pub async fn lane_count(&self, channel_id: Address) -> ConnectorResult<u64> {
        let counter = self
            .next_lanes
            .read()
            .await
            .get(&channel_id)
            .cloned()
            .ok_or(ConnectorError::UnknownChannel(channel_id))?;
        let count = *counter.lock().await;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_channel() {
        let lanes = LaneAllocator::new();
        let channel_id = Address::random();

        assert_eq!(
            lanes.allocate_lane(channel_id).await,
            Err(ConnectorError::UnknownChannel(channel_id))
        );
    }

    #[tokio::test]
    async fn test_lanes_increase_per_channel() {
        let lanes = LaneAllocator::new();
        let first = Address::random();
        let second = Address::random();
        assert!(lanes.open_channel(first).await);
        assert!(lanes.open_channel(second).await);

        assert_eq!(lanes.allocate_lane(first).await.unwrap().index, 0);
        assert_eq!(lanes.allocate_lane(first).await.unwrap().index, 1);
        assert_eq!(lanes.allocate_lane(second).await.unwrap().index, 0);

        assert!(!lanes.open_channel(first).await);
        assert_eq!(lanes.allocate_lane(first).await.unwrap().index, 2);
        assert_eq!(lanes.lane_count(first).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_closed_channel_is_unknown() {
        let lanes = LaneAllocator::new();
        let channel_id = Address::random();
        lanes.open_channel(channel_id).await;
        lanes.close_channel(channel_id).await;

        assert_eq!(
            lanes.allocate_lane(channel_id).await,
            Err(ConnectorError::UnknownChannel(channel_id))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_allocation_is_gapless() {
        let lanes = LaneAllocator::new();
        let channel_id = Address::random();
        lanes.open_channel(channel_id).await;

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let lanes = lanes.clone();
                tokio::spawn(async move { lanes.allocate_lane(channel_id).await.unwrap().index })
            })
            .collect();

        let mut indices = Vec::new();
        for handle in handles {
            indices.push(handle.await.unwrap());
        }
        indices.sort_unstable();

        assert_eq!(indices, (0..100).collect::<Vec<u64>>());
    }
}
