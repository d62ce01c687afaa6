use async_trait::async_trait;
use ethers::types::H256;
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::ConfirmationWaiter;
use crate::types::{Confirmation, ConnectorError, ConnectorResult};

type Outcome = ConnectorResult<Confirmation>;

/// Outcomes kept for waiters that have not subscribed yet.
const MAX_SETTLED: usize = 1024;

#[derive(Default)]
struct WatchState {
    waiting: HashMap<H256, Vec<oneshot::Sender<Outcome>>>,
    settled: HashMap<H256, Outcome>,
    settled_order: VecDeque<H256>,
}

fn lock(state: &Mutex<WatchState>) -> MutexGuard<'_, WatchState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fans chain observations out to the callers waiting on them.
///
/// The chain follower reports each included message through [`deliver`] (or a
/// broken watch through [`fail`]). Every waiter gets exactly one outcome over
/// its own one-shot channel. An outcome nobody is waiting for yet is kept
/// until the first waiter for it arrives, up to [`MAX_SETTLED`] outcomes.
///
/// [`deliver`]: ChainWatcher::deliver
/// [`fail`]: ChainWatcher::fail
#[derive(Clone)]
pub struct ChainWatcher {
    state: Arc<Mutex<WatchState>>,
    timeout: Duration,
}

/// A registered waiter. Dropping it, after delivery, timeout or
/// cancellation, removes its sender from the watcher.
struct PendingWait {
    state: Arc<Mutex<WatchState>>,
    message_id: H256,
    receiver: oneshot::Receiver<Outcome>,
}

impl Drop for PendingWait {
    fn drop(&mut self) {
        self.receiver.close();
        let mut state = lock(&self.state);
        if let Some(senders) = state.waiting.get_mut(&self.message_id) {
            senders.retain(|sender| !sender.is_closed());
            if senders.is_empty() {
                state.waiting.remove(&self.message_id);
            }
        }
    }
}

impl ChainWatcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(WatchState::default())),
            timeout,
        }
    }

    fn register(&self, message_id: H256) -> PendingWait {
        let (tx, receiver) = oneshot::channel();
        let mut state = lock(&self.state);
        if let Some(outcome) = state.settled.remove(&message_id) {
            state.settled_order.retain(|id| *id != message_id);
            let _ = tx.send(outcome);
        } else {
            state.waiting.entry(message_id).or_default().push(tx);
        }
        PendingWait {
            state: self.state.clone(),
            message_id,
            receiver,
        }
    }

    pub async fn deliver(&self, message_id: H256, confirmation: Confirmation) {
        debug!(
            ?message_id,
            height = confirmation.block.height,
            exit_code = confirmation.receipt.exit_code,
            "message confirmed"
        );
        self.settle(message_id, Ok(confirmation));
    }

    pub async fn fail(&self, message_id: H256, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(?message_id, %reason, "watch failed");
        self.settle(message_id, Err(ConnectorError::WaitFailed(reason)));
    }

    /// Number of callers currently waiting.
    pub async fn pending(&self) -> usize {
        lock(&self.state).waiting.values().map(Vec::len).sum()
    }

    /// Number of outcomes held for waiters that have not arrived.
    pub async fn settled(&self) -> usize {
        lock(&self.state).settled.len()
    }

    fn settle(&self, message_id: H256, outcome: Outcome) {
        let mut state = lock(&self.state);
        let mut delivered = false;
        for waiter in state.waiting.remove(&message_id).unwrap_or_default() {
            delivered |= waiter.send(outcome.clone()).is_ok();
        }
        if delivered {
            return;
        }

        if state.settled.insert(message_id, outcome).is_none() {
            state.settled_order.push_back(message_id);
        }
        while state.settled_order.len() > MAX_SETTLED {
            if let Some(oldest) = state.settled_order.pop_front() {
                state.settled.remove(&oldest);
            }
        }
    }
}

#[async_trait]
impl ConfirmationWaiter for ChainWatcher {
    async fn wait(&self, message_id: H256) -> ConnectorResult<Confirmation> {
        let mut pending = self.register(message_id);
        match tokio::time::timeout(self.timeout, &mut pending.receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(ConnectorError::WaitFailed("watcher closed".into())),
            Err(_) => Err(ConnectorError::WaitFailed(format!(
                "no confirmation for {message_id:?} after {:?}",
                self.timeout
            ))),
        }
    }
}
