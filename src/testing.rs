//! A scriptable in-memory ledger for exercising the connector without a chain.

use async_trait::async_trait;
use ethers::types::{Address, H256};
use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};
use tokio::sync::Mutex;

use crate::{
    node::{BalanceOracle, ChainWatcher, MessageSubmitter},
    types::{
        Block, Confirmation, ConnectorError, ConnectorResult, MessageReceipt, SignedMessage,
        TokenAmount, EXIT_CODE_OK,
    },
    utils::crypto::{encode_address, message_cid},
};

struct LedgerScript {
    auto_confirm: bool,
    submit_error: Option<String>,
    wait_error: Option<String>,
    receipts: VecDeque<MessageReceipt>,
    balances: HashMap<Address, TokenAmount>,
    sent: Vec<SignedMessage>,
    unconfirmed: HashMap<H256, SignedMessage>,
    height: u64,
}

/// Accepts every message and, unless told otherwise, confirms it right away
/// with the next scripted receipt. Without a scripted receipt a message
/// succeeds and returns a fresh random channel address.
#[derive(Clone)]
pub struct FakeLedger {
    script: Arc<Mutex<LedgerScript>>,
    watcher: ChainWatcher,
}

impl FakeLedger {
    pub fn new(confirmation_timeout: Duration) -> Self {
        Self {
            script: Arc::new(Mutex::new(LedgerScript {
                auto_confirm: true,
                submit_error: None,
                wait_error: None,
                receipts: VecDeque::new(),
                balances: HashMap::new(),
                sent: Vec::new(),
                unconfirmed: HashMap::new(),
                height: 0,
            })),
            watcher: ChainWatcher::new(confirmation_timeout),
        }
    }

    /// The watcher this ledger reports confirmations to.
    pub fn watcher(&self) -> ChainWatcher {
        self.watcher.clone()
    }

    pub async fn set_auto_confirm(&self, auto_confirm: bool) {
        self.script.lock().await.auto_confirm = auto_confirm;
    }

    pub async fn set_submit_error(&self, error: Option<String>) {
        self.script.lock().await.submit_error = error;
    }

    pub async fn set_wait_error(&self, error: Option<String>) {
        self.script.lock().await.wait_error = error;
    }

    pub async fn set_balance(&self, account: Address, balance: TokenAmount) {
        self.script.lock().await.balances.insert(account, balance);
    }

    pub async fn push_receipt(&self, receipt: MessageReceipt) {
        self.script.lock().await.receipts.push_back(receipt);
    }

    /// Makes the next create channel message return `channel_id`.
    pub async fn stub_channel_created(&self, channel_id: Address) {
        self.push_receipt(success_receipt(channel_id)).await;
    }

    pub async fn sent_messages(&self) -> Vec<SignedMessage> {
        self.script.lock().await.sent.clone()
    }

    /// Messages accepted but not yet confirmed.
    pub async fn unconfirmed(&self) -> Vec<H256> {
        self.script.lock().await.unconfirmed.keys().copied().collect()
    }

    /// Includes a held message in a new block with `receipt`.
    pub async fn confirm(&self, message_id: H256, receipt: MessageReceipt) {
        let confirmation = {
            let mut script = self.script.lock().await;
            let Some(message) = script.unconfirmed.remove(&message_id) else {
                return;
            };
            script.height += 1;
            Confirmation {
                block: Block {
                    cid: H256::random(),
                    height: script.height,
                },
                message,
                receipt,
            }
        };
        self.watcher.deliver(message_id, confirmation).await;
    }
}

#[async_trait]
impl MessageSubmitter for FakeLedger {
    async fn send(&self, message: SignedMessage) -> ConnectorResult<H256> {
        let message_id = message_cid(&message);
        let (receipt, wait_error) = {
            let mut script = self.script.lock().await;
            if let Some(error) = script.submit_error.clone() {
                return Err(ConnectorError::SubmissionFailed(error));
            }
            script.sent.push(message.clone());
            script.unconfirmed.insert(message_id, message);
            if let Some(error) = script.wait_error.clone() {
                script.unconfirmed.remove(&message_id);
                (None, Some(error))
            } else if script.auto_confirm {
                let receipt = script
                    .receipts
                    .pop_front()
                    .unwrap_or_else(|| success_receipt(Address::random()));
                (Some(receipt), None)
            } else {
                (None, None)
            }
        };

        if let Some(error) = wait_error {
            self.watcher.fail(message_id, error).await;
        } else if let Some(receipt) = receipt {
            self.confirm(message_id, receipt).await;
        }
        Ok(message_id)
    }
}

#[async_trait]
impl BalanceOracle for FakeLedger {
    async fn balance(&self, account: Address) -> ConnectorResult<TokenAmount> {
        self.script
            .lock()
            .await
            .balances
            .get(&account)
            .copied()
            .ok_or(ConnectorError::BalanceUnavailable(account))
    }
}

fn success_receipt(channel_id: Address) -> MessageReceipt {
    MessageReceipt {
        exit_code: EXIT_CODE_OK,
        return_value: encode_address(channel_id),
        gas_used: 0,
    }
}
