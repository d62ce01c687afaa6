//! Capabilities the connector needs from the surrounding node: signing,
//! nonce sequencing, message submission, chain watching and balance queries.

pub mod nonce;
pub mod wallet;
pub mod watcher;

use async_trait::async_trait;
use ethers::types::{Address, H256};

use crate::types::{
    Block, Confirmation, ConnectorResult, MessageReceipt, Signature, SignedMessage, TokenAmount,
};

pub use nonce::MessageNonces;
pub use wallet::WalletSigner;
pub use watcher::ChainWatcher;

#[async_trait]
pub trait Signer: Send + Sync + 'static {
    /// Fails with `SignError` when no key is held for `account`.
    async fn sign_bytes(&self, data: &[u8], account: Address) -> ConnectorResult<Signature>;
}

#[async_trait]
pub trait NonceSequencer: Send + Sync + 'static {
    /// Never returns the same value twice for one account.
    async fn next_nonce(&self, account: Address) -> ConnectorResult<u64>;
}

#[async_trait]
pub trait MessageSubmitter: Send + Sync + 'static {
    /// Posts the message and returns its content identifier. Inclusion is
    /// observed separately through a [`ConfirmationWaiter`].
    async fn send(&self, message: SignedMessage) -> ConnectorResult<H256>;
}

#[async_trait]
pub trait ConfirmationWaiter: Send + Sync + 'static {
    /// Resolves once the message is included and executed.
    async fn wait(&self, message_id: H256) -> ConnectorResult<Confirmation>;
}

#[async_trait]
pub trait BalanceOracle: Send + Sync + 'static {
    async fn balance(&self, account: Address) -> ConnectorResult<TokenAmount>;
}

/// Waits for `message_id` and hands the result to `continuation`.
///
/// The continuation runs exactly once when the wait succeeds and never when it
/// fails.
pub async fn await_confirmation<T, F>(
    waiter: &dyn ConfirmationWaiter,
    message_id: H256,
    continuation: F,
) -> ConnectorResult<T>
where
    F: FnOnce(&Block, &SignedMessage, &MessageReceipt) -> ConnectorResult<T>,
{
    let confirmation = waiter.wait(message_id).await?;
    continuation(
        &confirmation.block,
        &confirmation.message,
        &confirmation.receipt,
    )
}
