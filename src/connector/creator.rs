use ethers::types::{Address, U256};
use std::future::Future;
use tracing::{info, warn};

use super::LedgerApi;
use crate::{
    config::ConnectorConfig,
    node::await_confirmation,
    state::{ChannelRegistry, LaneAllocator},
    types::{
        ChannelEntry, ConnectorError, ConnectorResult, MessageReceipt, SignedMessage,
        TokenAmount, UnsignedMessage, CREATE_PAYMENT_CHANNEL_METHOD, UNDEF_ADDRESS,
    },
    utils::crypto::{decode_address, encode_unsigned_message},
};

/// Turns a funding intent into a registered payment channel.
#[derive(Clone)]
pub struct ChannelCreator {
    api: LedgerApi,
    registry: ChannelRegistry,
    lanes: LaneAllocator,
    config: ConnectorConfig,
}

impl ChannelCreator {
    pub fn new(
        api: LedgerApi,
        registry: ChannelRegistry,
        lanes: LaneAllocator,
        config: ConnectorConfig,
    ) -> Self {
        Self {
            api,
            registry,
            lanes,
            config,
        }
    }

    pub async fn create_channel(
        &self,
        payer: Address,
        payee: Address,
        amount: TokenAmount,
    ) -> ConnectorResult<ChannelEntry> {
        self.create_channel_until(payer, payee, amount, std::future::pending())
            .await
    }

    /// Creates a channel, giving up on the confirmation once `cancel`
    /// resolves. A message that was already submitted stays submitted.
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
        if payer == UNDEF_ADDRESS || payee == UNDEF_ADDRESS {
            return Err(ConnectorError::UndefinedAddress);
        }

        let message = self.build_message(payer, payee, amount).await?;
        let signed = self.sign_message(message).await?;
        let message_id = self.api.submitter.send(signed).await?;
        info!(?payer, ?payee, %amount, ?message_id, "submitted create channel message");

        let entry = tokio::select! {
            result = await_confirmation(
                self.api.waiter.as_ref(),
                message_id,
                |_, message, receipt| entry_from_receipt(payer, payee, amount, message, receipt),
            ) => result,
            _ = cancel => {
                warn!(?message_id, "abandoned wait for channel creation");
                return Err(ConnectorError::Cancelled);
            }
        };

        let entry = entry.map_err(|e| {
            warn!(?payer, ?payee, ?message_id, error = %e, "channel creation failed");
            e
        })?;

        // Lanes must be open before the channel becomes visible to lookups.
        let opened = self.lanes.open_channel(entry.channel_id).await;
        if let Err(e) = self.registry.register(entry.clone()).await {
            if opened {
                self.lanes.close_channel(entry.channel_id).await;
            }
            return Err(e);
        }
        Ok(entry)
    }

    async fn build_message(
        &self,
        payer: Address,
        payee: Address,
        amount: TokenAmount,
    ) -> ConnectorResult<UnsignedMessage> {
        let sequence_number = self.api.nonces.next_nonce(payer).await?;
        Ok(UnsignedMessage {
            to: payee,
            from: payer,
            sequence_number,
            value: amount,
            method: CREATE_PAYMENT_CHANNEL_METHOD,
            params: Vec::new(),
            gas_price: self.config.gas_price,
            gas_limit: self.config.gas_limit,
        })
    }

    async fn sign_message(&self, message: UnsignedMessage) -> ConnectorResult<SignedMessage> {
        let bytes = encode_unsigned_message(&message);
        let signature = self.api.signer.sign_bytes(&bytes, message.from).await?;
        Ok(SignedMessage { message, signature })
    }
}

fn entry_from_receipt(
    payer: Address,
    payee: Address,
    amount: TokenAmount,
    message: &SignedMessage,
    receipt: &MessageReceipt,
) -> ConnectorResult<ChannelEntry> {
    let sent = &message.message;
    if sent.from != payer || sent.method != CREATE_PAYMENT_CHANNEL_METHOD {
        return Err(ConnectorError::ChannelCreationFailed(format!(
            "confirmation is for method {} from {:?}",
            sent.method, sent.from
        )));
    }

    if !receipt.is_success() {
        return Err(ConnectorError::ChannelCreationFailed(format!(
            "exit code {}",
            receipt.exit_code
        )));
    }

    let channel_id = decode_address(&receipt.return_value).ok_or_else(|| {
        ConnectorError::ChannelCreationFailed(format!(
            "malformed channel address 0x{}",
            hex::encode(&receipt.return_value)
        ))
    })?;
    if channel_id == UNDEF_ADDRESS {
        return Err(ConnectorError::ChannelCreationFailed("undefined channel address".into()));
    }

    Ok(ChannelEntry {
        payer,
        payee,
        channel_id,
        funds_available: amount,
        redeemed: U256::zero(),
    })
}
