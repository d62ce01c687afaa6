use ethers::types::Address;
use serde::{Deserialize, Serialize};

use super::message::TokenAmount;

/// Economic state of a payment channel as seen by its payer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelState {
    pub payee: Address,
    pub funds_available: TokenAmount,
    pub redeemed: TokenAmount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEntry {
    pub payer: Address,
    pub payee: Address,
    pub channel_id: Address,
    pub funds_available: TokenAmount,
    pub redeemed: TokenAmount,
}

impl ChannelEntry {
    pub fn state(&self) -> ChannelState {
        ChannelState {
            payee: self.payee,
            funds_available: self.funds_available,
            redeemed: self.redeemed,
        }
    }
}

/// A payment stream inside one channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lane {
    pub channel_id: Address,
    pub index: u64,
}
