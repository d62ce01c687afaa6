use ethers::types::{Address, H160, H256, U256};
use serde::{Deserialize, Serialize};

pub type TokenAmount = U256;
pub type MethodId = u64;
pub type GasUnits = u64;

/// The all-zero address. Signals "no address" wherever an address is optional.
pub const UNDEF_ADDRESS: Address = H160([0u8; 20]);

/// Method number of the payment channel constructor.
pub const CREATE_PAYMENT_CHANNEL_METHOD: MethodId = 1;

/// Exit code of a message that executed successfully.
pub const EXIT_CODE_OK: i32 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureType {
    Secp256k1,
    Bls,
}

impl SignatureType {
    pub fn as_byte(self) -> u8 {
        match self {
            SignatureType::Secp256k1 => 1,
            SignatureType::Bls => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub sig_type: SignatureType,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedMessage {
    pub to: Address,
    pub from: Address,
    pub sequence_number: u64,
    pub value: TokenAmount,
    pub method: MethodId,
    pub params: Vec<u8>,
    pub gas_price: TokenAmount,
    pub gas_limit: GasUnits,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMessage {
    pub message: UnsignedMessage,
    pub signature: Signature,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceipt {
    pub exit_code: i32,
    pub return_value: Vec<u8>,
    pub gas_used: GasUnits,
}

impl MessageReceipt {
    pub fn is_success(&self) -> bool {
        self.exit_code == EXIT_CODE_OK
    }
}

/// The block a message was included in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub cid: H256,
    pub height: u64,
}

/// Everything the chain reports once a message has been included and executed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub block: Block,
    pub message: SignedMessage,
    pub receipt: MessageReceipt,
}
