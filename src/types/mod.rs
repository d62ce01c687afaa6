pub mod channel;
pub mod error;
pub mod message;

pub use channel::{ChannelEntry, ChannelState, Lane};
pub use error::{ConnectorError, ConnectorResult};
pub use message::{
    Block, Confirmation, GasUnits, MessageReceipt, MethodId, Signature, SignatureType,
    SignedMessage, TokenAmount, UnsignedMessage, CREATE_PAYMENT_CHANNEL_METHOD, EXIT_CODE_OK,
    UNDEF_ADDRESS,
};
