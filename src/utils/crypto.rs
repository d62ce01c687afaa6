use ethers::types::{Address, H256, U256};
use ethers::utils::keccak256;

use crate::types::{SignedMessage, UnsignedMessage};

pub trait U256Ext {
    fn to_be_bytes_vec(&self) -> Vec<u8>;
}

impl U256Ext for U256 {
    fn to_be_bytes_vec(&self) -> Vec<u8> {
        let mut bytes = [0u8; 32];
        self.to_big_endian(&mut bytes);
        bytes.to_vec()
    }
}

/// Canonical byte encoding of an unsigned message. This is what gets signed.
pub fn encode_unsigned_message(message: &UnsignedMessage) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(164 + message.params.len());
    bytes.extend_from_slice(message.to.as_bytes());
    bytes.extend_from_slice(message.from.as_bytes());
    bytes.extend_from_slice(&message.sequence_number.to_be_bytes());
    bytes.extend_from_slice(&message.value.to_be_bytes_vec());
    bytes.extend_from_slice(&message.method.to_be_bytes());
    bytes.extend_from_slice(&message.gas_price.to_be_bytes_vec());
    bytes.extend_from_slice(&message.gas_limit.to_be_bytes());
    bytes.extend_from_slice(&(message.params.len() as u32).to_be_bytes());
    bytes.extend_from_slice(&message.params);
    bytes
}

pub fn encode_signed_message(signed: &SignedMessage) -> Vec<u8> {
    let mut bytes = encode_unsigned_message(&signed.message);
    bytes.push(signed.signature.sig_type.as_byte());
    bytes.extend_from_slice(&signed.signature.data);
    bytes
}

/// Content identifier of a signed message.
pub fn message_cid(signed: &SignedMessage) -> H256 {
    H256::from(keccak256(encode_signed_message(signed)))
}

pub fn encode_address(address: Address) -> Vec<u8> {
    address.as_bytes().to_vec()
}

/// Decodes an address returned by an actor. `None` unless exactly 20 bytes.
pub fn decode_address(bytes: &[u8]) -> Option<Address> {
    if bytes.len() != Address::len_bytes() {
        return None;
    }
    Some(Address::from_slice(bytes))
}

/// Bytes a client signs to authenticate an HTTP request.
pub fn create_request_message(
    method: &str,
    path: &str,
    timestamp: u64,
    nonce: u64,
    request_data: &[u8],
) -> Vec<u8> {
    let mut message = Vec::with_capacity(24 + method.len() + path.len() + request_data.len());
    message.extend_from_slice(&(method.len() as u32).to_be_bytes());
    message.extend_from_slice(method.as_bytes());
    message.extend_from_slice(&(path.len() as u32).to_be_bytes());
    message.extend_from_slice(path.as_bytes());
    message.extend_from_slice(&timestamp.to_be_bytes());
    message.extend_from_slice(&nonce.to_be_bytes());
    message.extend_from_slice(request_data);
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Signature, SignatureType, CREATE_PAYMENT_CHANNEL_METHOD};

    fn sample_message() -> UnsignedMessage {
        UnsignedMessage {
            to: Address::random(),
            from: Address::random(),
            sequence_number: 7,
            value: U256::from(1000),
            method: CREATE_PAYMENT_CHANNEL_METHOD,
            params: vec![0xaa, 0xbb],
            gas_price: U256::from(1),
            gas_limit: 300,
        }
    }

    #[test]
    fn test_unsigned_encoding_layout() {
        let message = sample_message();
        let bytes = encode_unsigned_message(&message);

        assert_eq!(bytes.len(), 20 + 20 + 8 + 32 + 8 + 32 + 8 + 4 + 2);
        assert_eq!(&bytes[..20], message.to.as_bytes());
        assert_eq!(&bytes[20..40], message.from.as_bytes());
        assert_eq!(&bytes[40..48], &7u64.to_be_bytes());
        assert_eq!(&bytes[bytes.len() - 2..], &[0xaa, 0xbb]);
    }

    #[test]
    fn test_message_cid_depends_on_signature() {
        let message = sample_message();
        let first = SignedMessage {
            message: message.clone(),
            signature: Signature {
                sig_type: SignatureType::Secp256k1,
                data: vec![1; 65],
            },
        };
        let mut second = first.clone();
        second.signature.data = vec![2; 65];

        assert_eq!(message_cid(&first), message_cid(&first.clone()));
        assert_ne!(message_cid(&first), message_cid(&second));
    }

    #[test]
    fn test_decode_address_rejects_wrong_length() {
        let address = Address::random();
        assert_eq!(decode_address(&encode_address(address)), Some(address));
        assert_eq!(decode_address(&[1, 2, 3]), None);
        assert_eq!(decode_address(&[]), None);
    }

    #[test]
    fn test_request_message_binds_method_and_path() {
        let lanes = create_request_message("POST", "/channels/a/lanes", 10, 1, b"");

        assert_ne!(lanes, create_request_message("POST", "/channels/b/lanes", 10, 1, b""));
        assert_ne!(lanes, create_request_message("GET", "/channels/a/lanes", 10, 1, b""));
        assert_ne!(lanes, create_request_message("POST", "/channels/a/lanes", 10, 2, b""));
        assert_ne!(
            create_request_message("POST", "/channels", 10, 1, b"x"),
            create_request_message("POST", "/channelsx", 10, 1, b"")
        );
    }
}
