use async_trait::async_trait;
use ethers::{
    signers::{LocalWallet, Signer as _},
    types::{Address, RecoveryMessage},
};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::debug;

use super::Signer;
use crate::types::{ConnectorError, ConnectorResult, Signature, SignatureType, UNDEF_ADDRESS};

/// In-process secp256k1 keystore.
#[derive(Clone, Default)]
pub struct WalletSigner {
    wallets: Arc<RwLock<HashMap<Address, LocalWallet>>>,
}

impl WalletSigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key and returns the address it signs for.
    pub async fn import(&self, wallet: LocalWallet) -> Address {
        let address = wallet.address();
        self.wallets.write().await.insert(address, wallet);
        address
    }

    pub async fn has_key(&self, account: Address) -> bool {
        self.wallets.read().await.contains_key(&account)
    }
}

#[async_trait]
impl Signer for WalletSigner {
    async fn sign_bytes(&self, data: &[u8], account: Address) -> ConnectorResult<Signature> {
        if account == UNDEF_ADDRESS {
            return Err(ConnectorError::UndefinedAddress);
        }

        let wallet = self
            .wallets
            .read()
            .await
            .get(&account)
            .cloned()
            .ok_or_else(|| ConnectorError::SignError(format!("no key for {account:?}")))?;

        let signature = wallet
            .sign_message(data)
            .await
            .map_err(|e| ConnectorError::SignError(e.to_string()))?;

        debug!(?account, len = data.len(), "signed bytes");
        Ok(Signature {
            sig_type: SignatureType::Secp256k1,
            data: signature.to_vec(),
        })
    }
}

/// Checks that `signature` over `data` was produced by `account`.
pub fn verify_signature(
    signature: &Signature,
    data: &[u8],
    account: Address,
) -> ConnectorResult<()> {
    let recovered = recover_signer(signature, data)?;
    if recovered != account {
        return Err(ConnectorError::Unauthorized);
    }
    Ok(())
}

/// Recovers the address that produced a secp256k1 `signature` over `data`.
pub fn recover_signer(signature: &Signature, data: &[u8]) -> ConnectorResult<Address> {
    if signature.sig_type != SignatureType::Secp256k1 {
        return Err(ConnectorError::InvalidRequest(format!(
            "unsupported signature type {:?}",
            signature.sig_type
        )));
    }

    let signature = ethers::types::Signature::try_from(signature.data.as_slice())
        .map_err(|e| ConnectorError::InvalidRequest(e.to_string()))?;

    signature
        .recover(RecoveryMessage::Data(data.to_vec()))
        .map_err(|_| ConnectorError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    // Helper function to create a test wallet with a known private key
    fn create_test_wallet() -> LocalWallet {
        LocalWallet::from_str("1234567890123456789012345678901234567890123456789012345678901234")
            .unwrap()
    }

    #[tokio::test]
    async fn test_signatures_verify_against_account() {
        let signer = WalletSigner::new();
        let account = signer.import(create_test_wallet()).await;
        let payload = b"retrieval payload";

        let first = signer.sign_bytes(payload, account).await.unwrap();
        let second = signer.sign_bytes(payload, account).await.unwrap();

        assert_eq!(first.sig_type, SignatureType::Secp256k1);
        assert_eq!(first.data.len(), 65);
        verify_signature(&first, payload, account).unwrap();
        verify_signature(&second, payload, account).unwrap();
    }

    #[tokio::test]
    async fn test_signature_does_not_verify_for_other_account() {
        let signer = WalletSigner::new();
        let account = signer.import(create_test_wallet()).await;
        let signature = signer.sign_bytes(b"data", account).await.unwrap();

        assert_eq!(
            verify_signature(&signature, b"data", Address::random()),
            Err(ConnectorError::Unauthorized)
        );
        assert_eq!(
            verify_signature(&signature, b"other data", account),
            Err(ConnectorError::Unauthorized)
        );
    }

    #[tokio::test]
    async fn test_missing_key() {
        let signer = WalletSigner::new();

        assert!(matches!(
            signer.sign_bytes(b"data", Address::random()).await,
            Err(ConnectorError::SignError(_))
        ));
        assert_eq!(
            signer.sign_bytes(b"data", UNDEF_ADDRESS).await,
            Err(ConnectorError::UndefinedAddress)
        );
    }
}
