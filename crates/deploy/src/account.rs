//! Deployer account derivation.

use alloy_core::primitives::Address;
use alloy_signer_local::{MnemonicBuilder, PrivateKeySigner, coins_bip39::English};

use crate::{ChainError, Credential};

/// Derivation index of the deployer account within a mnemonic.
const DEPLOYER_INDEX: u32 = 0;

/// Signer for the account a credential controls.
///
/// For a mnemonic this is the account at index 0 of the default Ethereum
/// derivation path (`m/44'/60'/0'/0/0`).
pub fn deployer_signer(credential: &Credential) -> Result<PrivateKeySigner, ChainError> {
    match credential {
        Credential::PrivateKey(key) => key
            .parse::<PrivateKeySigner>()
            .map_err(|e| ChainError::Credential(e.to_string())),
        Credential::Mnemonic(phrase) => MnemonicBuilder::<English>::default()
            .phrase(phrase.as_str())
            .index(DEPLOYER_INDEX)
            .and_then(|builder| builder.build())
            .map_err(|e| ChainError::Credential(e.to_string())),
    }
}

/// Address of the account a credential controls.
pub fn deployer_address(credential: &Credential) -> Result<Address, ChainError> {
    Ok(deployer_signer(credential)?.address())
}
