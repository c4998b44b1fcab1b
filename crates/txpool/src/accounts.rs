//! Deterministic test accounts.

use alloy_primitives::Address;
use alloy_signer_local::{MnemonicBuilder, PrivateKeySigner, coins_bip39::English};

use crate::error::PoolError;

/// The well-known development mnemonic. Execution clients started for a
/// conformance run fund its first accounts at genesis.
pub const TEST_MNEMONIC: &str = "test test test test test test test test test test test junk";

/// Signers derived from a mnemonic at indices `0..count`.
///
/// Account 0 is the vault that funds everything else.
#[derive(Clone, Debug)]
pub struct TestAccounts {
    signers: Vec<PrivateKeySigner>,
}

impl TestAccounts {
    /// Derives `count` accounts from [`TEST_MNEMONIC`].
    pub fn standard(count: u32) -> Result<Self, PoolError> {
        Self::from_mnemonic(TEST_MNEMONIC, count)
    }

    pub fn from_mnemonic(phrase: &str, count: u32) -> Result<Self, PoolError> {
        if count == 0 {
            return Err(PoolError::NoAccounts);
        }

        let signers = (0..count)
            .map(|index| {
                MnemonicBuilder::<English>::default()
                    .phrase(phrase)
                    .index(index)
                    .and_then(|builder| builder.build())
                    .map_err(|source| PoolError::AccountDerivation { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { signers })
    }

    pub fn vault(&self) -> &PrivateKeySigner {
        &self.signers[0]
    }

    pub fn get(&self, index: usize) -> Option<&PrivateKeySigner> {
        self.signers.get(index)
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.signers.iter().map(|s| s.address()).collect()
    }

    pub fn len(&self) -> usize {
        self.signers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::address;

    use super::*;

    #[test]
    fn derives_the_well_known_addresses() {
        let accounts = TestAccounts::standard(2).unwrap();
        assert_eq!(accounts.len(), 2);
        let vault = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
        assert_eq!(accounts.vault().address(), vault);
        assert_eq!(
            accounts.get(1).map(|s| s.address()),
            Some(address!("70997970C51812dc3A010C7d01b50e0d17dc79C8"))
        );
        assert!(accounts.get(2).is_none());
    }

    #[test]
    fn zero_accounts_is_an_error() {
        assert!(matches!(TestAccounts::standard(0), Err(PoolError::NoAccounts)));
    }
}
