//! Deterministic deployment factory.

use std::future::Future;

use alloy_core::{
    primitives::{Address, B256, Bytes, U256},
    sol_types::SolCall,
};
use anyhow::{Context, Result};

use crate::chain::{Transactor, TxReceipt};

mod abi {
    alloy_core::sol_types::sol! {
        #![sol(alloy_sol_types = alloy_core::sol_types)]

        function deploy(bytes32 salt, bytes memory creationCode) external payable returns (address deployed);
        function getDeployed(address deployer, bytes32 salt) external view returns (address);
    }
}

/// A factory placing contracts at addresses derived from the caller and a salt.
pub trait DeterministicFactory: Send + Sync {
    /// The factory contract address.
    fn address(&self) -> Address;

    /// Deploy `init_code` under `salt`, with zero value.
    fn deploy(&self, salt: B256, init_code: Bytes)
    -> impl Future<Output = Result<TxReceipt>> + Send;

    /// The address the factory assigns to `(deployer, salt)`.
    fn get_deployed(
        &self,
        deployer: Address,
        salt: B256,
    ) -> impl Future<Output = Result<Address>> + Send;
}

/// On-chain factory exposing `deploy(bytes32,bytes)` and `getDeployed(address,bytes32)`.
#[derive(Debug)]
pub struct OutrunFactory<'a, T> {
    address: Address,
    transactor: &'a T,
}

impl<'a, T: Transactor> OutrunFactory<'a, T> {
    pub fn new(address: Address, transactor: &'a T) -> Self {
        Self {
            address,
            transactor,
        }
    }
}

/// Calldata for `deploy(salt, initCode)`.
pub fn encode_deploy(salt: B256, init_code: Bytes) -> Bytes {
    abi::deployCall {
        salt,
        creationCode: init_code,
    }
    .abi_encode()
    .into()
}

/// Calldata for `getDeployed(deployer, salt)`.
pub fn encode_get_deployed(deployer: Address, salt: B256) -> Bytes {
    abi::getDeployedCall { deployer, salt }.abi_encode().into()
}

/// Decode the return data of `getDeployed`.
pub fn decode_get_deployed(data: &[u8]) -> Result<Address> {
    let ret = abi::getDeployedCall::abi_decode_returns(data, true)
        .context("Failed to decode getDeployed return data")?;
    Ok(ret._0)
}

impl<T: Transactor> DeterministicFactory for OutrunFactory<'_, T> {
    fn address(&self) -> Address {
        self.address
    }

    async fn deploy(&self, salt: B256, init_code: Bytes) -> Result<TxReceipt> {
        self.transactor
            .send_transaction(self.address, encode_deploy(salt, init_code), U256::ZERO)
            .await
            .with_context(|| format!("Factory {} deploy call failed", self.address))
    }

    async fn get_deployed(&self, deployer: Address, salt: B256) -> Result<Address> {
        let data = self
            .transactor
            .call(self.address, encode_get_deployed(deployer, salt))
            .await
            .with_context(|| format!("Factory {} getDeployed call failed", self.address))?;
        decode_get_deployed(&data)
    }
}
