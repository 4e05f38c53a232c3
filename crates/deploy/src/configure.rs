//! Post-deploy administrative configuration.
//!
//! Calls are issued strictly in order against the freshly deployed contract.
//! Later calls may rely on earlier ones (ranges must be set before
//! registrations are accepted), so the first failure stops the run. There is
//! no rollback: the contract stays deployed and partially configured.

use std::fmt;

use alloy_core::{
    primitives::{Address, Bytes, U256},
    sol_types::SolCall,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::Transactor;

mod abi {
    alloy_core::sol_types::sol! {
        #![sol(alloy_sol_types = alloy_core::sol_types)]

        struct LzEndpointId {
            uint32 chainId;
            uint32 endpointId;
        }

        function setDurationDaysRange(uint128 minDurationDays, uint128 maxDurationDays) external;
        function setLockupDaysRange(uint128 minLockupDays, uint128 maxLockupDays) external;
        function setLzEndpointId(LzEndpointId[] calldata endpoints) external;
    }
}

/// A chain id paired with its messaging endpoint id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LzEndpoint {
    pub chain_id: u32,
    pub endpoint_id: u32,
}

/// One administrative call against a deployed contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "kebab-case")]
pub enum AdminCall {
    SetDurationDaysRange { min: u64, max: u64 },
    SetLockupDaysRange { min: u64, max: u64 },
    SetLzEndpointIds { endpoints: Vec<LzEndpoint> },
}

impl AdminCall {
    /// The Solidity function this call invokes.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetDurationDaysRange { .. } => "setDurationDaysRange",
            Self::SetLockupDaysRange { .. } => "setLockupDaysRange",
            Self::SetLzEndpointIds { .. } => "setLzEndpointId",
        }
    }

    pub fn calldata(&self) -> Bytes {
        let encoded = match self {
            Self::SetDurationDaysRange { min, max } => abi::setDurationDaysRangeCall {
                minDurationDays: u128::from(*min),
                maxDurationDays: u128::from(*max),
            }
            .abi_encode(),
            Self::SetLockupDaysRange { min, max } => abi::setLockupDaysRangeCall {
                minLockupDays: u128::from(*min),
                maxLockupDays: u128::from(*max),
            }
            .abi_encode(),
            Self::SetLzEndpointIds { endpoints } => abi::setLzEndpointIdCall {
                endpoints: endpoints
                    .iter()
                    .map(|e| abi::LzEndpointId {
                        chainId: e.chain_id,
                        endpointId: e.endpoint_id,
                    })
                    .collect(),
            }
            .abi_encode(),
        };
        encoded.into()
    }
}

impl fmt::Display for AdminCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetDurationDaysRange { min, max } | Self::SetLockupDaysRange { min, max } => {
                write!(f, "{}({}, {})", self.name(), min, max)
            }
            Self::SetLzEndpointIds { endpoints } => {
                let list = endpoints
                    .iter()
                    .map(|e| format!("{}:{}", e.chain_id, e.endpoint_id))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{}([{}])", self.name(), list)
            }
        }
    }
}

/// A configuration call failed. Calls before it were applied, calls after it were not issued.
#[derive(Debug, Error)]
#[error(
    "admin call #{index} {call} on {contract} failed after {} applied call(s); resume from this call",
    .applied.len()
)]
pub struct ConfigureError {
    /// 1-based position of the failing call.
    pub index: usize,
    pub call: String,
    pub contract: Address,
    /// The calls that succeeded before the failure, in order.
    pub applied: Vec<String>,
    #[source]
    pub source: anyhow::Error,
}

/// Applies [`AdminCall`]s in order through a [`Transactor`].
pub struct PostDeployConfigurator<'a, T> {
    transactor: &'a T,
}

impl<'a, T: Transactor> PostDeployConfigurator<'a, T> {
    pub fn new(transactor: &'a T) -> Self {
        Self { transactor }
    }

    /// Issue every call against `contract`; returns the number applied.
    pub async fn configure(
        &self,
        contract: Address,
        calls: &[AdminCall],
    ) -> Result<usize, ConfigureError> {
        let mut applied = Vec::with_capacity(calls.len());

        for (position, call) in calls.iter().enumerate() {
            let index = position + 1;
            tracing::info!(contract = %contract, index, call = %call, "Applying admin call");

            match self
                .transactor
                .send_transaction(contract, call.calldata(), U256::ZERO)
                .await
            {
                Ok(receipt) => {
                    tracing::debug!(index, tx_hash = %receipt.transaction_hash, "Admin call applied");
                    applied.push(call.to_string());
                }
                Err(source) => {
                    tracing::error!(
                        contract = %contract,
                        index,
                        call = %call,
                        error = %source,
                        "Admin call failed, remaining calls are not issued"
                    );
                    return Err(ConfigureError {
                        index,
                        call: call.to_string(),
                        contract,
                        applied,
                        source,
                    });
                }
            }
        }

        Ok(applied.len())
    }
}
