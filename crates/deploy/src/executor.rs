//! Deterministic deployment through a factory.

use alloy_core::primitives::{Address, B256, Bytes};
use thiserror::Error;

use crate::{
    address::{self, SaltSeed},
    args::{self, ConstructorArgs, EncodeError},
    artifacts::ArtifactStore,
    factory::DeterministicFactory,
    records::{DeploymentRecord, DeploymentStore},
};

/// Immutable description of one deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentSpec {
    /// Artifact to deploy, also the name the record is saved under.
    pub contract_name: String,
    pub constructor_args: ConstructorArgs,
    pub salt_seed: SaltSeed,
}

/// Fatal deployment failures. No record is saved when one of these is returned.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("failed to load artifact for {contract}")]
    Artifact {
        contract: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("invalid constructor arguments for {contract}")]
    Encode {
        contract: String,
        #[source]
        source: EncodeError,
    },
    #[error("factory deploy of {contract} on {network} failed")]
    Submit {
        network: String,
        contract: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("could not resolve the address of {contract} on {network}")]
    Resolve {
        network: String,
        contract: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("factory returned the zero address for {contract} on {network}")]
    ZeroAddress { network: String, contract: String },
    #[error("failed to save the record of {contract} at {address} on {network}")]
    Persist {
        network: String,
        contract: String,
        address: Address,
        #[source]
        source: anyhow::Error,
    },
}

/// What a successful deployment produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Deployed {
    pub record: DeploymentRecord,
    pub salt: B256,
    pub transaction_hash: B256,
    /// ABI-encoded constructor arguments, needed for source verification.
    pub encoded_args: Bytes,
}

/// The init code and addresses of a deployment, computed without touching a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDeployment {
    pub salt: B256,
    pub init_code: Bytes,
    pub encoded_args: Bytes,
    /// CREATE2 prediction using the factory as deployer.
    pub predicted: Address,
    pub abi: serde_json::Value,
}

/// Build init code and salt for `spec`, checking its arguments against the artifact.
pub fn prepare_deployment<A: ArtifactStore>(
    spec: &DeploymentSpec,
    artifacts: &A,
    factory: Address,
) -> Result<PreparedDeployment, DeployError> {
    let artifact = artifacts
        .read_artifact(&spec.contract_name)
        .map_err(|source| DeployError::Artifact {
            contract: spec.contract_name.clone(),
            source,
        })?;

    // ABIs that fail to parse are left unchecked; the arguments were already
    // validated against the declared signature.
    if let Ok(abi) = artifact.json_abi() {
        spec.constructor_args
            .check_against(&abi)
            .map_err(|source| DeployError::Encode {
                contract: spec.contract_name.clone(),
                source,
            })?;
    }

    let salt = spec.salt_seed.salt();
    let init_code = args::init_code(&artifact.bytecode, &spec.constructor_args);
    let predicted = address::derive(factory, salt, &init_code);

    Ok(PreparedDeployment {
        salt,
        init_code,
        encoded_args: spec.constructor_args.encode(),
        predicted,
        abi: artifact.abi,
    })
}

/// Submits deployments through a factory and records the result.
pub struct DeploymentExecutor<'a, F, A, S> {
    network: &'a str,
    deployer: Address,
    factory: &'a F,
    artifacts: &'a A,
    records: &'a S,
}

impl<'a, F, A, S> DeploymentExecutor<'a, F, A, S>
where
    F: DeterministicFactory,
    A: ArtifactStore,
    S: DeploymentStore,
{
    pub fn new(
        network: &'a str,
        deployer: Address,
        factory: &'a F,
        artifacts: &'a A,
        records: &'a S,
    ) -> Self {
        Self {
            network,
            deployer,
            factory,
            artifacts,
            records,
        }
    }

    /// Deploy `spec` and persist its record.
    ///
    /// The address comes from the factory's `getDeployed`, never from the local
    /// prediction. Nothing is retried here: a deployment is a single economic
    /// action.
    pub async fn execute(&self, spec: &DeploymentSpec) -> Result<Deployed, DeployError> {
        let contract = spec.contract_name.as_str();
        let prepared = prepare_deployment(spec, self.artifacts, self.factory.address())?;

        tracing::info!(
            network = %self.network,
            contract = %contract,
            salt_seed = %spec.salt_seed,
            salt = %prepared.salt,
            factory = %self.factory.address(),
            init_code_len = prepared.init_code.len(),
            "Submitting deterministic deployment"
        );

        let receipt = self
            .factory
            .deploy(prepared.salt, prepared.init_code.clone())
            .await
            .map_err(|source| DeployError::Submit {
                network: self.network.to_string(),
                contract: contract.to_string(),
                source,
            })?;

        let address = self
            .factory
            .get_deployed(self.deployer, prepared.salt)
            .await
            .map_err(|source| DeployError::Resolve {
                network: self.network.to_string(),
                contract: contract.to_string(),
                source,
            })?;

        if address == Address::ZERO {
            return Err(DeployError::ZeroAddress {
                network: self.network.to_string(),
                contract: contract.to_string(),
            });
        }

        if address != prepared.predicted {
            tracing::debug!(
                factory_address = %address,
                create2_prediction = %prepared.predicted,
                "Factory address differs from local CREATE2 prediction, using the factory's"
            );
        }

        tracing::info!(
            network = %self.network,
            contract = %contract,
            address = %address,
            tx_hash = %receipt.transaction_hash,
            "Deployed contract"
        );

        let record = DeploymentRecord {
            contract_name: contract.to_string(),
            address,
            abi: prepared.abi,
        };
        self.records
            .save(self.network, &record)
            .map_err(|source| DeployError::Persist {
                network: self.network.to_string(),
                contract: contract.to_string(),
                address,
                source,
            })?;

        Ok(Deployed {
            record,
            salt: prepared.salt,
            transaction_hash: receipt.transaction_hash,
            encoded_args: prepared.encoded_args,
        })
    }
}
