//! memeverse-deploy - deterministic deployment and cross-chain route wiring.
//!
//! Contracts are deployed through a CREATE2 factory under a salt derived from
//! a `(label, version)` pair, verified on the block explorer with bounded
//! retries, then configured with a strict sequence of admin calls. The
//! messaging routes between the deployed endpoints are described by a static,
//! validated [`RouteTable`].

pub mod address;
pub mod args;
pub mod artifacts;
pub mod chain;
pub mod config;
pub mod configure;
pub mod env;
pub mod executor;
pub mod factory;
pub mod records;
pub mod route;
pub mod rpc;
pub mod task;
pub mod verify;

mod deployer;
pub use deployer::{DeployOptions, DeploySummary, Deployer, NetworkGroup, Prediction, group_by_network};

pub use address::{SaltSeed, derive, make_salt};
pub use args::{ConstructorArgs, EncodeError};
pub use artifacts::{Artifact, ArtifactStore, HardhatArtifacts};
pub use chain::{ChainClient, ChainTimeouts, Transactor, TxReceipt};
pub use config::{ConfigError, DEFAULT_CONFIG_FILE, DeployConfig, FileConfig, NetworkConfig, TaskConfig};
pub use configure::{AdminCall, ConfigureError, LzEndpoint, PostDeployConfigurator};
pub use env::Environment;
pub use executor::{DeployError, Deployed, DeploymentExecutor, DeploymentSpec};
pub use factory::{DeterministicFactory, OutrunFactory};
pub use records::{DeploymentRecord, DeploymentStore, FsDeploymentStore};
pub use route::{RouteTable, RouteValidationError};
pub use task::{DeploymentTask, TaskContext, TaskError, TaskReport, VerificationPolicy};
pub use verify::{
    EtherscanConfig, EtherscanVerifier, SourceVerifier, VerificationOutcome, VerificationRequest,
    VerificationRetrier, VerifyError,
};

#[cfg(test)]
pub(crate) mod test_utils;
