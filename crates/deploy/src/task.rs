//! One named deployment: execute, verify, configure.

use std::time::Duration;

use alloy_core::primitives::{Address, B256};
use thiserror::Error;

use crate::{
    artifacts::ArtifactStore,
    chain::Transactor,
    configure::{AdminCall, ConfigureError, PostDeployConfigurator},
    executor::{DeployError, DeploymentExecutor, DeploymentSpec},
    factory::DeterministicFactory,
    records::DeploymentStore,
    verify::{
        DEFAULT_BACKOFF, DEFAULT_MAX_ATTEMPTS, SourceVerifier, VerificationOutcome, VerificationRequest,
        VerificationRetrier,
    },
};

/// How verification is run for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationPolicy {
    pub max_attempts: u32,
    /// Constant delay between two attempts.
    pub backoff: Duration,
    pub attempt_timeout: Duration,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
            attempt_timeout: Duration::from_secs(300),
        }
    }
}

/// Collaborators shared by every task of one network.
///
/// `verifier` is `None` when verification is skipped or the network has no
/// explorer configured.
pub struct TaskContext<'a, T, F, A, S, V> {
    pub network: &'a str,
    pub transactor: &'a T,
    pub factory: &'a F,
    pub artifacts: &'a A,
    pub records: &'a S,
    pub verifier: Option<&'a V>,
    pub verification: VerificationPolicy,
}

/// A fatal task failure.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Deploy(#[from] DeployError),
    /// The contract is deployed and recorded at `address`, but not fully configured.
    #[error("{contract} deployed at {address} but its configuration failed")]
    Configure {
        contract: String,
        address: Address,
        #[source]
        source: ConfigureError,
    },
}

/// What a completed task did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub tag: String,
    pub network: String,
    pub contract_name: String,
    pub address: Address,
    pub transaction_hash: B256,
    /// `None` when verification was skipped.
    pub verification: Option<VerificationOutcome>,
    pub configured_calls: usize,
}

/// A deployment parameterized by its spec and admin calls.
#[derive(Debug, Clone, Copy)]
pub struct DeploymentTask<'a> {
    pub tag: &'a str,
    pub spec: &'a DeploymentSpec,
    pub configure: &'a [AdminCall],
}

impl<'a> DeploymentTask<'a> {
    pub fn new(tag: &'a str, spec: &'a DeploymentSpec, configure: &'a [AdminCall]) -> Self {
        Self {
            tag,
            spec,
            configure,
        }
    }

    /// Run the task. Exhausted verification is reported, never returned as an error.
    pub async fn run<T, F, A, S, V>(
        &self,
        ctx: &TaskContext<'_, T, F, A, S, V>,
    ) -> Result<TaskReport, TaskError>
    where
        T: Transactor,
        F: DeterministicFactory,
        A: ArtifactStore,
        S: DeploymentStore,
        V: SourceVerifier,
    {
        let deployer = ctx.transactor.sender();
        tracing::info!(
            task = %self.tag,
            network = %ctx.network,
            deployer = %deployer,
            contract = %self.spec.contract_name,
            "Starting deployment task"
        );

        let executor =
            DeploymentExecutor::new(ctx.network, deployer, ctx.factory, ctx.artifacts, ctx.records);
        let deployed = executor.execute(self.spec).await?;
        let address = deployed.record.address;

        let verification = match ctx.verifier {
            Some(verifier) => {
                let request = VerificationRequest {
                    network: ctx.network.to_string(),
                    contract_name: self.spec.contract_name.clone(),
                    address,
                    constructor_args: deployed.encoded_args.clone(),
                };
                let outcome = VerificationRetrier::new(verifier, ctx.verification.max_attempts)
                    .attempt_timeout(ctx.verification.attempt_timeout)
                    .backoff(ctx.verification.backoff, ctx.verification.backoff)
                    .verify(&request)
                    .await;
                Some(outcome)
            }
            None => {
                tracing::info!(contract = %self.spec.contract_name, "Verification skipped");
                None
            }
        };

        let configured_calls = PostDeployConfigurator::new(ctx.transactor)
            .configure(address, self.configure)
            .await
            .map_err(|source| TaskError::Configure {
                contract: self.spec.contract_name.clone(),
                address,
                source,
            })?;

        tracing::info!(
            task = %self.tag,
            network = %ctx.network,
            contract = %self.spec.contract_name,
            address = %address,
            verified = verification.as_ref().is_some_and(VerificationOutcome::is_verified),
            configured_calls,
            "Deployment task complete"
        );

        Ok(TaskReport {
            tag: self.tag.to_string(),
            network: ctx.network.to_string(),
            contract_name: self.spec.contract_name.clone(),
            address,
            transaction_hash: deployed.transaction_hash,
            verification,
            configured_calls,
        })
    }
}
