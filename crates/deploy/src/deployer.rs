use std::time::Duration;

use alloy_core::primitives::{Address, B256, keccak256};
use anyhow::{Context, Result};
use futures::future::join_all;

use crate::{
    address::SaltSeed,
    artifacts::HardhatArtifacts,
    chain::ChainClient,
    config::{DeployConfig, TaskConfig},
    executor::prepare_deployment,
    factory::OutrunFactory,
    records::FsDeploymentStore,
    task::{DeploymentTask, TaskContext, TaskReport, VerificationPolicy},
    verify::{EtherscanConfig, EtherscanVerifier},
};

/// Which tasks to run and how.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployOptions {
    pub tags: Vec<String>,
    pub all: bool,
    /// Run different networks concurrently.
    pub parallel: bool,
    pub skip_verify: bool,
    /// Overrides `verification.max_attempts`.
    pub max_verify_attempts: Option<u32>,
}

/// Tasks of one network, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkGroup<'a> {
    pub network: &'a str,
    pub tasks: Vec<&'a TaskConfig>,
}

/// Group tasks by network, keeping the order networks first appear in.
pub fn group_by_network<'a>(tasks: &[&'a TaskConfig]) -> Vec<NetworkGroup<'a>> {
    let mut groups: Vec<NetworkGroup<'a>> = Vec::new();
    for &task in tasks {
        match groups.iter_mut().find(|g| g.network == task.network) {
            Some(group) => group.tasks.push(task),
            None => groups.push(NetworkGroup {
                network: &task.network,
                tasks: vec![task],
            }),
        }
    }
    groups
}

/// The outcome of a deploy run.
#[derive(Debug, Default)]
pub struct DeploySummary {
    pub reports: Vec<TaskReport>,
    /// Networks whose group stopped on a fatal error.
    pub failures: Vec<(String, anyhow::Error)>,
}

impl DeploySummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Offline address prediction for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    pub tag: String,
    pub network: String,
    pub contract_name: String,
    pub salt_seed: SaltSeed,
    pub salt: B256,
    pub init_code_hash: B256,
    pub factory: Address,
    /// CREATE2 address with the factory as deployer. Factories that key the
    /// salt by sender report a different address from `getDeployed`.
    pub address: Address,
}

/// Runs configured deployment tasks.
pub struct Deployer<'a> {
    config: &'a DeployConfig,
}

struct GroupResult {
    network: String,
    reports: Vec<TaskReport>,
    error: Option<anyhow::Error>,
}

impl<'a> Deployer<'a> {
    pub fn new(config: &'a DeployConfig) -> Self {
        Self { config }
    }

    /// Run the selected tasks.
    ///
    /// Tasks of one network always run in order, sharing one sender. With
    /// `parallel`, networks run concurrently and every failure is collected;
    /// otherwise the first failing network stops the run.
    pub async fn deploy(&self, options: &DeployOptions) -> Result<DeploySummary> {
        let tasks = self.config.select_tasks(&options.tags, options.all)?;
        anyhow::ensure!(
            !tasks.is_empty(),
            "No task selected: pass task tags or --all"
        );

        let groups = group_by_network(&tasks);
        tracing::info!(
            tasks = tasks.len(),
            networks = groups.len(),
            parallel = options.parallel,
            "Deploying"
        );

        let results = if options.parallel {
            join_all(groups.iter().map(|group| self.run_group(group, options))).await
        } else {
            let mut results = Vec::with_capacity(groups.len());
            for group in &groups {
                let result = self.run_group(group, options).await;
                let failed = result.error.is_some();
                results.push(result);
                if failed {
                    break;
                }
            }
            results
        };

        let mut summary = DeploySummary::default();
        for result in results {
            summary.reports.extend(result.reports);
            if let Some(error) = result.error {
                tracing::error!(network = %result.network, error = ?error, "Network deployment failed");
                summary.failures.push((result.network, error));
            }
        }

        Ok(summary)
    }

    async fn run_group(&self, group: &NetworkGroup<'_>, options: &DeployOptions) -> GroupResult {
        let mut reports = Vec::new();
        let error = self.run_tasks(group, options, &mut reports).await.err();
        GroupResult {
            network: group.network.to_string(),
            reports,
            error,
        }
    }

    async fn run_tasks(
        &self,
        group: &NetworkGroup<'_>,
        options: &DeployOptions,
        reports: &mut Vec<TaskReport>,
    ) -> Result<()> {
        let network = self
            .config
            .network(group.network)
            .with_context(|| format!("Unknown network {}", group.network))?;

        let client = ChainClient::connect(
            network.rpc_url.clone(),
            network.chain_id,
            network.deployer,
            self.config.rpc.chain_timeouts(),
        )
        .await
        .with_context(|| format!("Failed to connect to {}", network.name))?;

        let records = FsDeploymentStore::new(self.config.deployments_dir.clone());
        records.write_chain_id(&network.name, network.chain_id)?;
        let artifacts = HardhatArtifacts::new(self.config.artifacts_dir.clone());
        let factory = OutrunFactory::new(network.factory, &client);

        let settings = &self.config.verification;
        let verifier = match (&network.explorer, options.skip_verify) {
            (_, true) => None,
            (None, false) => {
                tracing::warn!(network = %network.name, "No explorer configured, verification skipped");
                None
            }
            (Some(explorer), false) => Some(EtherscanVerifier::new(
                EtherscanConfig {
                    api_url: explorer.api_url.clone(),
                    api_key: explorer.api_key.clone(),
                    chain_id: network.chain_id,
                    poll_interval: Duration::from_secs(settings.poll_interval_secs),
                    poll_timeout: Duration::from_secs(settings.poll_timeout_secs),
                    request_timeout: self.config.rpc.chain_timeouts().request,
                },
                artifacts.clone(),
            )?),
        };

        let ctx = TaskContext {
            network: &network.name,
            transactor: &client,
            factory: &factory,
            artifacts: &artifacts,
            records: &records,
            verifier: verifier.as_ref(),
            verification: VerificationPolicy {
                max_attempts: options.max_verify_attempts.unwrap_or(settings.max_attempts),
                backoff: settings.backoff(),
                attempt_timeout: settings.attempt_timeout(),
            },
        };

        for task in &group.tasks {
            let report = DeploymentTask::new(&task.tag, &task.spec, &task.configure)
                .run(&ctx)
                .await
                .with_context(|| format!("Task {} failed on {}", task.tag, network.name))?;
            reports.push(report);
        }

        Ok(())
    }

    /// Predict the addresses of the selected tasks without touching any chain.
    pub fn predict(&self, tags: &[String], all: bool) -> Result<Vec<Prediction>> {
        let artifacts = HardhatArtifacts::new(self.config.artifacts_dir.clone());

        self.config
            .select_tasks(tags, all)?
            .into_iter()
            .map(|task| {
                let network = self
                    .config
                    .network(&task.network)
                    .with_context(|| format!("Unknown network {}", task.network))?;
                let prepared = prepare_deployment(&task.spec, &artifacts, network.factory)
                    .with_context(|| format!("Failed to prepare task {}", task.tag))?;

                Ok(Prediction {
                    tag: task.tag.clone(),
                    network: task.network.clone(),
                    contract_name: task.spec.contract_name.clone(),
                    salt_seed: task.spec.salt_seed.clone(),
                    salt: prepared.salt,
                    init_code_hash: keccak256(&prepared.init_code),
                    factory: network.factory,
                    address: prepared.predicted,
                })
            })
            .collect()
    }
}
