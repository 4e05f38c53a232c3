//! Deployment records.

use std::path::{Path, PathBuf};

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The persisted result of a successful deployment.
///
/// A record is created once per successful submission and never mutated;
/// later tooling reads it back by contract name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub contract_name: String,
    pub address: Address,
    pub abi: Value,
}

/// Storage for deployment records, keyed by network and contract name.
pub trait DeploymentStore: Send + Sync {
    /// Save (or overwrite) the record for `record.contract_name` on `network`.
    fn save(&self, network: &str, record: &DeploymentRecord) -> Result<()>;

    /// Load a record, `None` if the contract was never deployed on `network`.
    fn load(&self, network: &str, contract_name: &str) -> Result<Option<DeploymentRecord>>;
}

/// [`DeploymentStore`] using the hardhat-deploy layout:
/// `<root>/<network>/<ContractName>.json`.
#[derive(Debug, Clone)]
pub struct FsDeploymentStore {
    root: PathBuf,
}

impl FsDeploymentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn record_path(&self, network: &str, contract_name: &str) -> PathBuf {
        self.root.join(network).join(format!("{contract_name}.json"))
    }

    /// Write `<root>/<network>/.chainId`, as hardhat-deploy does for each network directory.
    pub fn write_chain_id(&self, network: &str, chain_id: u64) -> Result<()> {
        let dir = self.root.join(network);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create deployments directory {}", dir.display()))?;
        let path = dir.join(".chainId");
        std::fs::write(&path, chain_id.to_string())
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Write through a temporary file so a crash never leaves a truncated record.
    fn write_atomic(path: &Path, content: &str) -> Result<()> {
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to move record into {}", path.display()))?;
        Ok(())
    }
}

impl DeploymentStore for FsDeploymentStore {
    fn save(&self, network: &str, record: &DeploymentRecord) -> Result<()> {
        let dir = self.root.join(network);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create deployments directory {}", dir.display()))?;

        let path = self.record_path(network, &record.contract_name);
        let content = serde_json::to_string_pretty(record)
            .context("Failed to serialize deployment record")?;
        Self::write_atomic(&path, &content)?;

        tracing::info!(
            network = %network,
            contract = %record.contract_name,
            address = %record.address,
            path = %path.display(),
            "Deployment record saved"
        );

        Ok(())
    }

    fn load(&self, network: &str, contract_name: &str) -> Result<Option<DeploymentRecord>> {
        let path = self.record_path(network, contract_name);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let record = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse deployment record {}", path.display()))?;

        Ok(Some(record))
    }
}
