//! In-memory doubles for the collaborator traits.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use alloy_core::primitives::{Address, B256, Bytes, U64, U256, address, keccak256};
use anyhow::Result;
use serde_json::Value;

use crate::{
    artifacts::{Artifact, ArtifactStore},
    chain::{Transactor, TxReceipt},
    factory::DeterministicFactory,
    records::{DeploymentRecord, DeploymentStore},
    verify::{SourceVerifier, VerificationRequest, VerifyError},
};

pub const MOCK_FACTORY: Address = address!("fac70f0000000000000000000000000000000000");
pub const MOCK_SENDER: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");

fn receipt(seed: &[u8]) -> TxReceipt {
    TxReceipt {
        transaction_hash: keccak256(seed),
        block_number: Some(U64::from(1)),
        status: Some(U64::from(1)),
        gas_used: None,
    }
}

#[derive(Debug, Default)]
pub struct MemoryArtifacts {
    artifacts: HashMap<String, Artifact>,
}

impl MemoryArtifacts {
    pub fn with(name: &str, bytecode: &[u8]) -> Self {
        Self::with_abi(name, bytecode, Value::Array(vec![]))
    }

    pub fn with_abi(name: &str, bytecode: &[u8], abi: Value) -> Self {
        let artifact = Artifact {
            contract_name: name.to_string(),
            source_name: format!("contracts/{name}.sol"),
            abi,
            bytecode: Bytes::copy_from_slice(bytecode),
        };
        Self {
            artifacts: HashMap::from([(name.to_string(), artifact)]),
        }
    }
}

impl ArtifactStore for MemoryArtifacts {
    fn read_artifact(&self, contract_name: &str) -> Result<Artifact> {
        self.artifacts
            .get(contract_name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Artifact for {} not found", contract_name))
    }
}

#[derive(Debug, Default)]
pub struct MemoryRecords {
    records: Mutex<HashMap<(String, String), DeploymentRecord>>,
}

impl MemoryRecords {
    pub fn get(&self, network: &str, contract_name: &str) -> Option<DeploymentRecord> {
        self.load(network, contract_name).ok().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }
}

impl DeploymentStore for MemoryRecords {
    fn save(&self, network: &str, record: &DeploymentRecord) -> Result<()> {
        self.records.lock().unwrap().insert(
            (network.to_string(), record.contract_name.clone()),
            record.clone(),
        );
        Ok(())
    }

    fn load(&self, network: &str, contract_name: &str) -> Result<Option<DeploymentRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(network.to_string(), contract_name.to_string()))
            .cloned())
    }
}

/// Factory double: records every call, answers `getDeployed` with a fixed address.
#[derive(Debug)]
pub struct MockFactory {
    deployed: Address,
    revert: bool,
    submissions: Mutex<Vec<(B256, Bytes)>>,
    queries: Mutex<Vec<(Address, B256)>>,
}

impl MockFactory {
    pub fn returning(deployed: Address) -> Self {
        Self {
            deployed,
            revert: false,
            submissions: Mutex::default(),
            queries: Mutex::default(),
        }
    }

    pub fn reverting() -> Self {
        Self {
            revert: true,
            ..Self::returning(Address::ZERO)
        }
    }

    pub fn submissions(&self) -> Vec<(B256, Bytes)> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<(Address, B256)> {
        self.queries.lock().unwrap().clone()
    }
}

impl DeterministicFactory for MockFactory {
    fn address(&self) -> Address {
        MOCK_FACTORY
    }

    async fn deploy(&self, salt: B256, init_code: Bytes) -> Result<TxReceipt> {
        self.submissions.lock().unwrap().push((salt, init_code));
        if self.revert {
            anyhow::bail!("execution reverted");
        }
        Ok(receipt(salt.as_slice()))
    }

    async fn get_deployed(&self, deployer: Address, salt: B256) -> Result<Address> {
        self.queries.lock().unwrap().push((deployer, salt));
        Ok(self.deployed)
    }
}

/// Transactor double: records every transaction, optionally failing the n-th (1-based).
#[derive(Debug, Default)]
pub struct MockTransactor {
    fail_on: Option<usize>,
    sent: Mutex<Vec<(Address, Bytes)>>,
}

impl MockTransactor {
    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on: Some(call),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(Address, Bytes)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Transactor for MockTransactor {
    fn sender(&self) -> Address {
        MOCK_SENDER
    }

    async fn send_transaction(&self, to: Address, data: Bytes, _value: U256) -> Result<TxReceipt> {
        let count = {
            let mut sent = self.sent.lock().unwrap();
            sent.push((to, data.clone()));
            sent.len()
        };
        if self.fail_on == Some(count) {
            anyhow::bail!("Transaction {} to {} reverted", count, to);
        }
        Ok(receipt(&data))
    }

    async fn call(&self, _to: Address, _data: Bytes) -> Result<Bytes> {
        Ok(Bytes::new())
    }
}

/// One scripted verification response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Ok,
    Fail,
    AlreadyVerified,
    /// Never completes.
    Hang,
}

/// Verifier double replaying a script; the last step repeats once the script runs out.
#[derive(Debug)]
pub struct ScriptedVerifier {
    steps: Vec<Step>,
    calls: AtomicU32,
}

impl ScriptedVerifier {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            calls: AtomicU32::new(0),
        }
    }

    pub fn always(step: Step) -> Self {
        Self::new(vec![step])
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SourceVerifier for ScriptedVerifier {
    async fn verify_source(&self, _request: &VerificationRequest) -> Result<(), VerifyError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
        let step = self
            .steps
            .get(index)
            .or(self.steps.last())
            .copied()
            .unwrap_or(Step::Fail);

        match step {
            Step::Ok => Ok(()),
            Step::Fail => Err(VerifyError::Rejected("Fail - Unable to verify".to_string())),
            Step::AlreadyVerified => Err(VerifyError::AlreadyVerified),
            Step::Hang => std::future::pending().await,
        }
    }
}
