//! End-to-end deployment tasks against in-process chain and explorer doubles.
//!
//! Artifacts and deployment records live on disk in a temporary directory, so
//! the Hardhat artifact reader and the hardhat-deploy record layout are
//! exercised as in a real run.

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes, U256, address, keccak256};
use anyhow::Result;
use memeverse_deploy::{
    AdminCall, ConstructorArgs, DeploymentSpec, DeploymentStore, DeploymentTask,
    DeterministicFactory, FsDeploymentStore, HardhatArtifacts, LzEndpoint, SaltSeed,
    SourceVerifier, TaskContext, TaskError, Transactor, TxReceipt, VerificationOutcome,
    VerificationPolicy, VerificationRequest, VerifyError, make_salt,
};
use tempdir::TempDir;

const FACTORY: Address = address!("fac70f0000000000000000000000000000000000");
const DEPLOYER: Address = address!("dddddddddddddddddddddddddddddddddddddddd");
const BEEF: Address = address!("beefbeefbeefbeefbeefbeefbeefbeefbeefbeef");

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn receipt(seed: &[u8]) -> TxReceipt {
    serde_json::from_value(serde_json::json!({
        "transactionHash": keccak256(seed),
        "status": "0x1",
    }))
    .expect("valid receipt")
}

/// A chain with a deterministic factory that always answers `getDeployed` with one address.
#[derive(Default)]
struct FakeChain {
    deployed: Option<Address>,
    fail_tx: Option<usize>,
    deploys: Mutex<Vec<(B256, Bytes)>>,
    transactions: Mutex<Vec<(Address, Bytes)>>,
}

impl FakeChain {
    fn deploying(address: Address) -> Self {
        Self {
            deployed: Some(address),
            ..Default::default()
        }
    }
}

impl Transactor for FakeChain {
    fn sender(&self) -> Address {
        DEPLOYER
    }

    async fn send_transaction(&self, to: Address, data: Bytes, _value: U256) -> Result<TxReceipt> {
        let count = {
            let mut transactions = self.transactions.lock().unwrap();
            transactions.push((to, data.clone()));
            transactions.len()
        };
        if self.fail_tx == Some(count) {
            anyhow::bail!("execution reverted");
        }
        Ok(receipt(&data))
    }

    async fn call(&self, _to: Address, _data: Bytes) -> Result<Bytes> {
        Ok(Bytes::new())
    }
}

impl DeterministicFactory for FakeChain {
    fn address(&self) -> Address {
        FACTORY
    }

    async fn deploy(&self, salt: B256, init_code: Bytes) -> Result<TxReceipt> {
        self.deploys.lock().unwrap().push((salt, init_code));
        Ok(receipt(salt.as_slice()))
    }

    async fn get_deployed(&self, deployer: Address, _salt: B256) -> Result<Address> {
        anyhow::ensure!(deployer == DEPLOYER, "unexpected deployer {}", deployer);
        Ok(self.deployed.unwrap_or(Address::ZERO))
    }
}

/// An explorer that rejects every submission.
#[derive(Default)]
struct RejectingExplorer {
    calls: AtomicU32,
}

impl SourceVerifier for RejectingExplorer {
    async fn verify_source(&self, _request: &VerificationRequest) -> Result<(), VerifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(VerifyError::Rejected("Fail - Unable to verify".to_string()))
    }
}

fn write_artifact(root: &Path, name: &str, bytecode: &str) {
    let dir = root.join(format!("contracts/{name}.sol"));
    std::fs::create_dir_all(&dir).unwrap();
    let artifact = serde_json::json!({
        "contractName": name,
        "sourceName": format!("contracts/{name}.sol"),
        "abi": [{
            "type": "constructor",
            "stateMutability": "nonpayable",
            "inputs": [{ "name": "owner", "type": "address", "internalType": "address" }]
        }],
        "bytecode": bytecode,
    });
    std::fs::write(dir.join(format!("{name}.json")), artifact.to_string()).unwrap();
}

fn foo_spec() -> DeploymentSpec {
    DeploymentSpec {
        contract_name: "Foo".to_string(),
        constructor_args: ConstructorArgs::parse([(
            "address",
            "0x1111111111111111111111111111111111111111",
        )])
        .unwrap(),
        salt_seed: SaltSeed::new("Foo", 1),
    }
}

fn policy(max_attempts: u32) -> VerificationPolicy {
    VerificationPolicy {
        max_attempts,
        backoff: Duration::ZERO,
        attempt_timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn test_exhausted_verification_still_succeeds() {
    init_tracing();
    let temp_dir = TempDir::new("memeverse-e2e").unwrap();
    let artifacts_dir = temp_dir.path().join("artifacts");
    write_artifact(&artifacts_dir, "Foo", "0x6080604052");

    let chain = FakeChain::deploying(BEEF);
    let artifacts = HardhatArtifacts::new(&artifacts_dir);
    let records = FsDeploymentStore::new(temp_dir.path().join("deployments"));
    let explorer = RejectingExplorer::default();
    let spec = foo_spec();

    let ctx = TaskContext {
        network: "bsc-testnet",
        transactor: &chain,
        factory: &chain,
        artifacts: &artifacts,
        records: &records,
        verifier: Some(&explorer),
        verification: policy(10),
    };
    let report = DeploymentTask::new("foo", &spec, &[])
        .run(&ctx)
        .await
        .expect("task must succeed even when verification is exhausted");

    assert_eq!(report.address, BEEF);
    assert!(matches!(
        report.verification,
        Some(VerificationOutcome::Exhausted { attempts: 10, .. })
    ));
    assert_eq!(explorer.calls.load(Ordering::SeqCst), 10);

    let deploys = chain.deploys.lock().unwrap().clone();
    assert_eq!(deploys.len(), 1);
    assert_eq!(deploys[0].0, make_salt("Foo", 1));
    assert!(deploys[0].1.starts_with(&[0x60, 0x80, 0x60, 0x40, 0x52]));

    let record = records
        .load("bsc-testnet", "Foo")
        .unwrap()
        .expect("record saved under the contract name");
    assert_eq!(record.address, BEEF);
    assert_eq!(record.contract_name, "Foo");
    assert!(temp_dir.path().join("deployments/bsc-testnet/Foo.json").exists());
}

#[tokio::test]
async fn test_configuration_follows_deployment() {
    let temp_dir = TempDir::new("memeverse-e2e").unwrap();
    write_artifact(temp_dir.path(), "Foo", "0x6080");

    let chain = FakeChain::deploying(BEEF);
    let artifacts = HardhatArtifacts::new(temp_dir.path());
    let records = FsDeploymentStore::new(temp_dir.path().join("deployments"));
    let spec = foo_spec();
    let calls = vec![
        AdminCall::SetDurationDaysRange { min: 1, max: 7 },
        AdminCall::SetLockupDaysRange { min: 180, max: 365 },
        AdminCall::SetLzEndpointIds {
            endpoints: vec![LzEndpoint {
                chain_id: 84532,
                endpoint_id: 40245,
            }],
        },
    ];

    let ctx: TaskContext<'_, _, _, _, _, RejectingExplorer> = TaskContext {
        network: "bsc-testnet",
        transactor: &chain,
        factory: &chain,
        artifacts: &artifacts,
        records: &records,
        verifier: None,
        verification: policy(10),
    };
    let report = DeploymentTask::new("foo", &spec, &calls).run(&ctx).await.unwrap();

    assert_eq!(report.verification, None);
    assert_eq!(report.configured_calls, 3);
    let transactions = chain.transactions.lock().unwrap().clone();
    assert_eq!(transactions.len(), 3);
    assert!(transactions.iter().all(|(to, _)| *to == BEEF));
    assert_eq!(transactions[1].1, calls[1].calldata());
}

#[tokio::test]
async fn test_failed_admin_call_names_the_call() {
    let temp_dir = TempDir::new("memeverse-e2e").unwrap();
    write_artifact(temp_dir.path(), "Foo", "0x6080");

    let chain = FakeChain {
        deployed: Some(BEEF),
        fail_tx: Some(2),
        ..Default::default()
    };
    let artifacts = HardhatArtifacts::new(temp_dir.path());
    let records = FsDeploymentStore::new(temp_dir.path().join("deployments"));
    let spec = foo_spec();
    let calls = vec![
        AdminCall::SetDurationDaysRange { min: 1, max: 7 },
        AdminCall::SetLockupDaysRange { min: 180, max: 365 },
        AdminCall::SetDurationDaysRange { min: 2, max: 8 },
    ];

    let ctx: TaskContext<'_, _, _, _, _, RejectingExplorer> = TaskContext {
        network: "bsc-testnet",
        transactor: &chain,
        factory: &chain,
        artifacts: &artifacts,
        records: &records,
        verifier: None,
        verification: policy(0),
    };
    let err = DeploymentTask::new("foo", &spec, &calls).run(&ctx).await.unwrap_err();

    match err {
        TaskError::Configure { address, source, .. } => {
            assert_eq!(address, BEEF);
            assert_eq!(source.index, 2);
            assert_eq!(source.call, "setLockupDaysRange(180, 365)");
            assert_eq!(source.applied.len(), 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(chain.transactions.lock().unwrap().len(), 2);
    assert!(records.load("bsc-testnet", "Foo").unwrap().is_some());
}

#[tokio::test]
async fn test_zero_address_saves_nothing() {
    let temp_dir = TempDir::new("memeverse-e2e").unwrap();
    write_artifact(temp_dir.path(), "Foo", "0x6080");

    let chain = FakeChain::default();
    let artifacts = HardhatArtifacts::new(temp_dir.path());
    let records = FsDeploymentStore::new(temp_dir.path().join("deployments"));
    let explorer = RejectingExplorer::default();
    let spec = foo_spec();

    let ctx = TaskContext {
        network: "bsc-testnet",
        transactor: &chain,
        factory: &chain,
        artifacts: &artifacts,
        records: &records,
        verifier: Some(&explorer),
        verification: policy(10),
    };
    let err = DeploymentTask::new("foo", &spec, &[]).run(&ctx).await.unwrap_err();

    assert!(matches!(err, TaskError::Deploy(_)));
    assert_eq!(explorer.calls.load(Ordering::SeqCst), 0);
    assert!(records.load("bsc-testnet", "Foo").unwrap().is_none());
}
