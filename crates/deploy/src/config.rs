//! Deployment configuration.
//!
//! A `Memeverse.toml` file, merged with `MEMEVERSE_*` environment overrides,
//! is extracted into a [`FileConfig`]. [`DeployConfig::resolve`] then turns it
//! into typed values once: `${NAME}` placeholders are expanded from an
//! [`Environment`] snapshot, addresses and URLs are parsed, constructor
//! arguments are encoded and the route table is validated. Nothing touches a
//! chain until this succeeds.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy_core::primitives::Address;
use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{
    address::SaltSeed,
    args::{ConstructorArgs, EncodeError},
    chain::ChainTimeouts,
    configure::{AdminCall, LzEndpoint},
    env::Environment,
    executor::DeploymentSpec,
    route::{EndpointRef, RouteTable, RouteValidationError},
    verify::{DEFAULT_BACKOFF, DEFAULT_MAX_ATTEMPTS},
};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "Memeverse.toml";

/// Prefix of environment overrides, e.g. `MEMEVERSE_VERIFICATION__MAX_ATTEMPTS`.
pub const ENV_PREFIX: &str = "MEMEVERSE_";

/// Fatal start-up errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable(s): {}", .0.join(", "))]
    MissingEnv(Vec<String>),
    #[error("invalid {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("task {task} targets unknown network {network}")]
    UnknownNetwork { task: String, network: String },
    #[error("unknown task {0}")]
    UnknownTask(String),
    #[error("task tag {0} is declared more than once")]
    DuplicateTask(String),
    #[error("invalid constructor arguments for task {task}")]
    Encode {
        task: String,
        #[source]
        source: EncodeError,
    },
    #[error("task {task} cannot derive endpoint ids from the route table: {reason}")]
    RouteLookup { task: String, reason: String },
    #[error("failed to load route table {}", .path.display())]
    RouteFile {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    InvalidRoutes(#[from] RouteValidationError),
}

/// Source-verification settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationSettings {
    pub max_attempts: u32,
    /// Constant delay between two attempts.
    pub backoff_secs: u64,
    pub poll_interval_secs: u64,
    pub poll_timeout_secs: u64,
    /// Bound on a single attempt, submission and polling included.
    pub attempt_timeout_secs: u64,
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_secs: DEFAULT_BACKOFF.as_secs(),
            poll_interval_secs: 5,
            poll_timeout_secs: 120,
            attempt_timeout_secs: 300,
        }
    }
}

impl VerificationSettings {
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

/// JSON-RPC timing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcSettings {
    pub timeout_secs: u64,
    pub receipt_timeout_secs: u64,
    pub poll_interval_secs: u64,
}

impl Default for RpcSettings {
    fn default() -> Self {
        let defaults = ChainTimeouts::default();
        Self {
            timeout_secs: defaults.request.as_secs(),
            receipt_timeout_secs: defaults.receipt.as_secs(),
            poll_interval_secs: defaults.poll_interval.as_secs(),
        }
    }
}

impl RpcSettings {
    pub fn chain_timeouts(&self) -> ChainTimeouts {
        ChainTimeouts {
            request: Duration::from_secs(self.timeout_secs),
            receipt: Duration::from_secs(self.receipt_timeout_secs),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
        }
    }
}

/// `[networks.<name>.explorer]` as written in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorerFileConfig {
    pub api_url: String,
    pub api_key: String,
}

/// `[networks.<name>]` as written in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkFileConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// Messaging endpoint id of this chain.
    #[serde(default)]
    pub eid: Option<u32>,
    pub factory: String,
    #[serde(default)]
    pub deployer: Option<String>,
    #[serde(default)]
    pub explorer: Option<ExplorerFileConfig>,
}

/// A constructor argument value: a literal or an environment variable name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Number(u64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgFileConfig {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub value: Option<ArgValue>,
    /// Read the value from this environment variable instead.
    #[serde(default)]
    pub env: Option<String>,
}

/// A post-deploy call as written in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "kebab-case")]
pub enum CallFileConfig {
    SetDurationDaysRange { min: u64, max: u64 },
    SetLockupDaysRange { min: u64, max: u64 },
    SetLzEndpointIds { endpoints: Vec<LzEndpoint> },
    /// Endpoint ids of every route leaving this task's endpoint.
    SetLzEndpointIdsFromRoutes,
}

/// `[[tasks]]` as written in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFileConfig {
    pub tag: String,
    pub contract: String,
    pub network: String,
    pub salt: SaltSeed,
    #[serde(default)]
    pub constructor: Vec<ArgFileConfig>,
    #[serde(default)]
    pub configure: Vec<CallFileConfig>,
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_deployments_dir() -> PathBuf {
    PathBuf::from("deployments")
}

/// The raw configuration, before placeholder expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
    #[serde(default = "default_deployments_dir")]
    pub deployments_dir: PathBuf,
    /// Route table file, JSON or TOML.
    #[serde(default)]
    pub routes: Option<PathBuf>,
    #[serde(default)]
    pub verification: VerificationSettings,
    #[serde(default)]
    pub rpc: RpcSettings,
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkFileConfig>,
    #[serde(default)]
    pub tasks: Vec<TaskFileConfig>,
}

impl FileConfig {
    /// The file at `path` overlaid with `MEMEVERSE_*` environment variables.
    pub fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load `path`, or `path/Memeverse.toml` when `path` is a directory.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        anyhow::ensure!(
            path.exists(),
            "Configuration file or directory not found: {}",
            path.display()
        );

        let config_path = if path.is_dir() {
            path.join(DEFAULT_CONFIG_FILE)
        } else {
            path.to_path_buf()
        };
        anyhow::ensure!(
            config_path.is_file(),
            "Configuration file not found: {}",
            config_path.display()
        );

        Self::figment(&config_path)
            .extract()
            .with_context(|| format!("Failed to load configuration from {}", config_path.display()))
    }
}

/// Block explorer API of one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerConfig {
    pub api_url: Url,
    pub api_key: String,
}

/// A resolved network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub name: String,
    pub rpc_url: Url,
    pub chain_id: u64,
    pub eid: Option<u32>,
    pub factory: Address,
    /// Sender account; the node's first account when unset.
    pub deployer: Option<Address>,
    pub explorer: Option<ExplorerConfig>,
}

/// A resolved deployment task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskConfig {
    pub tag: String,
    pub network: String,
    pub spec: DeploymentSpec,
    pub configure: Vec<AdminCall>,
}

/// The typed configuration every component receives by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployConfig {
    pub artifacts_dir: PathBuf,
    pub deployments_dir: PathBuf,
    pub routes: Option<RouteTable>,
    pub verification: VerificationSettings,
    pub rpc: RpcSettings,
    pub networks: BTreeMap<String, NetworkConfig>,
    pub tasks: Vec<TaskConfig>,
}

/// Expands placeholders while remembering every missing variable.
struct Resolver<'a> {
    env: &'a Environment,
    missing: BTreeSet<String>,
}

impl Resolver<'_> {
    fn text(&mut self, raw: &str) -> Option<String> {
        match self.env.expand(raw) {
            Ok(value) => Some(value),
            Err(names) => {
                self.missing.extend(names);
                None
            }
        }
    }

    fn parse<T: std::str::FromStr>(&mut self, field: String, raw: &str) -> Result<Option<T>, ConfigError>
    where
        T::Err: std::fmt::Display,
    {
        let Some(value) = self.text(raw) else {
            return Ok(None);
        };
        value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                field,
                reason: format!("'{}': {}", value, e),
            })
    }
}

impl DeployConfig {
    /// Load the file at `path` and resolve it against `env`.
    pub fn load(path: &Path, env: &Environment) -> anyhow::Result<Self> {
        let file = FileConfig::load(path)?;
        Ok(Self::resolve(file, env)?)
    }

    /// Resolve a [`FileConfig`]. Missing environment values are reported all at once.
    pub fn resolve(file: FileConfig, env: &Environment) -> Result<Self, ConfigError> {
        let mut resolver = Resolver {
            env,
            missing: BTreeSet::new(),
        };

        let mut networks = BTreeMap::new();
        for (name, raw) in &file.networks {
            if let Some(network) = resolve_network(&mut resolver, name, raw)? {
                networks.insert(name.clone(), network);
            }
        }

        let routes = match &file.routes {
            Some(path) => {
                let table = RouteTable::load(path).map_err(|source| ConfigError::RouteFile {
                    path: path.clone(),
                    source,
                })?;
                table.validate()?;
                Some(table)
            }
            None => None,
        };

        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        for raw in &file.tasks {
            if !seen.insert(raw.tag.as_str()) {
                return Err(ConfigError::DuplicateTask(raw.tag.clone()));
            }
            if !file.networks.contains_key(&raw.network) {
                return Err(ConfigError::UnknownNetwork {
                    task: raw.tag.clone(),
                    network: raw.network.clone(),
                });
            }

            let mut pairs = Vec::with_capacity(raw.constructor.len());
            for (index, arg) in raw.constructor.iter().enumerate() {
                let value = match (&arg.value, &arg.env) {
                    (_, Some(var)) => resolver.text(&format!("${{{var}}}")),
                    (Some(ArgValue::Number(n)), None) => Some(n.to_string()),
                    (Some(ArgValue::Text(s)), None) => resolver.text(s),
                    (None, None) => {
                        return Err(ConfigError::InvalidValue {
                            field: format!("tasks.{}.constructor[{}]", raw.tag, index),
                            reason: "either value or env is required".to_string(),
                        });
                    }
                };
                pairs.push(value.map(|v| (arg.ty.clone(), v)));
            }
            pending.push((raw, pairs));
        }

        if !resolver.missing.is_empty() {
            return Err(ConfigError::MissingEnv(resolver.missing.into_iter().collect()));
        }

        let mut tasks = Vec::with_capacity(pending.len());
        for (raw, pairs) in pending {
            let pairs: Vec<(String, String)> = pairs.into_iter().flatten().collect();
            let constructor_args =
                ConstructorArgs::parse(pairs).map_err(|source| ConfigError::Encode {
                    task: raw.tag.clone(),
                    source,
                })?;

            let configure = raw
                .configure
                .iter()
                .map(|call| resolve_call(raw, call, &networks, routes.as_ref()))
                .collect::<Result<Vec<_>, _>>()?;

            tasks.push(TaskConfig {
                tag: raw.tag.clone(),
                network: raw.network.clone(),
                spec: DeploymentSpec {
                    contract_name: raw.contract.clone(),
                    constructor_args,
                    salt_seed: raw.salt.clone(),
                },
                configure,
            });
        }

        Ok(Self {
            artifacts_dir: file.artifacts_dir,
            deployments_dir: file.deployments_dir,
            routes,
            verification: file.verification,
            rpc: file.rpc,
            networks,
            tasks,
        })
    }

    pub fn network(&self, name: &str) -> Option<&NetworkConfig> {
        self.networks.get(name)
    }

    pub fn task(&self, tag: &str) -> Option<&TaskConfig> {
        self.tasks.iter().find(|t| t.tag == tag)
    }

    /// The tasks named by `tags` in declaration order, or every task when `all` is set.
    pub fn select_tasks(&self, tags: &[String], all: bool) -> Result<Vec<&TaskConfig>, ConfigError> {
        if all {
            return Ok(self.tasks.iter().collect());
        }
        if let Some(unknown) = tags.iter().find(|tag| self.task(tag).is_none()) {
            return Err(ConfigError::UnknownTask(unknown.clone()));
        }
        Ok(self
            .tasks
            .iter()
            .filter(|t| tags.contains(&t.tag))
            .collect())
    }
}

fn resolve_network(
    resolver: &mut Resolver<'_>,
    name: &str,
    raw: &NetworkFileConfig,
) -> Result<Option<NetworkConfig>, ConfigError> {
    let field = |key: &str| format!("networks.{name}.{key}");

    let rpc_url = resolver.parse::<Url>(field("rpc_url"), &raw.rpc_url)?;
    let factory = resolver.parse::<Address>(field("factory"), &raw.factory)?;
    let deployer = match &raw.deployer {
        Some(value) => resolver.parse::<Address>(field("deployer"), value)?.map(Some),
        None => Some(None),
    };
    let explorer = match &raw.explorer {
        Some(explorer) => {
            let api_url = resolver.parse::<Url>(field("explorer.api_url"), &explorer.api_url)?;
            let api_key = resolver.text(&explorer.api_key);
            match (api_url, api_key) {
                (Some(api_url), Some(api_key)) => Some(Some(ExplorerConfig { api_url, api_key })),
                _ => None,
            }
        }
        None => Some(None),
    };

    Ok(match (rpc_url, factory, deployer, explorer) {
        (Some(rpc_url), Some(factory), Some(deployer), Some(explorer)) => Some(NetworkConfig {
            name: name.to_string(),
            rpc_url,
            chain_id: raw.chain_id,
            eid: raw.eid,
            factory,
            deployer,
            explorer,
        }),
        _ => None,
    })
}

fn resolve_call(
    task: &TaskFileConfig,
    call: &CallFileConfig,
    networks: &BTreeMap<String, NetworkConfig>,
    routes: Option<&RouteTable>,
) -> Result<AdminCall, ConfigError> {
    Ok(match call {
        CallFileConfig::SetDurationDaysRange { min, max } => AdminCall::SetDurationDaysRange {
            min: *min,
            max: *max,
        },
        CallFileConfig::SetLockupDaysRange { min, max } => AdminCall::SetLockupDaysRange {
            min: *min,
            max: *max,
        },
        CallFileConfig::SetLzEndpointIds { endpoints } => AdminCall::SetLzEndpointIds {
            endpoints: endpoints.clone(),
        },
        CallFileConfig::SetLzEndpointIdsFromRoutes => AdminCall::SetLzEndpointIds {
            endpoints: endpoints_from_routes(task, networks, routes)?,
        },
    })
}

/// Map every route leaving the task's endpoint to `(chain id, eid)` of its destination.
fn endpoints_from_routes(
    task: &TaskFileConfig,
    networks: &BTreeMap<String, NetworkConfig>,
    routes: Option<&RouteTable>,
) -> Result<Vec<LzEndpoint>, ConfigError> {
    let lookup_error = |reason: String| ConfigError::RouteLookup {
        task: task.tag.clone(),
        reason,
    };

    let routes = routes.ok_or_else(|| lookup_error("no route table is configured".to_string()))?;
    let eid = networks
        .get(&task.network)
        .and_then(|n| n.eid)
        .ok_or_else(|| lookup_error(format!("network {} declares no eid", task.network)))?;
    let endpoint = EndpointRef {
        eid,
        contract_name: task.contract.clone(),
    };

    let endpoints = routes
        .connections_from(&endpoint)
        .map(|connection| {
            let to = connection.to.eid;
            let network = networks
                .values()
                .find(|n| n.eid == Some(to))
                .ok_or_else(|| lookup_error(format!("no configured network has eid {to}")))?;
            let chain_id = u32::try_from(network.chain_id).map_err(|_| {
                lookup_error(format!(
                    "chain id {} of network {} does not fit uint32",
                    network.chain_id, network.name
                ))
            })?;
            Ok::<_, ConfigError>(LzEndpoint {
                chain_id,
                endpoint_id: to,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if endpoints.is_empty() {
        return Err(lookup_error(format!("no route leaves {endpoint}")));
    }
    Ok(endpoints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_core::primitives::address;
    use tempdir::TempDir;

    const SAMPLE: &str = r#"
        [verification]
        max_attempts = 3

        [networks.bsc-testnet]
        rpc_url = "https://bsc-testnet.example"
        chain_id = 97
        eid = 40102
        factory = "${OUTRUN_DEPLOYER}"
        explorer = { api_url = "https://api.etherscan.io/v2/api", api_key = "${BSCSCAN_API_KEY}" }

        [networks.base-sepolia]
        rpc_url = "https://base-sepolia.example"
        chain_id = 84532
        eid = 40245
        factory = "0x2222222222222222222222222222222222222222"

        [[tasks]]
        tag = "center"
        contract = "MemeverseRegistrationCenter"
        network = "bsc-testnet"
        salt = { label = "MemeverseRegistrationCenter", version = 2 }
        constructor = [
            { type = "address", env = "OWNER" },
            { type = "uint128", value = 10000000 },
        ]
        configure = [
            { call = "set-duration-days-range", min = 1, max = 7 },
            { call = "set-lz-endpoint-ids", endpoints = [{ chainId = 84532, endpointId = 40245 }] },
        ]
    "#;

    fn env() -> Environment {
        Environment::from_pairs([
            ("OUTRUN_DEPLOYER", "0x1111111111111111111111111111111111111111"),
            ("BSCSCAN_API_KEY", "key"),
            ("OWNER", "0x3333333333333333333333333333333333333333"),
        ])
    }

    fn file(toml: &str) -> FileConfig {
        Figment::from(Toml::string(toml)).extract().expect("Failed to extract config")
    }

    #[test]
    fn test_defaults() {
        let file = file("");

        assert_eq!(file.artifacts_dir, PathBuf::from("artifacts"));
        assert_eq!(file.deployments_dir, PathBuf::from("deployments"));
        assert_eq!(file.verification.max_attempts, 10);
        assert_eq!(file.verification.backoff_secs, 5);
        assert_eq!(file.rpc.timeout_secs, 30);
        assert_eq!(file.rpc.receipt_timeout_secs, 180);
    }

    #[test]
    fn test_resolve_sample() {
        let config = DeployConfig::resolve(file(SAMPLE), &env()).expect("Failed to resolve");

        assert_eq!(config.verification.max_attempts, 3);
        assert_eq!(config.verification.backoff_secs, 5);

        let bsc = config.network("bsc-testnet").unwrap();
        assert_eq!(bsc.factory, address!("1111111111111111111111111111111111111111"));
        assert_eq!(bsc.explorer.as_ref().unwrap().api_key, "key");
        assert_eq!(bsc.deployer, None);

        let task = config.task("center").unwrap();
        assert_eq!(task.spec.contract_name, "MemeverseRegistrationCenter");
        assert_eq!(task.spec.salt_seed, SaltSeed::new("MemeverseRegistrationCenter", 2));
        assert_eq!(task.spec.constructor_args.signature_string(), "address,uint128");
        assert_eq!(task.configure.len(), 2);
        assert_eq!(task.configure[0], AdminCall::SetDurationDaysRange { min: 1, max: 7 });
    }

    #[test]
    fn test_every_missing_variable_is_reported() {
        let err = DeployConfig::resolve(file(SAMPLE), &Environment::default()).unwrap_err();

        match err {
            ConfigError::MissingEnv(names) => assert_eq!(
                names,
                vec![
                    "BSCSCAN_API_KEY".to_string(),
                    "OUTRUN_DEPLOYER".to_string(),
                    "OWNER".to_string()
                ]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_address_is_rejected() {
        let env = Environment::from_pairs([
            ("OUTRUN_DEPLOYER", "0x12"),
            ("BSCSCAN_API_KEY", "key"),
            ("OWNER", "0x3333333333333333333333333333333333333333"),
        ]);

        let err = DeployConfig::resolve(file(SAMPLE), &env).unwrap_err();

        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "networks.bsc-testnet.factory"));
    }

    #[test]
    fn test_unknown_network() {
        let toml = r#"
            [[tasks]]
            tag = "foo"
            contract = "Foo"
            network = "mainnet"
            salt = { label = "Foo", version = 1 }
        "#;

        let err = DeployConfig::resolve(file(toml), &env()).unwrap_err();

        assert!(matches!(err, ConfigError::UnknownNetwork { .. }));
    }

    #[test]
    fn test_constructor_overflow_is_fatal() {
        let toml = SAMPLE.replace("value = 10000000", "value = \"340282366920938463463374607431768211456\"");

        let err = DeployConfig::resolve(file(&toml), &env()).unwrap_err();

        assert!(matches!(err, ConfigError::Encode { .. }));
    }

    #[test]
    fn test_select_tasks() {
        let config = DeployConfig::resolve(file(SAMPLE), &env()).unwrap();

        assert_eq!(config.select_tasks(&[], true).unwrap().len(), 1);
        assert_eq!(config.select_tasks(&["center".to_string()], false).unwrap().len(), 1);
        assert!(matches!(
            config.select_tasks(&["nope".to_string()], false),
            Err(ConfigError::UnknownTask(_))
        ));
    }

    /// Three networks and a center task deriving its endpoint ids from the testnet routes.
    fn routed_toml(routes_path: &Path) -> String {
        format!(
            r#"
            routes = "{}"

            [networks.bsc-testnet]
            rpc_url = "https://bsc-testnet.example"
            chain_id = 97
            eid = 40102
            factory = "0x1111111111111111111111111111111111111111"

            [networks.base-sepolia]
            rpc_url = "https://base-sepolia.example"
            chain_id = 84532
            eid = 40245
            factory = "0x1111111111111111111111111111111111111111"

            [networks.blast-sepolia]
            rpc_url = "https://blast-sepolia.example"
            chain_id = 168587773
            eid = 40243
            factory = "0x1111111111111111111111111111111111111111"

            [[tasks]]
            tag = "center"
            contract = "MemeverseRegistrationCenter"
            network = "bsc-testnet"
            salt = {{ label = "MemeverseRegistrationCenter", version = 2 }}
            configure = [{{ call = "set-lz-endpoint-ids-from-routes" }}]
            "#,
            routes_path.display()
        )
    }

    fn write_testnet_routes(dir: &Path) -> PathBuf {
        let routes_path = dir.join("routes.json");
        std::fs::write(&routes_path, include_str!("../../../config/layerzero.testnet.json")).unwrap();
        routes_path
    }

    #[test]
    fn test_endpoint_ids_from_routes() {
        let temp_dir = TempDir::new("memeverse-test").unwrap();
        let routes_path = write_testnet_routes(temp_dir.path());

        let config = DeployConfig::resolve(file(&routed_toml(&routes_path)), &env()).unwrap();

        assert!(config.routes.is_some());
        assert_eq!(
            config.task("center").unwrap().configure,
            vec![AdminCall::SetLzEndpointIds {
                endpoints: vec![
                    LzEndpoint {
                        chain_id: 84532,
                        endpoint_id: 40245
                    },
                    LzEndpoint {
                        chain_id: 168587773,
                        endpoint_id: 40243
                    },
                ]
            }]
        );
    }

    #[test]
    fn test_endpoint_ids_reject_wide_chain_id() {
        let temp_dir = TempDir::new("memeverse-test").unwrap();
        let routes_path = write_testnet_routes(temp_dir.path());
        // 2^32 + 97 would truncate to BSC testnet's chain id.
        let toml = routed_toml(&routes_path).replace("chain_id = 84532", "chain_id = 4294967393");

        let err = DeployConfig::resolve(file(&toml), &env()).unwrap_err();

        match err {
            ConfigError::RouteLookup { task, reason } => {
                assert_eq!(task, "center");
                assert!(reason.contains("4294967393"), "unexpected reason: {reason}");
                assert!(reason.contains("does not fit uint32"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_endpoint_ids_without_routes() {
        let toml = SAMPLE.replace(
            "{ call = \"set-duration-days-range\", min = 1, max = 7 },",
            "{ call = \"set-lz-endpoint-ids-from-routes\" },",
        );

        let err = DeployConfig::resolve(file(&toml), &env()).unwrap_err();

        assert!(matches!(err, ConfigError::RouteLookup { .. }));
    }

    #[test]
    fn test_shipped_configuration_resolves() {
        let mut file = file(include_str!("../../../config/Memeverse.toml"));
        file.routes = Some(PathBuf::from(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../config/layerzero.testnet.json"
        )));
        let address = "0x1111111111111111111111111111111111111111";
        let env = Environment::from_pairs(
            [
                "BSC_TESTNET_RPC",
                "BASE_SEPOLIA_RPC",
                "BLAST_SEPOLIA_RPC",
            ]
            .map(|name| (name, "https://rpc.example"))
            .into_iter()
            .chain(
                [
                    "OUTRUN_DEPLOYER",
                    "OWNER",
                    "BSC_TESTNET_ENDPOINT",
                    "MEMEVERSE_REGISTRAR",
                    "BLAST_GOVERNOR",
                    "BLAST_SEPOLIA_ENDPOINT",
                    "MEMECOIN_DEPLOYER",
                    "LIQUID_PROOF_DEPLOYER",
                ]
                .map(|name| (name, address)),
            )
            .chain([("ETHERSCAN_API_KEY", "key"), ("BLAST_SEPOLIA_EID", "40243")]),
        );

        let config = DeployConfig::resolve(file, &env).expect("Failed to resolve shipped configuration");

        let center = config.task("MemeverseRegistrationCenter").unwrap();
        assert_eq!(center.spec.constructor_args.signature_string(), "address,address,address,uint128");
        assert_eq!(
            center.configure.last().unwrap().to_string(),
            "setLzEndpointId([84532:40245, 168587773:40243])"
        );

        let registrar = config.task("MemeverseRegistrarOnBlast").unwrap();
        assert_eq!(registrar.spec.salt_seed, SaltSeed::new("MemeverseRegistrar", 3));
        assert_eq!(registrar.spec.constructor_args.len(), 8);
    }

    #[test]
    fn test_directory_without_config_file_is_rejected() {
        let temp_dir = TempDir::new("memeverse-test").unwrap();

        let err = FileConfig::load(temp_dir.path()).unwrap_err();

        assert!(err.to_string().contains("Configuration file not found"));
        assert!(err.to_string().contains(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn test_directory_with_config_file_loads() {
        let temp_dir = TempDir::new("memeverse-test").unwrap();
        std::fs::write(
            temp_dir.path().join(DEFAULT_CONFIG_FILE),
            "artifacts_dir = \"out\"\n",
        )
        .unwrap();

        let file = FileConfig::load(temp_dir.path()).unwrap();

        assert_eq!(file.artifacts_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_environment_overrides() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(DEFAULT_CONFIG_FILE, "[verification]\nmax_attempts = 4\n")?;
            jail.set_env("MEMEVERSE_VERIFICATION__MAX_ATTEMPTS", "7");

            let file = FileConfig::load(Path::new(DEFAULT_CONFIG_FILE))
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(file.verification.max_attempts, 7);
            Ok(())
        });
    }
}
