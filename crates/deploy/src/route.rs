//! Static cross-chain messaging route table.
//!
//! The table is pure data: which endpoints exist and, for every directed pair,
//! which libraries, executor and verifier sets carry messages. It is validated
//! here and exported as JSON for the messaging configuration tool.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An OApp contract on one messaging endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRef {
    pub eid: u32,
    pub contract_name: String,
}

impl fmt::Display for EndpointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.contract_name, self.eid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEntry {
    pub contract: EndpointRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UlnConfig {
    pub confirmations: u64,
    #[serde(rename = "requiredDVNs")]
    pub required_dvns: Vec<Address>,
    #[serde(rename = "optionalDVNs", default)]
    pub optional_dvns: Vec<Address>,
    #[serde(rename = "optionalDVNThreshold", default)]
    pub optional_dvn_threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorConfig {
    pub max_message_size: u32,
    pub executor: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveLibraryConfig {
    pub receive_library: Address,
    #[serde(default)]
    pub grace_period: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendConfig {
    pub executor_config: ExecutorConfig,
    pub uln_config: UlnConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveConfig {
    pub uln_config: UlnConfig,
}

/// Settings of one directed connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteConfig {
    pub send_library: Address,
    pub receive_library_config: ReceiveLibraryConfig,
    pub send_config: SendConfig,
    pub receive_config: ReceiveConfig,
}

/// A directed edge `from -> to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub from: EndpointRef,
    pub to: EndpointRef,
    pub config: RouteConfig,
}

/// A problem found while validating a [`RouteTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteIssue {
    DuplicateContract(EndpointRef),
    UndeclaredEndpoint { connection: usize, endpoint: EndpointRef },
    DuplicateConnection { from: EndpointRef, to: EndpointRef },
    SelfConnection(EndpointRef),
    NoRequiredDvns { connection: usize, side: Side },
    ThresholdTooHigh { connection: usize, side: Side, threshold: u32, optional: usize },
    ZeroConfirmations { connection: usize, side: Side },
    ZeroMessageSize { connection: usize },
}

/// Which half of a connection an issue refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    Send,
    Receive,
}

impl fmt::Display for RouteIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateContract(ep) => write!(f, "contract {ep} is declared more than once"),
            Self::UndeclaredEndpoint { connection, endpoint } => {
                write!(f, "connection #{connection} references undeclared endpoint {endpoint}")
            }
            Self::DuplicateConnection { from, to } => {
                write!(f, "connection {from} -> {to} is declared more than once")
            }
            Self::SelfConnection(ep) => write!(f, "connection from {ep} to itself"),
            Self::NoRequiredDvns { connection, side } => {
                write!(f, "connection #{connection} has no required DVNs on the {side} side")
            }
            Self::ThresholdTooHigh {
                connection,
                side,
                threshold,
                optional,
            } => write!(
                f,
                "connection #{connection} {side} side: optional DVN threshold {threshold} exceeds {optional} optional DVN(s)"
            ),
            Self::ZeroConfirmations { connection, side } => {
                write!(f, "connection #{connection} {side} side requires at least one confirmation")
            }
            Self::ZeroMessageSize { connection } => {
                write!(f, "connection #{connection} has a zero max message size")
            }
        }
    }
}

/// Every issue found in a route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid route table: {}", .issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
pub struct RouteValidationError {
    pub issues: Vec<RouteIssue>,
}

/// Declared endpoints and the connections between them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    pub contracts: Vec<ContractEntry>,
    pub connections: Vec<Connection>,
}

impl RouteTable {
    /// Load a table from a `.toml` file, or JSON for any other extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read route table {}", path.display()))?;

        let is_toml = path.extension().is_some_and(|ext| ext == "toml");
        if is_toml {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse route table {}", path.display()))
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse route table {}", path.display()))
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize route table")
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &EndpointRef> {
        self.contracts.iter().map(|entry| &entry.contract)
    }

    /// Outgoing connections of `endpoint`, in declaration order.
    pub fn connections_from<'a>(
        &'a self,
        endpoint: &'a EndpointRef,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| &c.from == endpoint)
    }

    /// Check the table, collecting every issue instead of stopping at the first.
    pub fn validate(&self) -> Result<(), RouteValidationError> {
        let mut issues = Vec::new();

        let mut declared = HashSet::new();
        for endpoint in self.endpoints() {
            if !declared.insert(endpoint) {
                issues.push(RouteIssue::DuplicateContract(endpoint.clone()));
            }
        }

        let mut edges = HashSet::new();
        for (index, connection) in self.connections.iter().enumerate() {
            let number = index + 1;

            for endpoint in [&connection.from, &connection.to] {
                if !declared.contains(endpoint) {
                    issues.push(RouteIssue::UndeclaredEndpoint {
                        connection: number,
                        endpoint: endpoint.clone(),
                    });
                }
            }

            if connection.from == connection.to {
                issues.push(RouteIssue::SelfConnection(connection.from.clone()));
            } else if !edges.insert((&connection.from, &connection.to)) {
                issues.push(RouteIssue::DuplicateConnection {
                    from: connection.from.clone(),
                    to: connection.to.clone(),
                });
            }

            let config = &connection.config;
            if config.send_config.executor_config.max_message_size == 0 {
                issues.push(RouteIssue::ZeroMessageSize { connection: number });
            }

            for (side, uln) in [
                (Side::Send, &config.send_config.uln_config),
                (Side::Receive, &config.receive_config.uln_config),
            ] {
                check_uln(number, side, uln, &mut issues);
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(RouteValidationError { issues })
        }
    }
}

fn check_uln(connection: usize, side: Side, uln: &UlnConfig, issues: &mut Vec<RouteIssue>) {
    if uln.required_dvns.is_empty() {
        issues.push(RouteIssue::NoRequiredDvns { connection, side });
    }
    if uln.optional_dvn_threshold as usize > uln.optional_dvns.len() {
        issues.push(RouteIssue::ThresholdTooHigh {
            connection,
            side,
            threshold: uln.optional_dvn_threshold,
            optional: uln.optional_dvns.len(),
        });
    }
    if uln.confirmations == 0 {
        issues.push(RouteIssue::ZeroConfirmations { connection, side });
    }
}
