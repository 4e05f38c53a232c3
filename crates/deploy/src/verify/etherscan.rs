//! Etherscan-compatible verification API client.
//!
//! Submits the Solidity standard JSON input of a contract with
//! `verifysourcecode`, then polls `checkverifystatus` until the explorer
//! reports a verdict.

use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use url::Url;

use super::{SourceVerifier, VerificationRequest, VerifyError};
use crate::{
    artifacts::{ArtifactStore, HardhatArtifacts},
    rpc,
};

/// Explorer endpoint and credentials for one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtherscanConfig {
    pub api_url: Url,
    pub api_key: String,
    pub chain_id: u64,
    /// Delay between status polls.
    pub poll_interval: Duration,
    /// Bound on waiting for a verdict.
    pub poll_timeout: Duration,
    /// Bound on each HTTP request.
    pub request_timeout: Duration,
}

/// Raw explorer response envelope.
#[derive(Debug, Clone, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    message: String,
    result: String,
}

/// How an explorer response should be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Verdict {
    /// Submission accepted, carries the GUID to poll.
    Accepted(String),
    Pending,
    Verified,
    AlreadyVerified,
    Rejected(String),
}

fn classify(status: &str, message: &str, result: &str) -> Verdict {
    let lower = result.to_ascii_lowercase();
    if lower.contains("already verified") {
        return Verdict::AlreadyVerified;
    }
    if lower.contains("pending in queue") || lower.contains("in progress") {
        return Verdict::Pending;
    }
    if lower.starts_with("pass") {
        return Verdict::Verified;
    }
    if status == "1" {
        return Verdict::Accepted(result.to_string());
    }
    if result.is_empty() {
        Verdict::Rejected(message.to_string())
    } else {
        Verdict::Rejected(result.to_string())
    }
}

/// [`SourceVerifier`] talking to an Etherscan-compatible API.
#[derive(Debug, Clone)]
pub struct EtherscanVerifier {
    client: reqwest::Client,
    config: EtherscanConfig,
    artifacts: HardhatArtifacts,
}

impl EtherscanVerifier {
    pub fn new(config: EtherscanConfig, artifacts: HardhatArtifacts) -> anyhow::Result<Self> {
        let client = rpc::create_client(config.request_timeout)?;
        Ok(Self {
            client,
            config,
            artifacts,
        })
    }

    fn endpoint(&self) -> Url {
        let mut url = self.config.api_url.clone();
        url.query_pairs_mut()
            .append_pair("chainid", &self.config.chain_id.to_string());
        url
    }

    async fn submit(&self, request: &VerificationRequest) -> Result<String, VerifyError> {
        let artifact = self.artifacts.read_artifact(&request.contract_name)?;
        let build_info = self.artifacts.read_build_info(&request.contract_name)?;
        let source_code = serde_json::to_string(&build_info.input)
            .context("Failed to serialize compiler input")?;
        let address = request.address.to_string();
        let contract_name = artifact.fully_qualified_name();
        let compiler_version = format!("v{}", build_info.solc_long_version);
        let constructor_args = hex::encode(&request.constructor_args);

        let form = [
            ("apikey", self.config.api_key.as_str()),
            ("module", "contract"),
            ("action", "verifysourcecode"),
            ("contractaddress", address.as_str()),
            ("sourceCode", source_code.as_str()),
            ("codeformat", "solidity-standard-json-input"),
            ("contractname", contract_name.as_str()),
            ("compilerversion", compiler_version.as_str()),
            // The misspelling is part of the Etherscan API.
            ("constructorArguements", constructor_args.as_str()),
        ];

        let response: ApiResponse = self
            .client
            .post(self.endpoint())
            .form(&form)
            .send()
            .await
            .context("Failed to submit verification request")?
            .json()
            .await
            .context("Failed to parse verification response")?;

        match classify(&response.status, &response.message, &response.result) {
            Verdict::Accepted(guid) => Ok(guid),
            Verdict::AlreadyVerified => Err(VerifyError::AlreadyVerified),
            Verdict::Verified => Ok(String::new()),
            Verdict::Pending => Err(VerifyError::Rejected(
                "explorer returned a status instead of a GUID".to_string(),
            )),
            Verdict::Rejected(reason) => Err(VerifyError::Rejected(reason)),
        }
    }

    async fn check_status(&self, guid: &str) -> anyhow::Result<Verdict> {
        let mut url = self.endpoint();
        url.query_pairs_mut()
            .append_pair("apikey", &self.config.api_key)
            .append_pair("module", "contract")
            .append_pair("action", "checkverifystatus")
            .append_pair("guid", guid);

        let response: ApiResponse = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to query verification status")?
            .json()
            .await
            .context("Failed to parse verification status")?;

        Ok(classify(&response.status, &response.message, &response.result))
    }
}

impl SourceVerifier for EtherscanVerifier {
    async fn verify_source(&self, request: &VerificationRequest) -> Result<(), VerifyError> {
        let guid = self.submit(request).await?;
        if guid.is_empty() {
            return Ok(());
        }

        tracing::debug!(guid = %guid, contract = %request.contract_name, "Verification submitted");

        let verdict = rpc::poll_until(
            &format!("verification of {}", request.contract_name),
            self.config.poll_timeout,
            self.config.poll_interval,
            || async {
                let verdict = self.check_status(&guid).await?;
                Ok::<_, anyhow::Error>(match verdict {
                    Verdict::Pending => None,
                    other => Some(other),
                })
            },
        )
        .await?;

        match verdict {
            Verdict::Verified => Ok(()),
            Verdict::AlreadyVerified => Err(VerifyError::AlreadyVerified),
            Verdict::Rejected(reason) => Err(VerifyError::Rejected(reason)),
            Verdict::Accepted(status) => Err(VerifyError::Rejected(format!(
                "unexpected verification status: {}",
                status
            ))),
            Verdict::Pending => Err(VerifyError::Rejected(
                "verification still pending".to_string(),
            )),
        }
    }
}
