//! Best-effort source verification with bounded retries.
//!
//! Verification runs after an irreversible deployment and only improves block
//! explorer readability, so running out of attempts is reported but never
//! fails the calling task.

pub mod etherscan;

use std::future::Future;
use std::time::Duration;

use alloy_core::primitives::{Address, Bytes};
use backon::{BackoffBuilder, ExponentialBuilder};
use thiserror::Error;

pub use etherscan::{EtherscanConfig, EtherscanVerifier};

/// Default number of verification attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default delay between two verification attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);

fn constant_backoff(delay: Duration) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(delay)
        .with_max_delay(delay)
}

/// What to verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    pub network: String,
    pub contract_name: String,
    pub address: Address,
    /// ABI-encoded constructor arguments.
    pub constructor_args: Bytes,
}

/// A failed verification attempt.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The explorer already has the source. Treated as success by the retrier.
    #[error("contract source is already verified")]
    AlreadyVerified,
    #[error("verification attempt timed out after {0:?}")]
    Timeout(Duration),
    #[error("verification rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// An external source-verification service.
pub trait SourceVerifier: Send + Sync {
    fn verify_source(
        &self,
        request: &VerificationRequest,
    ) -> impl Future<Output = Result<(), VerifyError>> + Send;
}

/// Final state of a verification loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The service accepted the source (or already had it) on attempt `attempts`.
    Verified { attempts: u32 },
    /// Every one of `attempts` attempts failed.
    Exhausted {
        attempts: u32,
        last_error: Option<String>,
    },
}

impl VerificationOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }
}

/// Loop state: `Pending` until a success or the attempt bound is reached.
enum State {
    Pending {
        failures: u32,
        last_error: Option<String>,
    },
    Done(VerificationOutcome),
}

/// Drives a [`SourceVerifier`] until success or `max_attempts` failures.
pub struct VerificationRetrier<'a, V> {
    verifier: &'a V,
    max_attempts: u32,
    attempt_timeout: Duration,
    backoff: ExponentialBuilder,
}

impl<'a, V: SourceVerifier> VerificationRetrier<'a, V> {
    pub fn new(verifier: &'a V, max_attempts: u32) -> Self {
        Self {
            verifier,
            max_attempts,
            attempt_timeout: Duration::from_secs(300),
            backoff: constant_backoff(DEFAULT_BACKOFF),
        }
    }

    /// Bound on a single attempt. A timed-out attempt counts as a failure.
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Delay before the first retry; later retries back off exponentially up to `max`.
    pub fn backoff(mut self, min: Duration, max: Duration) -> Self {
        self.backoff = ExponentialBuilder::default()
            .with_min_delay(min)
            .with_max_delay(max.max(min));
        self
    }

    async fn attempt(&self, request: &VerificationRequest) -> Result<(), VerifyError> {
        match tokio::time::timeout(self.attempt_timeout, self.verifier.verify_source(request)).await
        {
            Ok(result) => result,
            Err(_) => Err(VerifyError::Timeout(self.attempt_timeout)),
        }
    }

    /// Run the loop. The service is called at most `max_attempts` times.
    pub async fn verify(&self, request: &VerificationRequest) -> VerificationOutcome {
        let mut delays = self
            .backoff
            .clone()
            .with_max_times(self.max_attempts as usize)
            .build();
        let mut state = State::Pending {
            failures: 0,
            last_error: None,
        };

        loop {
            state = match state {
                State::Done(outcome) => {
                    match &outcome {
                        VerificationOutcome::Verified { attempts } => tracing::info!(
                            network = %request.network,
                            contract = %request.contract_name,
                            address = %request.address,
                            attempts,
                            "Contract verified"
                        ),
                        VerificationOutcome::Exhausted {
                            attempts,
                            last_error,
                        } => tracing::warn!(
                            network = %request.network,
                            contract = %request.contract_name,
                            address = %request.address,
                            attempts,
                            last_error = last_error.as_deref().unwrap_or("none"),
                            "Verification attempts exhausted, contract stays deployed unverified"
                        ),
                    }
                    return outcome;
                }
                State::Pending {
                    failures,
                    last_error,
                } if failures >= self.max_attempts => State::Done(VerificationOutcome::Exhausted {
                    attempts: failures,
                    last_error,
                }),
                State::Pending { failures, .. } => {
                    let attempt = failures + 1;
                    tracing::info!(
                        network = %request.network,
                        contract = %request.contract_name,
                        address = %request.address,
                        attempt,
                        max_attempts = self.max_attempts,
                        "Verifying contract"
                    );

                    match self.attempt(request).await {
                        Ok(()) => State::Done(VerificationOutcome::Verified { attempts: attempt }),
                        Err(VerifyError::AlreadyVerified) => {
                            tracing::info!(
                                contract = %request.contract_name,
                                address = %request.address,
                                "Contract was already verified"
                            );
                            State::Done(VerificationOutcome::Verified { attempts: attempt })
                        }
                        Err(e) => {
                            tracing::error!(
                                network = %request.network,
                                contract = %request.contract_name,
                                address = %request.address,
                                attempt,
                                error = %e,
                                "Verification failed"
                            );
                            if attempt < self.max_attempts {
                                if let Some(delay) = delays.next() {
                                    tokio::time::sleep(delay).await;
                                }
                            }
                            State::Pending {
                                failures: attempt,
                                last_error: Some(e.to_string()),
                            }
                        }
                    }
                }
            };
        }
    }
}
