//! Action orchestrator
//!
//! The three operator-triggered operations. Each takes the shared busy flag for
//! its whole duration and reports progress to the operator log; SDK failures
//! are isolated so they never corrupt what the session already holds.

use crate::busy::{BusyFlag, BusyGuard};
use crate::chain::{TxHash, half_of};
use crate::config::ClientConfig;
use crate::error::ErrorPayload;
use crate::log::LogSink;
use crate::sdk::MpcSdk;
use crate::session::SessionState;
use crate::{Error, Result, TransactionRequest};
use alloy_primitives::U256;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Result of a key-share generation attempt
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum KeygenOutcome {
    /// A new key share is now current
    Generated { generation: u64, public_key: String },
    /// The SDK failed; the previous key share is untouched
    Failed { error: ErrorPayload },
}

/// Result of a send attempt
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SendOutcome {
    /// No wallet handle yet; nothing happened
    NoWallet,
    /// Half the balance rounds to zero
    NoFunds { address: String },
    /// Transfer broadcast
    Sent { tx: TxHash, amount: U256 },
    /// Balance query or broadcast failed
    Failed { error: ErrorPayload },
}

/// Runs the operator-triggered operations against the SDK
pub struct ActionOrchestrator {
    sdk: Arc<dyn MpcSdk>,
    state: Arc<SessionState>,
    log: LogSink,
    busy: BusyFlag,
    config: ClientConfig,
}

impl ActionOrchestrator {
    pub fn new(
        sdk: Arc<dyn MpcSdk>,
        state: Arc<SessionState>,
        log: LogSink,
        busy: BusyFlag,
        config: ClientConfig,
    ) -> Self {
        Self {
            sdk,
            state,
            log,
            busy,
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn acquire(&self, operation: &str) -> Result<BusyGuard> {
        self.busy.try_acquire().ok_or_else(|| {
            warn!(operation, "Rejected while another operation is running");
            Error::Busy
        })
    }

    /// Sign in with the configured credentials
    ///
    /// Errors from the authentication service are returned to the caller.
    #[instrument(skip(self), fields(email = %self.config.credentials.email))]
    pub async fn sign_in(&self) -> Result<()> {
        let guard = self.acquire("sign_in")?;

        self.sdk
            .sign_in_with_password(&self.config.credentials)
            .await?;

        self.state.set_signed_in();
        drop(guard);

        if self.config.credentials.is_demo() {
            self.log.append("signed in as test user");
        } else {
            self.log
                .append(format!("signed in as {}", self.config.credentials.email));
        }
        info!("Signed in");

        Ok(())
    }

    /// Generate a fresh 2-of-2 key share and make it current
    ///
    /// Does not require a prior sign-in.
    #[instrument(skip(self))]
    pub async fn generate_key_share(&self) -> Result<KeygenOutcome> {
        let _guard = self.acquire("generate_key_share")?;

        self.log.append("generating local key share (2 out of 2)...");

        let key_share = match self.sdk.generate_key_share_2of2().await {
            Ok(key_share) => Arc::new(key_share),
            Err(e) => {
                error!("Key share generation failed: {}", e);
                return Ok(KeygenOutcome::Failed { error: e.payload() });
            }
        };

        let public_key = key_share.public_key_hex();
        self.log
            .append(format!("local key share generated: {}", public_key));

        let generation = self
            .state
            .set_key_share(key_share)
            .unwrap_or_else(|| self.state.generation());
        info!(generation, %public_key, "Key share stored");

        Ok(KeygenOutcome::Generated {
            generation,
            public_key,
        })
    }

    /// Send half of the wallet balance to the configured receiver
    ///
    /// Without a wallet handle this returns [`SendOutcome::NoWallet`] without
    /// touching the busy flag or the log.
    #[instrument(skip(self), fields(receiver = %self.config.receiver))]
    pub async fn send_ethereum_transaction(&self) -> Result<SendOutcome> {
        let Some(wallet) = self.state.wallet() else {
            debug!("No wallet handle, nothing to send");
            return Ok(SendOutcome::NoWallet);
        };

        let _guard = self.acquire("send_ethereum_transaction")?;

        let result = async {
            let balance = wallet.get_balance().await?;
            let amount = half_of(balance);
            debug!(%balance, %amount, "Computed transfer amount");

            if amount.is_zero() {
                self.log
                    .append(format!("no funds on address: {}", wallet.address()));
                return Ok(SendOutcome::NoFunds {
                    address: wallet.address().to_string(),
                });
            }

            self.log
                .append(format!("sending {} to {}", amount, self.config.receiver));

            let tx = wallet
                .send_transaction(TransactionRequest::new(&self.config.receiver, amount))
                .await?;

            self.log.append(format!("SENT!!! tx: {}", tx.hash));
            info!(tx_hash = %tx.hash, "Transaction sent");

            Ok::<_, Error>(SendOutcome::Sent { tx, amount })
        }
        .await;

        Ok(result.unwrap_or_else(|e| {
            error!("Send failed: {}", e);
            self.log.append("ERROR!!!");
            self.log.append(e.to_json());
            SendOutcome::Failed { error: e.payload() }
        }))
    }
}

impl std::fmt::Debug for ActionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionOrchestrator")
            .field("config", &self.config)
            .field("busy", &self.busy.is_busy())
            .finish()
    }
}
